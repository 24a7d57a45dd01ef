//! Harp-Vex Core: 複数デバイスに分割されたベクトルと、式からカーネルへのエンジン
//!
//! 論理的な1次元配列をデバイス（キュー）ごとのパーティションに分割して保持し、
//! 普通の算術式を代入するとデバイスカーネルを生成・キャッシュ・実行します。
//!
//! # 基本的な使い方
//!
//! ```
//! use harp_vex_core::prelude::*;
//! use harp_vex_core::backend::host::{HostBackend, HostDevice};
//!
//! let device = HostDevice::new();
//! let queues = vec![device.queue(), device.queue()];
//!
//! let x = DistributedVector::<f64, HostBackend>::with_size(&queues, 1024).unwrap();
//! x.assign(42).unwrap();
//!
//! let mut host = vec![0.0; 1024];
//! copy(&x, &mut host).unwrap();
//! assert!(host.iter().all(|&v| v == 42.0));
//! ```

pub mod ast;
pub mod backend;
pub mod cache;
pub mod config;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod expr;
pub mod lowerer;
pub mod multi_array;
pub mod partition;
pub mod renderer;
pub mod vector;

pub use backend::{Backend, Buffer, Compiler, DeviceContext, Kernel, Queue};
pub use cache::{CacheStats, KernelCache, KernelSignature};
pub use config::ExecutionConfig;
pub use dtype::{DType, Number, Scalar};
pub use error::{Result, VexError};
pub use expr::{Expr, IntoExpr};
pub use multi_array::MultiArray;
pub use partition::{EvenPlanner, Partition, PartitionPlanner};
pub use vector::DistributedVector;

/// Prelude module with commonly used types and traits
///
/// このモジュールをインポートすることで、ベクトルと式を使うのに必要な
/// 主要な型・関数を一括でインポートできます。
pub mod prelude {
    pub use crate::backend::{Backend, Buffer, Queue};
    pub use crate::config::ExecutionConfig;
    pub use crate::dtype::{DType, Scalar};
    pub use crate::error::{Result, VexError};
    pub use crate::expr::{
        Expr, IntoExpr, ceil, cos, element_index, element_index_from, exp, fabs, floor, fmax,
        fmin, log, pow, sin, sqrt, tan,
    };
    pub use crate::multi_array::MultiArray;
    pub use crate::vector::{DistributedVector, copy, copy_from, swap};
}

//! Harp-Vex: multi-device vectors and expression kernels
//!
//! A logical 1-D array is split across one or more compute devices. Ordinary
//! arithmetic expressions over such arrays are compiled into device kernels,
//! cached per device, and executed on every partition's queue.
//!
//! # Architecture
//!
//! Harp-Vex provides:
//! - **vector**: the distributed device vector and its value semantics
//! - **expr**: lazy elementwise expressions with operator overloading
//! - **engine**: lowering, kernel caching and per-partition dispatch
//! - **multi_array**: N-dimensional arrays backed by a distributed vector
//! - **backend**: backend traits and the host reference backend
//!
//! Device backends:
//! - **host**: always available, runs kernels on the CPU
//! - **opencl**: OpenCL GPU backend (feature: `opencl`)
//!
//! # Feature Flags
//!
//! - `opencl`: Enable the OpenCL backend
//!
//! # Example
//!
//! ```
//! use harp_vex::prelude::*;
//! use harp_vex::host::{HostBackend, HostDevice};
//!
//! let device = HostDevice::new();
//! let queues = vec![device.queue(), device.queue()];
//!
//! let x = DistributedVector::<f64, HostBackend>::with_size(&queues, 100).unwrap();
//! let y = DistributedVector::<f64, HostBackend>::with_size(&queues, 100).unwrap();
//! x.assign(0.01 * element_index()).unwrap();
//! y.assign(pow(sin(&x), 2) + pow(cos(&x), 2)).unwrap();
//!
//! assert!(y.to_vec().unwrap().iter().all(|v| (v - 1.0).abs() < 1e-8));
//! ```

// ============================================================================
// Re-exports
// ============================================================================

pub use harp_vex_core::{
    ast, backend, cache, config, dtype, engine, error, expr, lowerer, multi_array, partition,
    renderer, vector,
};

pub use harp_vex_core::{
    Backend, Buffer, CacheStats, Compiler, DType, DeviceContext, DistributedVector, EvenPlanner,
    ExecutionConfig, Expr, IntoExpr, Kernel, KernelCache, KernelSignature, MultiArray, Number,
    Partition, PartitionPlanner, Queue, Result, Scalar, VexError,
};

/// Host reference backend
pub mod host {
    pub use harp_vex_core::backend::host::*;
}

/// OpenCL backend
#[cfg(feature = "opencl")]
pub mod opencl {
    pub use harp_vex_backend_opencl::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module with commonly used types and traits
pub mod prelude {
    pub use harp_vex_core::prelude::*;
}

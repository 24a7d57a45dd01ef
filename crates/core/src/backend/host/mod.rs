//! ホスト（リファレンス）バックエンド
//!
//! デバイスメモリをホストのヒープで代用し、カーネルは下位表現を直接評価して実行します。
//! OpenCLが無い環境でのテストや、生成したカーネルの意味の確認に使います。
//! キューへの投入は同期的に実行されるため、投入順序は常に保たれます。

mod buffer;
mod device;
mod kernel;

pub use buffer::HostBuffer;
pub use device::{HostDevice, HostMemoryStats, HostQueue};
pub use kernel::{HostCompiler, HostKernel};

use crate::backend::Backend;
use thiserror::Error;

/// ホストバックエンドのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("out of device memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("access out of bounds: elements {start}..{end} of a buffer with {len} elements")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("buffer type or length mismatch: {0}")]
    Mismatch(String),

    #[error("invalid kernel program: {0}")]
    InvalidProgram(String),

    #[error("invalid kernel arguments: {0}")]
    InvalidArguments(String),
}

/// ホストバックエンド
#[derive(Debug, Clone, Copy, Default)]
pub struct HostBackend;

impl Backend for HostBackend {
    type Queue = HostQueue;
    type Buffer = HostBuffer;
    type Kernel = HostKernel;
    type Compiler = HostCompiler;

    fn name() -> &'static str {
        "host"
    }
}

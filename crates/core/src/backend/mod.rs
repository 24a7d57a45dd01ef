//! Backend module
//!
//! ## Architecture
//!
//! - **Traits**: Queue / Buffer / Kernel / Compiler / Backend
//! - **Context**: per-device kernel cache and execution config
//! - **host**: reference backend that runs kernels on the host CPU
//!
//! GPU backends are provided as separate crates (harp-vex-backend-opencl).

pub mod context;
pub mod host;
pub mod traits;

pub use context::DeviceContext;
pub use traits::{Backend, Buffer, Compiler, Kernel, KernelArg, LaunchRange, Queue};

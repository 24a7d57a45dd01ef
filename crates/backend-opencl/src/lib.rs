//! OpenCL backend for harp-vex
//!
//! This crate provides native GPU execution using the `ocl` crate.
//!
//! # Usage
//!
//! ```no_run
//! use harp_vex_backend_opencl::{OpenCLBackend, OpenCLDevice};
//! use harp_vex_core::DistributedVector;
//!
//! let device = OpenCLDevice::new().unwrap();
//! let queues = vec![device.queue().unwrap()];
//!
//! let x = DistributedVector::<f32, OpenCLBackend>::with_size(&queues, 1024).unwrap();
//! x.assign(42.0f32).unwrap();
//! ```

mod buffer;
mod compiler;
mod device;
mod kernel;

pub use buffer::OpenCLBuffer;
pub use compiler::OpenCLCompiler;
pub use device::{OpenCLDevice, OpenCLError, OpenCLQueue};
pub use kernel::OpenCLKernel;

use harp_vex_core::backend::Backend;

/// OpenCL backend
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCLBackend;

impl Backend for OpenCLBackend {
    type Queue = OpenCLQueue;
    type Buffer = OpenCLBuffer;
    type Kernel = OpenCLKernel;
    type Compiler = OpenCLCompiler;

    fn name() -> &'static str {
        "opencl"
    }
}

/// Check whether any OpenCL platform is installed
pub fn is_available() -> bool {
    OpenCLDevice::is_available()
}

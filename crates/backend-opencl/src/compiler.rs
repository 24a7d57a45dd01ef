//! OpenCL compiler

use crate::device::{OpenCLError, OpenCLQueue};
use crate::kernel::OpenCLKernel;
use harp_vex_core::ast::KernelProgram;
use harp_vex_core::backend::{Compiler, Queue};
use harp_vex_core::renderer::{OpenCLRenderer, Renderer};
use ocl::Program;

/// OpenCL compiler
///
/// Renders a lowered kernel program to OpenCL C and builds it for the
/// queue's device.
pub struct OpenCLCompiler;

impl OpenCLCompiler {
    /// OpenCL fast math compilation options
    pub const FAST_MATH_OPTIONS: &'static str =
        "-cl-fast-relaxed-math -cl-mad-enable -cl-unsafe-math-optimizations";
}

impl Compiler for OpenCLCompiler {
    type Queue = OpenCLQueue;
    type Kernel = OpenCLKernel;
    type Error = OpenCLError;

    fn new() -> Self {
        Self
    }

    fn compile(
        &self,
        queue: &OpenCLQueue,
        program: &KernelProgram,
    ) -> Result<OpenCLKernel, OpenCLError> {
        let code = OpenCLRenderer::new().render(program);
        let config = queue.context().config();

        let mut builder = Program::builder();
        builder.src(code.as_str()).devices(queue.ocl_device());
        if config.fast_math {
            builder.cmplr_opt(Self::FAST_MATH_OPTIONS);
        }
        let ocl_program = builder.build(queue.ocl_context()).map_err(|e| {
            OpenCLError::from(format!("Failed to build {}: {}", code.entry_point(), e))
        })?;

        Ok(OpenCLKernel::new(
            ocl_program,
            code.entry_point().to_string(),
            config.work_group_size,
        ))
    }
}

//! OpenCL kernel

use crate::buffer::OpenCLBuffer;
use crate::device::{OpenCLError, OpenCLQueue};
use harp_vex_core::backend::{Kernel, KernelArg, LaunchRange};
use harp_vex_core::dtype::Number;
use ocl::{Kernel as OclKernel, Program};

/// OpenCL kernel
///
/// Wraps a built program. Every launch binds `n` and `offset` first, then
/// the arguments in parameter order.
pub struct OpenCLKernel {
    program: Program,
    entry_point: String,
    work_group_size: Option<usize>,
}

impl OpenCLKernel {
    pub(crate) fn new(program: Program, entry_point: String, work_group_size: Option<usize>) -> Self {
        Self {
            program,
            entry_point,
            work_group_size,
        }
    }
}

impl Kernel for OpenCLKernel {
    type Queue = OpenCLQueue;
    type Buffer = OpenCLBuffer;
    type Error = OpenCLError;

    fn name(&self) -> &str {
        &self.entry_point
    }

    fn launch(
        &self,
        queue: &OpenCLQueue,
        args: &[KernelArg<'_, OpenCLBuffer>],
        range: LaunchRange,
    ) -> Result<(), OpenCLError> {
        if range.count == 0 {
            return Ok(());
        }

        let mut kernel_builder = OclKernel::builder();
        kernel_builder
            .program(&self.program)
            .name(&self.entry_point)
            .queue(queue.ocl_queue().clone());

        // The kernel body loops with a grid stride, so the global size
        // only has to be a multiple of the work-group size.
        match self.work_group_size {
            Some(wg) if wg > 0 => {
                kernel_builder
                    .global_work_size(range.count.div_ceil(wg) * wg)
                    .local_work_size(wg);
            }
            _ => {
                kernel_builder.global_work_size(range.count);
            }
        }

        kernel_builder
            .arg(range.count as u64)
            .arg(range.offset as u64);

        for arg in args {
            match arg {
                KernelArg::Buffer(buffer) => buffer.push_arg(&mut kernel_builder),
                KernelArg::Scalar(value) => {
                    match *value {
                        Number::I32(v) => kernel_builder.arg(v),
                        Number::U32(v) => kernel_builder.arg(v),
                        Number::I64(v) => kernel_builder.arg(v),
                        Number::U64(v) => kernel_builder.arg(v),
                        Number::F32(v) => kernel_builder.arg(v),
                        Number::F64(v) => kernel_builder.arg(v),
                    };
                }
            }
        }

        let kernel = kernel_builder.build()?;
        unsafe {
            kernel.enq()?;
        }

        Ok(())
    }
}

// Safety: OpenCL programs are thread-safe
unsafe impl Send for OpenCLKernel {}
unsafe impl Sync for OpenCLKernel {}

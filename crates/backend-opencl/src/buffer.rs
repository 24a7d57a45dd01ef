//! OpenCL device buffer

use crate::device::{OpenCLError, OpenCLQueue};
use harp_vex_core::backend::Buffer;
use harp_vex_core::dtype::{DType, Scalar};
use ocl::builders::KernelBuilder;
use ocl::{Buffer as OclBuffer, flags};
use std::fmt;

/// Typed device memory
enum Mem {
    I32(OclBuffer<i32>),
    U32(OclBuffer<u32>),
    I64(OclBuffer<i64>),
    U64(OclBuffer<u64>),
    F32(OclBuffer<f32>),
    F64(OclBuffer<f64>),
}

/// Run `$body` with `$buf` bound to the typed buffer and `$t` to its element type
macro_rules! with_mem {
    ($mem:expr, |$buf:ident : $t:ident| $body:expr) => {
        match $mem {
            Mem::I32($buf) => {
                type $t = i32;
                $body
            }
            Mem::U32($buf) => {
                type $t = u32;
                $body
            }
            Mem::I64($buf) => {
                type $t = i64;
                $body
            }
            Mem::U64($buf) => {
                type $t = u64;
                $body
            }
            Mem::F32($buf) => {
                type $t = f32;
                $body
            }
            Mem::F64($buf) => {
                type $t = f64;
                $body
            }
        }
    };
}

/// OpenCL device buffer
///
/// Owns one device allocation; it is released when the buffer is dropped.
/// Transfers are enqueued on the queue the buffer was allocated with.
pub struct OpenCLBuffer {
    mem: Mem,
    queue: OpenCLQueue,
    dtype: DType,
    len: usize,
}

impl OpenCLBuffer {
    /// Get the queue this buffer was allocated on
    pub fn queue(&self) -> &OpenCLQueue {
        &self.queue
    }

    /// Bind this buffer as the next positional kernel argument
    pub(crate) fn push_arg<'b>(&'b self, builder: &mut KernelBuilder<'b>) {
        match &self.mem {
            Mem::I32(buf) => builder.arg(buf),
            Mem::U32(buf) => builder.arg(buf),
            Mem::I64(buf) => builder.arg(buf),
            Mem::U64(buf) => builder.arg(buf),
            Mem::F32(buf) => builder.arg(buf),
            Mem::F64(buf) => builder.arg(buf),
        };
    }

    fn check_range(&self, offset: usize, count: usize) -> Result<(), OpenCLError> {
        match offset.checked_add(count) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(format!(
                "Access to elements {}..{} out of bounds for buffer of {} elements",
                offset,
                offset.saturating_add(count),
                self.len
            )
            .into()),
        }
    }
}

impl Buffer for OpenCLBuffer {
    type Queue = OpenCLQueue;
    type Error = OpenCLError;

    fn allocate(queue: &OpenCLQueue, dtype: DType, len: usize) -> Result<Self, OpenCLError> {
        // OpenCL rejects zero-sized allocations
        let device_len = len.max(1);

        macro_rules! build {
            ($variant:ident, $ty:ty) => {
                Mem::$variant(
                    OclBuffer::<$ty>::builder()
                        .queue(queue.ocl_queue().clone())
                        .flags(flags::MEM_READ_WRITE)
                        .len(device_len)
                        .build()?,
                )
            };
        }

        let mem = match dtype {
            DType::I32 => build!(I32, i32),
            DType::U32 => build!(U32, u32),
            DType::I64 => build!(I64, i64),
            DType::U64 => build!(U64, u64),
            DType::F32 => build!(F32, f32),
            DType::F64 => build!(F64, f64),
        };
        log::trace!("OpenCL allocate {} x {}", len, dtype);

        Ok(Self {
            mem,
            queue: queue.clone(),
            dtype,
            len,
        })
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) -> Result<(), OpenCLError> {
        let elem = self.dtype.size_in_bytes();
        if data.len() % elem != 0 {
            return Err(format!(
                "Buffer size {} is not aligned to type size {}",
                data.len(),
                elem
            )
            .into());
        }
        self.check_range(offset, data.len() / elem)?;
        if data.is_empty() {
            return Ok(());
        }

        with_mem!(&self.mem, |buf: E| {
            let typed = E::from_bytes(data);
            buf.write(&typed[..]).offset(offset).enq()?;
        });
        Ok(())
    }

    fn read_bytes(&self, offset: usize, count: usize) -> Result<Vec<u8>, OpenCLError> {
        self.check_range(offset, count)?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let bytes = with_mem!(&self.mem, |buf: E| {
            let mut typed = vec![E::default(); count];
            buf.read(&mut typed[..]).offset(offset).enq()?;
            E::to_bytes(&typed)
        });
        Ok(bytes)
    }

    fn copy_from(&self, src: &Self) -> Result<(), OpenCLError> {
        if std::ptr::eq(self, src) || self.len == 0 {
            return Ok(());
        }
        if src.dtype != self.dtype || src.len != self.len {
            return Err(format!(
                "Cannot copy {} x {} into {} x {}",
                src.len, src.dtype, self.len, self.dtype
            )
            .into());
        }

        match (&src.mem, &self.mem) {
            (Mem::I32(s), Mem::I32(d)) => s.copy(d, None, None).enq()?,
            (Mem::U32(s), Mem::U32(d)) => s.copy(d, None, None).enq()?,
            (Mem::I64(s), Mem::I64(d)) => s.copy(d, None, None).enq()?,
            (Mem::U64(s), Mem::U64(d)) => s.copy(d, None, None).enq()?,
            (Mem::F32(s), Mem::F32(d)) => s.copy(d, None, None).enq()?,
            (Mem::F64(s), Mem::F64(d)) => s.copy(d, None, None).enq()?,
            _ => return Err("Buffer element types differ".into()),
        }
        Ok(())
    }
}

impl fmt::Debug for OpenCLBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenCLBuffer")
            .field("queue", &self.queue)
            .field("dtype", &self.dtype)
            .field("len", &self.len)
            .finish()
    }
}

// Safety: OpenCL memory objects are thread-safe
unsafe impl Send for OpenCLBuffer {}
unsafe impl Sync for OpenCLBuffer {}

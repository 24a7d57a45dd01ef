use super::HostError;
use super::device::HostQueue;
use crate::backend::Buffer;
use crate::dtype::DType;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// ホストメモリ上のデバイスバッファ
pub struct HostBuffer {
    queue: HostQueue,
    dtype: DType,
    len: usize,
    data: RwLock<Vec<u8>>,
}

impl HostBuffer {
    /// バッファを確保したキュー
    pub fn queue(&self) -> &HostQueue {
        &self.queue
    }

    pub(crate) fn read_guard(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    fn byte_range(&self, offset: usize, count: usize) -> Result<(usize, usize), HostError> {
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= self.len)
            .ok_or(HostError::OutOfBounds {
                start: offset,
                end: offset.saturating_add(count),
                len: self.len,
            })?;
        let elem = self.dtype.size_in_bytes();
        Ok((offset * elem, end * elem))
    }
}

impl Buffer for HostBuffer {
    type Queue = HostQueue;
    type Error = HostError;

    fn allocate(queue: &HostQueue, dtype: DType, len: usize) -> Result<Self, HostError> {
        let bytes = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(HostError::OutOfMemory {
                requested: usize::MAX,
                available: 0,
            })?;
        queue.memory().reserve(bytes)?;
        log::trace!("host allocate {} x {} ({} bytes)", len, dtype, bytes);

        Ok(Self {
            queue: queue.clone(),
            dtype,
            len,
            data: RwLock::new(vec![0u8; bytes]),
        })
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn write_bytes(&self, offset: usize, data: &[u8]) -> Result<(), HostError> {
        let elem = self.dtype.size_in_bytes();
        if data.len() % elem != 0 {
            return Err(HostError::Mismatch(format!(
                "{} bytes is not a whole number of {} elements",
                data.len(),
                self.dtype
            )));
        }
        let (start, end) = self.byte_range(offset, data.len() / elem)?;
        self.write_guard()[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_bytes(&self, offset: usize, count: usize) -> Result<Vec<u8>, HostError> {
        let (start, end) = self.byte_range(offset, count)?;
        Ok(self.read_guard()[start..end].to_vec())
    }

    fn copy_from(&self, src: &Self) -> Result<(), HostError> {
        if std::ptr::eq(self, src) {
            return Ok(());
        }
        if src.dtype != self.dtype || src.len != self.len {
            return Err(HostError::Mismatch(format!(
                "cannot copy {} x {} into {} x {}",
                src.len, src.dtype, self.len, self.dtype
            )));
        }
        let bytes = src.read_guard().clone();
        *self.write_guard() = bytes;
        Ok(())
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        self.queue.memory().release(self.byte_len());
    }
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuffer")
            .field("queue", &self.queue)
            .field("dtype", &self.dtype)
            .field("len", &self.len)
            .finish()
    }
}

use super::HostError;
use super::kernel::HostKernel;
use crate::backend::{DeviceContext, Queue};
use crate::config::ExecutionConfig;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_QUEUE_ID: AtomicUsize = AtomicUsize::new(1);

/// ホストデバイスのメモリ使用状況
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostMemoryStats {
    /// 確保回数
    pub allocations: usize,
    /// 解放回数
    pub frees: usize,
    /// 現在確保されているバイト数
    pub live_bytes: usize,
}

/// デバイスメモリの使用量管理
pub(crate) struct HostMemory {
    limit: Option<usize>,
    live_bytes: AtomicUsize,
    allocations: AtomicUsize,
    frees: AtomicUsize,
}

impl HostMemory {
    fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            live_bytes: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
        }
    }

    pub(crate) fn reserve(&self, bytes: usize) -> Result<(), HostError> {
        let limit = self.limit;
        self.live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| match limit {
                Some(limit) => live.checked_add(bytes).filter(|&total| total <= limit),
                None => live.checked_add(bytes),
            })
            .map_err(|live| HostError::OutOfMemory {
                requested: bytes,
                available: limit.unwrap_or(usize::MAX).saturating_sub(live),
            })?;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn release(&self, bytes: usize) {
        self.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
        self.frees.fetch_add(1, Ordering::Relaxed);
    }

    fn stats(&self) -> HostMemoryStats {
        HostMemoryStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.load(Ordering::Relaxed),
        }
    }
}

/// ホストデバイス
///
/// 一つのデバイスコンテキスト（カーネルキャッシュ）とメモリ管理を持ちます。
/// `queue()`で作ったキューはすべてこのコンテキストを共有します。
#[derive(Clone)]
pub struct HostDevice {
    context: Arc<DeviceContext<HostKernel>>,
    memory: Arc<HostMemory>,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    pub fn new() -> Self {
        Self::with_config(ExecutionConfig::default())
    }

    pub fn with_config(config: ExecutionConfig) -> Self {
        Self::build(config, None)
    }

    /// 確保できるバイト数に上限のあるデバイス
    pub fn with_memory_limit(limit_bytes: usize) -> Self {
        Self::build(ExecutionConfig::default(), Some(limit_bytes))
    }

    fn build(config: ExecutionConfig, limit: Option<usize>) -> Self {
        Self {
            context: Arc::new(DeviceContext::new("host", config)),
            memory: Arc::new(HostMemory::new(limit)),
        }
    }

    /// 新しいコマンドキューを作成
    pub fn queue(&self) -> HostQueue {
        HostQueue {
            id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
            context: self.context.clone(),
            memory: self.memory.clone(),
        }
    }

    pub fn context(&self) -> &Arc<DeviceContext<HostKernel>> {
        &self.context
    }

    pub fn memory_stats(&self) -> HostMemoryStats {
        self.memory.stats()
    }
}

impl fmt::Debug for HostDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDevice")
            .field("context", &self.context)
            .field("memory", &self.memory.stats())
            .finish()
    }
}

/// ホストデバイスのコマンドキュー
///
/// 投入された処理はその場で実行されます。
#[derive(Clone)]
pub struct HostQueue {
    id: usize,
    context: Arc<DeviceContext<HostKernel>>,
    memory: Arc<HostMemory>,
}

impl HostQueue {
    pub(crate) fn memory(&self) -> &HostMemory {
        &self.memory
    }

    /// キューが属するデバイスのメモリ使用状況
    pub fn memory_stats(&self) -> HostMemoryStats {
        self.memory.stats()
    }
}

impl Queue for HostQueue {
    type Kernel = HostKernel;
    type Error = HostError;

    fn queue_id(&self) -> usize {
        self.id
    }

    fn context(&self) -> &Arc<DeviceContext<HostKernel>> {
        &self.context
    }

    fn finish(&self) -> Result<(), HostError> {
        Ok(())
    }
}

impl fmt::Debug for HostQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostQueue")
            .field("id", &self.id)
            .field("context", &self.context.id())
            .finish()
    }
}

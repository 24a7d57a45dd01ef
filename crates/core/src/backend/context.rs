//! デバイスコンテキスト
//!
//! デバイスごとのカーネルキャッシュと実行設定を保持するサービスです。
//! 同じデバイスの全キューが`Arc`で共有します。

use crate::cache::KernelCache;
use crate::config::ExecutionConfig;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// デバイスコンテキスト
pub struct DeviceContext<K> {
    id: usize,
    name: String,
    config: ExecutionConfig,
    kernel_cache: KernelCache<K>,
}

impl<K> DeviceContext<K> {
    /// 新しいコンテキストを作成
    pub fn new(name: impl Into<String>, config: ExecutionConfig) -> Self {
        let kernel_cache = KernelCache::with_enabled(config.enable_cache);
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            config,
            kernel_cache,
        }
    }

    /// プロセス内で一意なコンテキスト識別子
    pub fn id(&self) -> usize {
        self.id
    }

    /// デバイス名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 実行設定
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// カーネルキャッシュ
    pub fn kernel_cache(&self) -> &KernelCache<K> {
        &self.kernel_cache
    }
}

impl<K> fmt::Debug for DeviceContext<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("config", &self.config)
            .field("cached_kernels", &self.kernel_cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        let a: DeviceContext<()> = DeviceContext::new("a", ExecutionConfig::default());
        let b: DeviceContext<()> = DeviceContext::new("b", ExecutionConfig::default());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "a");
    }

    #[test]
    fn test_context_cache_follows_config() {
        let ctx: DeviceContext<()> =
            DeviceContext::new("nocache", ExecutionConfig::default().with_cache(false));
        assert!(!ctx.kernel_cache().is_enabled());
    }
}

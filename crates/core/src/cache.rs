//! カーネルシグネチャとカーネルキャッシュ
//!
//! 式木の構造を文字列化したものをキーに、コンパイル済みカーネルを再利用します。
//! キャッシュはデバイスコンテキストごとに一つ存在し、そのデバイスの全キューで共有されます。

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// カーネルシグネチャ
///
/// 演算の種類とオペランドの型だけから作られる構造的な表現です。
/// リテラルの値やどのベクトルを参照しているかは含みません。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KernelSignature(String);

impl KernelSignature {
    pub fn new(repr: impl Into<String>) -> Self {
        Self(repr.into())
    }

    /// 文字列表現を取得
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KernelSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernelSignature({})", self.0)
    }
}

impl fmt::Display for KernelSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// キャッシュの統計情報
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// キャッシュヒット数
    pub hits: usize,
    /// キャッシュミス数
    pub misses: usize,
    /// コンパイル回数
    pub compiles: usize,
    /// エントリ数
    pub entries: usize,
}

impl CacheStats {
    /// ヒット率（0.0〜1.0）
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// コンパイル済みカーネルのキャッシュ
///
/// シグネチャごとに一度だけ書き込まれ、以後は読み取り専用です。
pub struct KernelCache<K> {
    cache: RwLock<FxHashMap<KernelSignature, Arc<K>>>,
    enabled: bool,
    hits: AtomicUsize,
    misses: AtomicUsize,
    compiles: AtomicUsize,
}

impl<K> Default for KernelCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KernelCache<K> {
    /// 新しいキャッシュを作成
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// 有効・無効を指定して作成
    ///
    /// 無効なキャッシュは何も保持せず、毎回コンパイルさせます。
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            cache: RwLock::new(FxHashMap::default()),
            enabled,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            compiles: AtomicUsize::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// キャッシュからカーネルを取得
    pub fn lookup(&self, sig: &KernelSignature) -> Option<Arc<K>> {
        if !self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let found = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(sig)
            .cloned();
        match found {
            Some(kernel) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::trace!("kernel cache hit: {}", sig);
                Some(kernel)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("kernel cache miss: {}", sig);
                None
            }
        }
    }

    /// キャッシュにカーネルを挿入
    ///
    /// 同じシグネチャが既に登録されていれば既存のエントリを返します（先勝ち）。
    pub fn insert(&self, sig: KernelSignature, kernel: K) -> Arc<K> {
        let kernel = Arc::new(kernel);
        if !self.enabled {
            return kernel;
        }

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.entry(sig).or_insert(kernel).clone()
    }

    /// キャッシュから取得、なければコンパイルして挿入
    ///
    /// コンパイルは書き込みロックを保持したまま行うため、同じシグネチャに対して
    /// 同時にミスしても、コンパイルされるのは一度だけです。
    pub fn get_or_insert_with<F, E>(&self, sig: &KernelSignature, compile: F) -> Result<Arc<K>, E>
    where
        F: FnOnce() -> Result<K, E>,
    {
        if let Some(kernel) = self.lookup(sig) {
            return Ok(kernel);
        }

        if !self.enabled {
            let kernel = compile()?;
            self.compiles.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::new(kernel));
        }

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        // 別スレッドが先にコンパイルしていれば再利用する
        if let Some(kernel) = cache.get(sig) {
            log::trace!("kernel inserted concurrently: {}", sig);
            return Ok(kernel.clone());
        }

        let kernel = Arc::new(compile()?);
        self.compiles.fetch_add(1, Ordering::Relaxed);
        cache.insert(sig.clone(), kernel.clone());
        Ok(kernel)
    }

    /// 統計情報を取得
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// エントリ数を取得
    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// シグネチャが登録済みか
    pub fn contains(&self, sig: &KernelSignature) -> bool {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let cache: KernelCache<String> = KernelCache::new();
        let sig = KernelSignature::new("double <- add(v:double, v:double)");

        // Miss
        assert!(cache.lookup(&sig).is_none());
        assert_eq!(cache.stats().misses, 1);

        // Insert
        let kernel = cache.insert(sig.clone(), "kernel".to_string());
        assert_eq!(*kernel, "kernel");
        assert_eq!(cache.len(), 1);

        // Hit
        assert_eq!(cache.lookup(&sig).as_deref(), Some(&"kernel".to_string()));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_insert_is_write_once() {
        let cache: KernelCache<i32> = KernelCache::new();
        let sig = KernelSignature::new("int <- s:int");

        let first = cache.insert(sig.clone(), 1);
        let second = cache.insert(sig.clone(), 2);
        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_insert_with() {
        let cache: KernelCache<i32> = KernelCache::new();
        let sig = KernelSignature::new("float <- sin(v:float)");

        let result: Result<Arc<i32>, ()> = cache.get_or_insert_with(&sig, || Ok(42));
        assert_eq!(*result.unwrap(), 42);

        let mut called = false;
        let result: Result<Arc<i32>, ()> = cache.get_or_insert_with(&sig, || {
            called = true;
            Ok(100)
        });
        assert_eq!(*result.unwrap(), 42);
        assert!(!called);

        let stats = cache.stats();
        assert_eq!(stats.compiles, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_compile_error_is_not_cached() {
        let cache: KernelCache<i32> = KernelCache::new();
        let sig = KernelSignature::new("broken");

        let result: Result<Arc<i32>, &str> = cache.get_or_insert_with(&sig, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(!cache.contains(&sig));
        assert_eq!(cache.stats().compiles, 0);
    }

    #[test]
    fn test_concurrent_miss_compiles_once() {
        use std::sync::Barrier;
        use std::thread;
        use std::time::Duration;

        let cache: KernelCache<usize> = KernelCache::new();
        let sig = KernelSignature::new("double <- mul(v:double, s:double)");
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(4);

        let kernels: Vec<Arc<usize>> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let (cache, sig, calls, barrier) = (&cache, &sig, &calls, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        cache
                            .get_or_insert_with::<_, ()>(sig, || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(20));
                                Ok(i)
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().compiles, 1);
        assert_eq!(cache.len(), 1);
        assert!(kernels.iter().all(|k| Arc::ptr_eq(k, &kernels[0])));
    }

    #[test]
    fn test_cache_disabled() {
        let cache: KernelCache<i32> = KernelCache::with_enabled(false);
        let sig = KernelSignature::new("int <- idx");

        let _ = cache.get_or_insert_with::<_, ()>(&sig, || Ok(1));
        let _ = cache.get_or_insert_with::<_, ()>(&sig, || Ok(2));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().compiles, 2);
    }
}

//! 実行設定
//!
//! デバイスコンテキストごとに保持され、カーネル生成とキャッシュの挙動を制御します。

/// 生成したカーネルソースをログに出す
pub const ENV_SHOW_KERNELS: &str = "HARP_VEX_SHOW_KERNELS";
/// カーネルキャッシュを無効化する
pub const ENV_DISABLE_CACHE: &str = "HARP_VEX_DISABLE_CACHE";
/// 高速数学演算を有効化する
pub const ENV_FAST_MATH: &str = "HARP_VEX_FAST_MATH";

/// 実行設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// キャッシュの有効化
    pub enable_cache: bool,
    /// 初回生成時にカーネルソースを `log::debug!` で出力
    pub show_kernels: bool,
    /// 高速数学演算を有効化（精度が落ちる可能性あり）
    pub fast_math: bool,
    /// ワークグループサイズ（`None`ならドライバに任せる）
    pub work_group_size: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            show_kernels: false,
            fast_math: false,
            work_group_size: None,
        }
    }
}

impl ExecutionConfig {
    /// 環境変数を反映した設定を作成
    ///
    /// 値が `0` / `false` / 空文字以外なら有効とみなします。
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key)
                .map(|v| {
                    let v = v.trim();
                    !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
                })
                .unwrap_or(false)
        };

        let mut config = Self::default();
        if flag(ENV_SHOW_KERNELS) {
            config.show_kernels = true;
        }
        if flag(ENV_DISABLE_CACHE) {
            config.enable_cache = false;
        }
        if flag(ENV_FAST_MATH) {
            config.fast_math = true;
        }
        config
    }

    /// ワークグループサイズを設定
    pub fn with_work_group_size(mut self, size: usize) -> Self {
        self.work_group_size = Some(size);
        self
    }

    /// キャッシュの有効・無効を設定
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    /// カーネルソースの出力を設定
    pub fn with_show_kernels(mut self, enabled: bool) -> Self {
        self.show_kernels = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_execution_config_default() {
        let config = ExecutionConfig::default();
        assert!(config.enable_cache);
        assert!(!config.show_kernels);
        assert!(!config.fast_math);
        assert_eq!(config.work_group_size, None);
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_SHOW_KERNELS, "1"),
            (ENV_DISABLE_CACHE, "true"),
            (ENV_FAST_MATH, "0"),
        ]
        .into_iter()
        .collect();

        let config = ExecutionConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(config.show_kernels);
        assert!(!config.enable_cache);
        assert!(!config.fast_math);
    }

    #[test]
    fn test_config_builders() {
        let config = ExecutionConfig::default()
            .with_work_group_size(128)
            .with_cache(false);
        assert_eq!(config.work_group_size, Some(128));
        assert!(!config.enable_cache);
    }
}

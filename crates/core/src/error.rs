//! エラー型
//!
//! 分散ベクトル・式エンジン・バックエンドのエラーを一つのenumにまとめます。
//! バックエンド固有のエラーはメッセージ文字列として取り込みます。

use thiserror::Error;

/// harp-vex 全体で使うエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VexError {
    /// 形状・サイズの不整合（キューなしで非ゼロサイズ、次元数の不一致など）
    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// サイズ不一致（コピー先のサイズ、式オペランドのパーティション構成）
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// デバイスメモリの確保に失敗
    #[error("device allocation failed: {0}")]
    DeviceAllocation(String),

    /// ホスト・デバイス間またはデバイス間の転送に失敗
    #[error("device transfer failed: {0}")]
    DeviceTransfer(String),

    /// カーネル生成で扱えないオペランド
    #[error("unsupported operand in kernel: {0}")]
    UnsupportedOperand(String),

    /// カーネルのコンパイルエラー
    #[error("kernel compilation failed: {0}")]
    Compilation(String),

    /// カーネルの投入・実行エラー
    #[error("kernel execution failed: {0}")]
    KernelExecution(String),
}

impl VexError {
    /// 要素数の不一致
    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        VexError::SizeMismatch(format!("expected {} elements, got {}", expected, actual))
    }
}

/// harp-vex の Result 型
pub type Result<T> = std::result::Result<T, VexError>;

//! バックエンドトレイト定義
//!
//! デバイスのコマンドキュー、デバイスバッファ、コンパイル済みカーネル、
//! カーネルコンパイラのインターフェースを定義します。
//! 具体的な実装はホスト（リファレンス）バックエンドと OpenCL バックエンドが提供します。

use crate::ast::KernelProgram;
use crate::backend::DeviceContext;
use crate::dtype::{DType, Number, Scalar};
use std::sync::Arc;

/// デバイスのコマンドキュー
///
/// 呼び出し側から渡される不透明なハンドルです。クローンは同じキューを指します。
/// 同じキューに投入された処理は投入順に実行されますが、
/// 異なるキュー同士の順序は保証されません。
pub trait Queue: Clone + Send + Sync + 'static {
    /// このキューのデバイスでコンパイルされたカーネルの型
    type Kernel: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// コマンドキューの識別子（同じキューのクローンは同じ値を返す）
    fn queue_id(&self) -> usize;

    /// このキューが属するデバイスコンテキスト
    fn context(&self) -> &Arc<DeviceContext<Self::Kernel>>;

    /// デバイス名
    fn device_name(&self) -> String {
        self.context().name().to_string()
    }

    /// 投入済みの処理がすべて完了するまで待つ
    fn finish(&self) -> Result<(), Self::Error>;
}

/// デバイスバッファ
///
/// 一つのパーティションのデバイスメモリを排他的に所有します。
/// `Drop`でメモリを解放してください。
/// 転送はバッファを確保したキューに対して行われます。
pub trait Buffer: Sized + Send + Sync {
    type Queue: Queue;
    type Error: std::error::Error + Send + Sync + 'static;

    /// `len`要素分のデバイスメモリを確保（内容は未初期化）
    fn allocate(queue: &Self::Queue, dtype: DType, len: usize) -> Result<Self, Self::Error>;

    /// 要素数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 要素型
    fn dtype(&self) -> DType;

    /// 総バイト数
    fn byte_len(&self) -> usize {
        self.len() * self.dtype().size_in_bytes()
    }

    /// ホストのバイト列を要素オフセット`offset`の位置へ書き込む
    fn write_bytes(&self, offset: usize, data: &[u8]) -> Result<(), Self::Error>;

    /// 要素オフセット`offset`から`count`要素をホストへ読み出す（ブロッキング）
    fn read_bytes(&self, offset: usize, count: usize) -> Result<Vec<u8>, Self::Error>;

    /// 同じ長さ・型の別バッファから内容をコピー（デバイス間転送）
    fn copy_from(&self, src: &Self) -> Result<(), Self::Error>;

    /// 型付きデータを書き込む
    fn write_slice<T: Scalar>(&self, offset: usize, data: &[T]) -> Result<(), Self::Error> {
        self.write_bytes(offset, &T::to_bytes(data))
    }

    /// 型付きデータを読み出す
    fn read_vec<T: Scalar>(&self, offset: usize, count: usize) -> Result<Vec<T>, Self::Error> {
        let bytes = self.read_bytes(offset, count)?;
        Ok(T::from_bytes(&bytes))
    }
}

/// カーネル引数
///
/// パラメータの順番は `KernelProgram::params` と一致させます。
pub enum KernelArg<'a, B> {
    /// デバイスバッファ
    Buffer(&'a B),
    /// スカラー値
    Scalar(Number),
}

impl<B> Clone for KernelArg<'_, B> {
    fn clone(&self) -> Self {
        match self {
            KernelArg::Buffer(b) => KernelArg::Buffer(*b),
            KernelArg::Scalar(n) => KernelArg::Scalar(*n),
        }
    }
}

/// カーネルの実行範囲
///
/// `count`個のワークアイテムを起動します。`offset`はパーティションの
/// 論理インデックス空間での開始位置で、要素インデックスの計算に使われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchRange {
    pub offset: usize,
    pub count: usize,
}

impl LaunchRange {
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }
}

/// コンパイル済みカーネル
pub trait Kernel: Send + Sync + 'static {
    type Queue: Queue;
    type Buffer: Buffer<Queue = Self::Queue>;
    type Error: std::error::Error + Send + Sync + 'static;

    /// エントリポイント名
    fn name(&self) -> &str;

    /// カーネルをキューに投入
    ///
    /// 投入のみを行い、完了は待ちません（キューの順序保証に従います）。
    fn launch(
        &self,
        queue: &Self::Queue,
        args: &[KernelArg<'_, Self::Buffer>],
        range: LaunchRange,
    ) -> Result<(), Self::Error>;
}

/// カーネルコンパイラ
///
/// 下位表現（`KernelProgram`）から実行可能なカーネルを作ります。
pub trait Compiler: Sized {
    type Queue: Queue;
    type Kernel: Kernel<Queue = Self::Queue>;
    type Error: std::error::Error + Send + Sync + 'static;

    fn new() -> Self;

    fn compile(
        &self,
        queue: &Self::Queue,
        program: &KernelProgram,
    ) -> Result<Self::Kernel, Self::Error>;
}

/// バックエンド抽象化トレイト
///
/// 各バックエンドはこのトレイトを実装し、関連する型をひとつにまとめます。
pub trait Backend: 'static + Sized {
    type Queue: Queue<Kernel = Self::Kernel>;
    type Buffer: Buffer<Queue = Self::Queue>;
    type Kernel: Kernel<Queue = Self::Queue, Buffer = Self::Buffer>;
    type Compiler: Compiler<Queue = Self::Queue, Kernel = Self::Kernel>;

    /// バックエンド名
    fn name() -> &'static str;
}

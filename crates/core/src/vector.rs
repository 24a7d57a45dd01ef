//! 分散デバイスベクトル
//!
//! 論理的には長さ`size`の1次元配列で、実体はキューごとのパーティションに分割され、
//! パーティションごとに一つのデバイスバッファを排他的に所有します。
//!
//! - 空のベクトル（`Default`）はパーティションもバッファも持たない
//! - 構築・リサイズに失敗した場合は空の状態になる
//! - ムーブ（`take`）と`swap`はデバイスの確保・解放・転送を伴わない

use crate::backend::{Backend, Buffer, Queue};
use crate::dtype::Scalar;
use crate::engine;
use crate::error::{Result, VexError};
use crate::expr::{Expr, IntoExpr, VectorOperand};
use crate::partition::{self, Partition};
use std::fmt;
use std::marker::PhantomData;

/// 複数デバイスに分割されたベクトル
pub struct DistributedVector<T: Scalar, B: Backend> {
    partitions: Vec<Partition<B::Queue>>,
    buffers: Vec<B::Buffer>,
    size: usize,
    _marker: PhantomData<T>,
}

impl<T: Scalar, B: Backend> Default for DistributedVector<T, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, B: Backend> DistributedVector<T, B> {
    // ============================================================
    // 構築
    // ============================================================

    /// 空のベクトル
    pub fn new() -> Self {
        Self {
            partitions: Vec::new(),
            buffers: Vec::new(),
            size: 0,
            _marker: PhantomData,
        }
    }

    /// `size`要素のベクトルを`queues`に分割して確保（内容は未初期化）
    pub fn with_size(queues: &[B::Queue], size: usize) -> Result<Self> {
        let partitions = partition::plan(size, queues)?;
        Self::allocate(partitions, size)
    }

    /// ホストのデータからベクトルを作成
    pub fn from_slice(queues: &[B::Queue], data: &[T]) -> Result<Self> {
        let mut vector = Self::with_size(queues, data.len())?;
        vector.copy_from_host(data)?;
        Ok(vector)
    }

    /// ホストのポインタから`size`要素を読み込んでベクトルを作成
    ///
    /// # Safety
    ///
    /// `size > 0`のとき、`ptr`は`size`個の初期化済みの`T`を指す有効なポインタで、
    /// 呼び出しの間その領域が変更されないこと。
    pub unsafe fn from_raw_parts(queues: &[B::Queue], size: usize, ptr: *const T) -> Result<Self> {
        if size == 0 {
            return Self::with_size(queues, 0);
        }
        let data = unsafe { std::slice::from_raw_parts(ptr, size) };
        Self::from_slice(queues, data)
    }

    fn allocate(partitions: Vec<Partition<B::Queue>>, size: usize) -> Result<Self> {
        // 途中で失敗した場合、確保済みのバッファはここでドロップされ解放される
        let buffers = partitions
            .iter()
            .map(|p| {
                B::Buffer::allocate(&p.queue, T::DTYPE, p.count)
                    .map_err(|e| VexError::DeviceAllocation(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "allocated vector<{}> of {} elements in {} partitions",
            T::DTYPE,
            size,
            partitions.len()
        );
        Ok(Self {
            partitions,
            buffers,
            size,
            _marker: PhantomData,
        })
    }

    /// 内容を複製した新しいベクトル（同じキュー・同じパーティション構成）
    pub fn try_clone(&self) -> Result<Self> {
        let copy = Self::allocate(self.partitions.clone(), self.size)?;
        for (dst, src) in copy.buffers.iter().zip(&self.buffers) {
            dst.copy_from(src)
                .map_err(|e| VexError::DeviceTransfer(e.to_string()))?;
        }
        Ok(copy)
    }

    /// 中身を取り出し、自身を空の状態にする
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// 二つのベクトルの中身を交換
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// 空の状態にする（バッファは解放される）
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // ============================================================
    // リサイズ
    // ============================================================

    /// 作り直して`size`要素にする（内容は未初期化）
    pub fn resize(&mut self, queues: &[B::Queue], size: usize) -> Result<()> {
        self.clear();
        *self = Self::with_size(queues, size)?;
        Ok(())
    }

    /// 作り直してホストのデータで初期化する
    pub fn resize_from_slice(&mut self, queues: &[B::Queue], data: &[T]) -> Result<()> {
        self.clear();
        *self = Self::from_slice(queues, data)?;
        Ok(())
    }

    /// 作り直して`src`と同じ構成・内容にする
    pub fn resize_from(&mut self, src: &Self) -> Result<()> {
        self.clear();
        *self = src.try_clone()?;
        Ok(())
    }

    // ============================================================
    // 情報
    // ============================================================

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// パーティション数
    pub fn nparts(&self) -> usize {
        self.partitions.len()
    }

    /// `d`番目のパーティションの開始位置（`d == nparts()`なら`size()`）
    pub fn part_start(&self, d: usize) -> usize {
        self.partitions.get(d).map_or(self.size, |p| p.offset)
    }

    /// `d`番目のパーティションの要素数
    pub fn part_size(&self, d: usize) -> usize {
        self.partitions.get(d).map_or(0, |p| p.count)
    }

    pub fn partitions(&self) -> &[Partition<B::Queue>] {
        &self.partitions
    }

    /// パーティションごとのデバイスバッファ
    pub fn buffers(&self) -> &[B::Buffer] {
        &self.buffers
    }

    /// パーティションのキュー
    pub fn queues(&self) -> Vec<B::Queue> {
        self.partitions.iter().map(|p| p.queue.clone()).collect()
    }

    pub(crate) fn operand(&self) -> VectorOperand<'_, B> {
        VectorOperand {
            partitions: &self.partitions,
            buffers: &self.buffers,
            dtype: T::DTYPE,
            size: self.size,
        }
    }

    // ============================================================
    // 式の代入
    // ============================================================

    /// 式を要素ごとに評価して代入
    ///
    /// 右辺が自身を参照していても構いません（`x.assign(&x * 2.0)`）。
    /// 投入のみを行い、完了は待ちません。
    pub fn assign<'e>(&self, expr: impl IntoExpr<'e, B>) -> Result<&Self> {
        engine::assign(&self.operand(), &expr.into_expr())?;
        Ok(self)
    }

    /// すべての要素を`value`にする
    pub fn fill(&self, value: T) -> Result<&Self> {
        self.assign(Expr::<B>::Scalar(value.to_number()))
    }

    // ============================================================
    // ホストとの転送
    // ============================================================

    /// 全要素をホストへ読み出す（ブロッキング）
    pub fn copy_to_host(&self, dst: &mut [T]) -> Result<()> {
        if dst.len() != self.size {
            return Err(VexError::size_mismatch(self.size, dst.len()));
        }
        for (part, buffer) in self.partitions.iter().zip(&self.buffers) {
            let data = buffer
                .read_vec::<T>(0, part.count)
                .map_err(|e| VexError::DeviceTransfer(e.to_string()))?;
            dst[part.range()].copy_from_slice(&data);
        }
        Ok(())
    }

    /// ホストのデータを書き込む
    pub fn copy_from_host(&mut self, src: &[T]) -> Result<()> {
        if src.len() != self.size {
            return Err(VexError::size_mismatch(self.size, src.len()));
        }
        for (part, buffer) in self.partitions.iter().zip(&self.buffers) {
            buffer
                .write_slice(0, &src[part.range()])
                .map_err(|e| VexError::DeviceTransfer(e.to_string()))?;
        }
        Ok(())
    }

    /// 全要素をホストの`Vec`として取得
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut host = vec![T::default(); self.size];
        self.copy_to_host(&mut host)?;
        Ok(host)
    }

    /// 1要素を読み出す
    pub fn get(&self, index: usize) -> Result<T> {
        let d = self.locate(index)?;
        let part = &self.partitions[d];
        let data = self.buffers[d]
            .read_vec::<T>(index - part.offset, 1)
            .map_err(|e| VexError::DeviceTransfer(e.to_string()))?;
        data.first()
            .copied()
            .ok_or_else(|| VexError::DeviceTransfer(format!("no data read at index {}", index)))
    }

    /// 1要素を書き込む
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        let d = self.locate(index)?;
        let part = &self.partitions[d];
        self.buffers[d]
            .write_slice(index - part.offset, &[value])
            .map_err(|e| VexError::DeviceTransfer(e.to_string()))
    }

    fn locate(&self, index: usize) -> Result<usize> {
        partition::find(&self.partitions, index).ok_or_else(|| {
            VexError::InvalidSize(format!(
                "index {} is out of range for a vector of {} elements",
                index, self.size
            ))
        })
    }

    /// すべてのパーティションのキューの完了を待つ
    pub fn finish(&self) -> Result<()> {
        for part in &self.partitions {
            part.queue
                .finish()
                .map_err(|e| VexError::KernelExecution(e.to_string()))?;
        }
        Ok(())
    }
}

impl<'a, T: Scalar, B: Backend> IntoExpr<'a, B> for &'a DistributedVector<T, B> {
    fn into_expr(self) -> Expr<'a, B> {
        Expr::Vector(self.operand())
    }
}

impl<T: Scalar, B: Backend> fmt::Debug for DistributedVector<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedVector")
            .field("dtype", &T::DTYPE)
            .field("size", &self.size)
            .field("partitions", &self.partitions)
            .finish()
    }
}

/// ベクトルの内容をホストへ読み出す
pub fn copy<T: Scalar, B: Backend>(src: &DistributedVector<T, B>, dst: &mut [T]) -> Result<()> {
    src.copy_to_host(dst)
}

/// ホストのデータをベクトルへ書き込む
pub fn copy_from<T: Scalar, B: Backend>(src: &[T], dst: &mut DistributedVector<T, B>) -> Result<()> {
    dst.copy_from_host(src)
}

/// 二つのベクトルの中身を交換
pub fn swap<T: Scalar, B: Backend>(a: &mut DistributedVector<T, B>, b: &mut DistributedVector<T, B>) {
    a.swap(b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::host::{HostBackend, HostDevice, HostQueue};

    type Vector<T> = DistributedVector<T, HostBackend>;

    fn setup(n: usize) -> (HostDevice, Vec<HostQueue>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = HostDevice::new();
        let queues = (0..n).map(|_| device.queue()).collect();
        (device, queues)
    }

    #[test]
    fn test_empty() {
        let x = Vector::<f64>::new();
        assert_eq!(x.size(), 0);
        assert_eq!(x.nparts(), 0);
        assert!(x.to_vec().unwrap().is_empty());
        assert_eq!(x.part_start(0), 0);
    }

    #[test]
    fn test_zero_size_owns_nothing() {
        let (device, queues) = setup(3);
        let x = Vector::<f32>::with_size(&queues, 0).unwrap();
        assert_eq!(x.nparts(), 0);
        assert_eq!(device.memory_stats().allocations, 0);
    }

    #[test]
    fn test_part_layout() {
        let (_device, queues) = setup(3);
        let x = Vector::<i32>::with_size(&queues, 10).unwrap();

        assert_eq!(x.nparts(), 3);
        assert_eq!(x.part_start(1), 4);
        assert_eq!(x.part_size(1), 3);
        assert_eq!(x.part_start(3), 10);
        assert_eq!(x.queues().len(), 3);
    }

    #[test]
    fn test_get_set() {
        let (_device, queues) = setup(2);
        let mut x = Vector::<u32>::from_slice(&queues, &[1, 2, 3, 4, 5]).unwrap();

        x.set(3, 40).unwrap();
        assert_eq!(x.get(3).unwrap(), 40);
        assert_eq!(x.get(4).unwrap(), 5);
        assert!(matches!(x.get(5), Err(VexError::InvalidSize(_))));
    }

    #[test]
    fn test_copy_to_host_size_mismatch() {
        let (_device, queues) = setup(1);
        let x = Vector::<f64>::with_size(&queues, 4).unwrap();
        let mut host = vec![0.0; 3];
        assert!(matches!(
            x.copy_to_host(&mut host),
            Err(VexError::SizeMismatch(_))
        ));
    }

    #[test]
    fn test_failed_allocation_leaves_empty() {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = HostDevice::with_memory_limit(64);
        let queues = vec![device.queue(), device.queue()];
        let mut x = Vector::<f64>::with_size(&queues, 4).unwrap();

        let err = x.resize(&queues, 16).unwrap_err();
        assert!(matches!(err, VexError::DeviceAllocation(_)));
        assert!(x.is_empty());
        assert_eq!(x.nparts(), 0);
        assert_eq!(device.memory_stats().live_bytes, 0);
    }

    #[test]
    fn test_raw_parts() {
        let (_device, queues) = setup(2);
        let host = [1.5f64, 2.5, 3.5];
        let x = unsafe { Vector::<f64>::from_raw_parts(&queues, host.len(), host.as_ptr()) }
            .unwrap();
        assert_eq!(x.to_vec().unwrap(), host);

        let empty =
            unsafe { Vector::<f64>::from_raw_parts(&queues, 0, std::ptr::null()) }.unwrap();
        assert!(empty.is_empty());
    }
}

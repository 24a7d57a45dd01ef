//! 多次元配列
//!
//! 各軸の長さを持ち、実体は全要素数の分散ベクトルです。
//! 保存と式の代入はすべて内部のベクトルに委譲します。
//! 軸を意識したインデックスやスライスは提供しません。

use crate::backend::Backend;
use crate::dtype::Scalar;
use crate::error::{Result, VexError};
use crate::expr::{Expr, IntoExpr, MultiArrayOperand};
use crate::vector::DistributedVector;
use ndarray::{ArrayD, IxDyn};

/// `NDIM`次元の配列
#[derive(Debug)]
pub struct MultiArray<T: Scalar, B: Backend, const NDIM: usize> {
    lengths: [usize; NDIM],
    vector: DistributedVector<T, B>,
}

impl<T: Scalar, B: Backend, const NDIM: usize> MultiArray<T, B, NDIM> {
    /// 各軸の長さ`lengths`の配列を確保（内容は未初期化）
    ///
    /// `lengths.len() != NDIM`、長さ0の軸、要素数のオーバーフローは`InvalidSize`になります。
    pub fn new(queues: &[B::Queue], lengths: &[usize]) -> Result<Self> {
        let lengths = Self::check_lengths(lengths)?;
        let total = lengths
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                VexError::InvalidSize(format!("element count of {:?} overflows", lengths))
            })?;

        let vector = DistributedVector::with_size(queues, total)?;
        Ok(Self { lengths, vector })
    }

    /// ホストのデータから作成（`data`は行優先で並んでいること）
    pub fn from_slice(queues: &[B::Queue], lengths: &[usize], data: &[T]) -> Result<Self> {
        let mut array = Self::new(queues, lengths)?;
        array.vector.copy_from_host(data)?;
        Ok(array)
    }

    /// `ndarray`の配列から作成
    pub fn from_ndarray(queues: &[B::Queue], array: &ArrayD<T>) -> Result<Self> {
        let data: Vec<T> = array.iter().copied().collect();
        Self::from_slice(queues, array.shape(), &data)
    }

    fn check_lengths(lengths: &[usize]) -> Result<[usize; NDIM]> {
        let lengths: [usize; NDIM] = lengths.try_into().map_err(|_| {
            VexError::InvalidSize(format!(
                "expected {} axis lengths, got {}",
                NDIM,
                lengths.len()
            ))
        })?;
        if NDIM == 0 {
            return Err(VexError::InvalidSize(
                "a multi-dimensional array needs at least one axis".to_string(),
            ));
        }
        if let Some(axis) = lengths.iter().position(|&n| n == 0) {
            return Err(VexError::InvalidSize(format!("axis {} has zero length", axis)));
        }
        Ok(lengths)
    }

    /// 全要素数（各軸の長さの積）
    pub fn size(&self) -> usize {
        self.vector.size()
    }

    pub fn lengths(&self) -> &[usize; NDIM] {
        &self.lengths
    }

    pub fn ndim(&self) -> usize {
        NDIM
    }

    /// 内部の1次元ベクトル
    pub fn vector(&self) -> &DistributedVector<T, B> {
        &self.vector
    }

    pub fn vector_mut(&mut self) -> &mut DistributedVector<T, B> {
        &mut self.vector
    }

    pub fn into_vector(self) -> DistributedVector<T, B> {
        self.vector
    }

    /// 式を代入（右辺は1次元のベクトルで組み立てること）
    pub fn assign<'e>(&self, expr: impl IntoExpr<'e, B>) -> Result<&Self> {
        self.vector.assign(expr)?;
        Ok(self)
    }

    pub fn fill(&self, value: T) -> Result<&Self> {
        self.vector.fill(value)?;
        Ok(self)
    }

    pub fn copy_to_host(&self, dst: &mut [T]) -> Result<()> {
        self.vector.copy_to_host(dst)
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.vector.to_vec()
    }

    /// 形状付きでホストへ読み出す
    pub fn to_ndarray(&self) -> Result<ArrayD<T>> {
        let data = self.vector.to_vec()?;
        ArrayD::from_shape_vec(IxDyn(&self.lengths), data)
            .map_err(|e| VexError::InvalidSize(e.to_string()))
    }
}

impl<'a, T: Scalar, B: Backend, const NDIM: usize> IntoExpr<'a, B> for &'a MultiArray<T, B, NDIM> {
    fn into_expr(self) -> Expr<'a, B> {
        Expr::MultiArray(MultiArrayOperand {
            lengths: self.lengths.to_vec(),
            vector: self.vector.operand(),
        })
    }
}

//! 遅延評価される要素ごとの式
//!
//! ベクトル・スカラー・要素インデックス・演算・組み込み関数からなる木です。
//! 式は参照しているベクトルを借用するだけで、代入されるまで何も実行しません。
//!
//! ```ignore
//! let x = DistributedVector::<f64, HostBackend>::with_size(&queues, 1024)?;
//! let y = DistributedVector::<f64, HostBackend>::with_size(&queues, 1024)?;
//! x.assign(2.0 * std::f64::consts::PI * element_index())?;
//! y.assign(pow(sin(&x), 2) + pow(cos(&x), 2))?;
//! ```

mod ops;

use crate::ast::{BinaryOp, Function, UnaryOp};
use crate::backend::Backend;
use crate::dtype::{DType, Number};
use crate::error::{Result, VexError};
use crate::partition::Partition;
use std::fmt;

/// 式中のベクトル参照
///
/// パーティションとバッファを借用します。
pub struct VectorOperand<'a, B: Backend> {
    pub partitions: &'a [Partition<B::Queue>],
    pub buffers: &'a [B::Buffer],
    pub dtype: DType,
    pub size: usize,
}

impl<B: Backend> Clone for VectorOperand<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for VectorOperand<'_, B> {}

impl<B: Backend> fmt::Debug for VectorOperand<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorOperand")
            .field("dtype", &self.dtype)
            .field("size", &self.size)
            .field("nparts", &self.partitions.len())
            .finish()
    }
}

/// 多次元配列の参照
///
/// 式の木には入れられますが、カーネル生成時に拒否されます。
pub struct MultiArrayOperand<'a, B: Backend> {
    pub lengths: Vec<usize>,
    pub vector: VectorOperand<'a, B>,
}

impl<B: Backend> Clone for MultiArrayOperand<'_, B> {
    fn clone(&self) -> Self {
        Self {
            lengths: self.lengths.clone(),
            vector: self.vector,
        }
    }
}

/// 式ノード
pub enum Expr<'a, B: Backend> {
    Vector(VectorOperand<'a, B>),
    MultiArray(MultiArrayOperand<'a, B>),
    /// スカラーリテラル（値はカーネル引数として渡される）
    Scalar(Number),
    /// 論理インデックス空間での要素位置に`offset`を足したもの
    ElementIndex { offset: u64 },
    Unary {
        op: UnaryOp,
        operand: Box<Expr<'a, B>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr<'a, B>>,
        rhs: Box<Expr<'a, B>>,
    },
    Function {
        func: Function,
        args: Vec<Expr<'a, B>>,
    },
}

impl<B: Backend> Clone for Expr<'_, B> {
    fn clone(&self) -> Self {
        match self {
            Expr::Vector(v) => Expr::Vector(*v),
            Expr::MultiArray(m) => Expr::MultiArray(m.clone()),
            Expr::Scalar(n) => Expr::Scalar(*n),
            Expr::ElementIndex { offset } => Expr::ElementIndex { offset: *offset },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: operand.clone(),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            Expr::Function { func, args } => Expr::Function {
                func: *func,
                args: args.clone(),
            },
        }
    }
}

impl<'a, B: Backend> Expr<'a, B> {
    pub fn scalar(value: impl Into<Number>) -> Self {
        Expr::Scalar(value.into())
    }

    pub fn unary(op: UnaryOp, operand: impl IntoExpr<'a, B>) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand.into_expr()),
        }
    }

    pub fn binary(op: BinaryOp, lhs: impl IntoExpr<'a, B>, rhs: impl IntoExpr<'a, B>) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs.into_expr()),
            rhs: Box::new(rhs.into_expr()),
        }
    }

    /// 組み込み関数の呼び出し（引数の数を検査）
    pub fn function(func: Function, args: Vec<Expr<'a, B>>) -> Result<Self> {
        if args.len() != func.arity() {
            return Err(VexError::UnsupportedOperand(format!(
                "{} takes {} arguments, got {}",
                func,
                func.arity(),
                args.len()
            )));
        }
        Ok(Expr::Function { func, args })
    }

    /// 式の結果型
    ///
    /// 二項演算は型昇格、組み込み関数は浮動小数点（整数なら`double`）になります。
    pub fn dtype(&self) -> DType {
        match self {
            Expr::Vector(v) => v.dtype,
            Expr::MultiArray(m) => m.vector.dtype,
            Expr::Scalar(n) => n.dtype(),
            Expr::ElementIndex { .. } => DType::U64,
            Expr::Unary { operand, .. } => operand.dtype(),
            Expr::Binary { lhs, rhs, .. } => lhs.dtype().promote(rhs.dtype()),
            Expr::Function { args, .. } => function_dtype(args.iter().map(Expr::dtype)),
        }
    }
}

/// 組み込み関数の評価型
pub(crate) fn function_dtype(args: impl Iterator<Item = DType>) -> DType {
    args.reduce(DType::promote)
        .filter(DType::is_float)
        .unwrap_or(DType::F64)
}

impl<B: Backend> fmt::Debug for Expr<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Vector(v) => write!(f, "vector<{}>[{}]", v.dtype, v.size),
            Expr::MultiArray(m) => write!(f, "multi_array<{}>{:?}", m.vector.dtype, m.lengths),
            Expr::Scalar(n) => write!(f, "{}", n),
            Expr::ElementIndex { offset: 0 } => write!(f, "element_index()"),
            Expr::ElementIndex { offset } => write!(f, "element_index({})", offset),
            Expr::Unary { op, operand } => write!(f, "{}({:?})", op, operand),
            Expr::Binary { op, lhs, rhs } => write!(f, "({:?} {} {:?})", lhs, op.symbol(), rhs),
            Expr::Function { func, args } => {
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// 式に変換できる型
///
/// 式そのもの、ベクトル・多次元配列の参照、スカラー値が実装します。
pub trait IntoExpr<'a, B: Backend> {
    fn into_expr(self) -> Expr<'a, B>;
}

impl<'a, B: Backend> IntoExpr<'a, B> for Expr<'a, B> {
    fn into_expr(self) -> Expr<'a, B> {
        self
    }
}

macro_rules! impl_into_expr_scalar {
    ($($ty:ty),*) => {
        $(
            impl<'a, B: Backend> IntoExpr<'a, B> for $ty {
                fn into_expr(self) -> Expr<'a, B> {
                    Expr::Scalar(Number::from(self))
                }
            }
        )*
    };
}

impl_into_expr_scalar!(i32, u32, i64, u64, f32, f64);

/// 要素の論理インデックス
pub fn element_index<'a, B: Backend>() -> Expr<'a, B> {
    Expr::ElementIndex { offset: 0 }
}

/// 論理インデックスに`offset`を足した値
pub fn element_index_from<'a, B: Backend>(offset: u64) -> Expr<'a, B> {
    Expr::ElementIndex { offset }
}

macro_rules! unary_functions {
    ($($name:ident => $func:ident),* $(,)?) => {
        $(
            pub fn $name<'a, B: Backend>(x: impl IntoExpr<'a, B>) -> Expr<'a, B> {
                Expr::Function {
                    func: Function::$func,
                    args: vec![x.into_expr()],
                }
            }
        )*
    };
}

macro_rules! binary_functions {
    ($($name:ident => $func:ident),* $(,)?) => {
        $(
            pub fn $name<'a, B: Backend>(
                x: impl IntoExpr<'a, B>,
                y: impl IntoExpr<'a, B>,
            ) -> Expr<'a, B> {
                Expr::Function {
                    func: Function::$func,
                    args: vec![x.into_expr(), y.into_expr()],
                }
            }
        )*
    };
}

unary_functions!(
    sin => Sin,
    cos => Cos,
    tan => Tan,
    exp => Exp,
    log => Log,
    sqrt => Sqrt,
    fabs => Fabs,
    floor => Floor,
    ceil => Ceil,
);

binary_functions!(
    pow => Pow,
    fmax => Fmax,
    fmin => Fmin,
);

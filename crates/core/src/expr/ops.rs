//! 演算子オーバーロード
//!
//! 式・ベクトル参照・多次元配列参照・スカラーの組み合わせで式を組み立てます。

use super::{Expr, IntoExpr};
use crate::ast::{BinaryOp, UnaryOp};
use crate::backend::Backend;
use crate::dtype::Scalar;
use crate::multi_array::MultiArray;
use crate::vector::DistributedVector;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:ident) => {
        impl<'a, B: Backend, R: IntoExpr<'a, B>> $trait<R> for Expr<'a, B> {
            type Output = Expr<'a, B>;

            fn $method(self, rhs: R) -> Expr<'a, B> {
                Expr::binary(BinaryOp::$op, self, rhs)
            }
        }

        impl<'a, T: Scalar, B: Backend, R: IntoExpr<'a, B>> $trait<R>
            for &'a DistributedVector<T, B>
        {
            type Output = Expr<'a, B>;

            fn $method(self, rhs: R) -> Expr<'a, B> {
                Expr::binary(BinaryOp::$op, self, rhs)
            }
        }

        impl<'a, T: Scalar, B: Backend, R: IntoExpr<'a, B>, const NDIM: usize> $trait<R>
            for &'a MultiArray<T, B, NDIM>
        {
            type Output = Expr<'a, B>;

            fn $method(self, rhs: R) -> Expr<'a, B> {
                Expr::binary(BinaryOp::$op, self, rhs)
            }
        }

        impl_binary_op!(@scalar $trait, $method, $op, i32, u32, i64, u64, f32, f64);
    };
    (@scalar $trait:ident, $method:ident, $op:ident, $($ty:ty),*) => {
        $(
            impl<'a, B: Backend> $trait<Expr<'a, B>> for $ty {
                type Output = Expr<'a, B>;

                fn $method(self, rhs: Expr<'a, B>) -> Expr<'a, B> {
                    Expr::binary(BinaryOp::$op, self, rhs)
                }
            }

            impl<'a, T: Scalar, B: Backend> $trait<&'a DistributedVector<T, B>> for $ty {
                type Output = Expr<'a, B>;

                fn $method(self, rhs: &'a DistributedVector<T, B>) -> Expr<'a, B> {
                    Expr::binary(BinaryOp::$op, self, rhs)
                }
            }

            impl<'a, T: Scalar, B: Backend, const NDIM: usize> $trait<&'a MultiArray<T, B, NDIM>>
                for $ty
            {
                type Output = Expr<'a, B>;

                fn $method(self, rhs: &'a MultiArray<T, B, NDIM>) -> Expr<'a, B> {
                    Expr::binary(BinaryOp::$op, self, rhs)
                }
            }
        )*
    };
}

impl_binary_op!(Add, add, Add);
impl_binary_op!(Sub, sub, Sub);
impl_binary_op!(Mul, mul, Mul);
impl_binary_op!(Div, div, Div);
impl_binary_op!(Rem, rem, Rem);

impl<'a, B: Backend> Neg for Expr<'a, B> {
    type Output = Expr<'a, B>;

    fn neg(self) -> Expr<'a, B> {
        Expr::unary(UnaryOp::Neg, self)
    }
}

impl<'a, T: Scalar, B: Backend> Neg for &'a DistributedVector<T, B> {
    type Output = Expr<'a, B>;

    fn neg(self) -> Expr<'a, B> {
        Expr::unary(UnaryOp::Neg, self)
    }
}

impl<'a, T: Scalar, B: Backend, const NDIM: usize> Neg for &'a MultiArray<T, B, NDIM> {
    type Output = Expr<'a, B>;

    fn neg(self) -> Expr<'a, B> {
        Expr::unary(UnaryOp::Neg, self)
    }
}

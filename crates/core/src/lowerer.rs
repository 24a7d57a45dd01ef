//! 式木からカーネルへの下位化
//!
//! 式木を型付きのカーネルAST（`KernelProgram`）に変換し、
//! 各パラメータに束縛するオペランドを列挙します。
//!
//! - パラメータ0は常に代入先のバッファ
//! - ベクトルは出現ごとに別のパラメータになる（`x*x`と`x*y`は同じカーネル）
//! - スカラーリテラルは値ではなく型だけがシグネチャに入る

use crate::ast::{AstNode, BinaryOp, KernelParam, KernelProgram};
use crate::backend::Backend;
use crate::cache::KernelSignature;
use crate::dtype::{DType, Number};
use crate::error::{Result, VexError};
use crate::expr::{Expr, VectorOperand, function_dtype};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// パラメータ1以降に束縛するオペランド
pub enum Binding<'a, B: Backend> {
    Vector(VectorOperand<'a, B>),
    Scalar(Number),
}

/// 下位化の結果
pub struct LoweredKernel<'a, B: Backend> {
    pub program: KernelProgram,
    /// `program.params[1..]`に対応する
    pub bindings: Vec<Binding<'a, B>>,
}

/// 出力型`output`への代入として式を下位化
pub fn lower<'a, B: Backend>(expr: &Expr<'a, B>, output: DType) -> Result<LoweredKernel<'a, B>> {
    let mut lowerer = Lowerer {
        params: vec![KernelParam::Buffer {
            dtype: output,
            output: true,
        }],
        bindings: Vec::new(),
    };
    let body = lowerer.lower_node(expr)?.cast_to(output);

    let signature = KernelSignature::new(format!("{} <- {}", output, body));
    let mut hasher = FxHasher::default();
    signature.hash(&mut hasher);
    let name = format!("vex_{:016x}", hasher.finish());

    Ok(LoweredKernel {
        program: KernelProgram {
            name,
            params: lowerer.params,
            body,
            signature,
        },
        bindings: lowerer.bindings,
    })
}

struct Lowerer<'a, B: Backend> {
    params: Vec<KernelParam>,
    bindings: Vec<Binding<'a, B>>,
}

impl<'a, B: Backend> Lowerer<'a, B> {
    fn bind(&mut self, param: KernelParam, binding: Binding<'a, B>) -> usize {
        self.params.push(param);
        self.bindings.push(binding);
        self.params.len() - 1
    }

    fn scalar(&mut self, value: Number) -> AstNode {
        let dtype = value.dtype();
        let param = self.bind(KernelParam::Scalar { dtype }, Binding::Scalar(value));
        AstNode::Scalar { param, dtype }
    }

    fn lower_node(&mut self, expr: &Expr<'a, B>) -> Result<AstNode> {
        match expr {
            Expr::Vector(v) => {
                let dtype = v.dtype;
                let param = self.bind(
                    KernelParam::Buffer {
                        dtype,
                        output: false,
                    },
                    Binding::Vector(*v),
                );
                Ok(AstNode::Load { param, dtype })
            }
            Expr::MultiArray(m) => Err(VexError::UnsupportedOperand(format!(
                "{}-dimensional array {:?} cannot appear in an elementwise expression",
                m.lengths.len(),
                m.lengths
            ))),
            Expr::Scalar(n) => Ok(self.scalar(*n)),
            Expr::ElementIndex { offset: 0 } => Ok(AstNode::GlobalIndex),
            Expr::ElementIndex { offset } => {
                let rhs = self.scalar(Number::U64(*offset));
                Ok(AstNode::Binary {
                    op: BinaryOp::Add,
                    dtype: DType::U64,
                    lhs: Box::new(AstNode::GlobalIndex),
                    rhs: Box::new(rhs),
                })
            }
            Expr::Unary { op, operand } => {
                let operand = self.lower_node(operand)?;
                Ok(AstNode::Unary {
                    op: *op,
                    dtype: operand.dtype(),
                    operand: Box::new(operand),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.lower_node(lhs)?;
                let rhs = self.lower_node(rhs)?;
                let dtype = lhs.dtype().promote(rhs.dtype());
                Ok(AstNode::Binary {
                    op: *op,
                    dtype,
                    lhs: Box::new(lhs.cast_to(dtype)),
                    rhs: Box::new(rhs.cast_to(dtype)),
                })
            }
            Expr::Function { func, args } => {
                if args.len() != func.arity() {
                    return Err(VexError::UnsupportedOperand(format!(
                        "{} takes {} arguments, got {}",
                        func,
                        func.arity(),
                        args.len()
                    )));
                }
                let args = args
                    .iter()
                    .map(|a| self.lower_node(a))
                    .collect::<Result<Vec<_>>>()?;
                let dtype = function_dtype(args.iter().map(AstNode::dtype));
                Ok(AstNode::Call {
                    func: *func,
                    dtype,
                    args: args.into_iter().map(|a| a.cast_to(dtype)).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::host::{HostBackend, HostDevice};
    use crate::expr::{element_index, pow, sin};
    use crate::multi_array::MultiArray;
    use crate::vector::DistributedVector;

    type Vector<T> = DistributedVector<T, HostBackend>;

    #[test]
    fn test_vector_identity_not_in_signature() {
        let device = HostDevice::new();
        let queues = vec![device.queue()];
        let x = Vector::<f64>::with_size(&queues, 8).unwrap();
        let y = Vector::<f64>::with_size(&queues, 8).unwrap();

        let xx = lower(&(&x * &x), DType::F64).unwrap();
        let xy = lower(&(&x * &y), DType::F64).unwrap();

        assert_eq!(xx.program.signature, xy.program.signature);
        assert_eq!(xx.program.name, xy.program.name);
        assert_eq!(xx.bindings.len(), 2);
    }

    #[test]
    fn test_literal_value_not_in_signature() {
        let a = lower::<HostBackend>(&Expr::scalar(42), DType::F64).unwrap();
        let b = lower::<HostBackend>(&Expr::scalar(7), DType::F64).unwrap();
        let c = lower::<HostBackend>(&Expr::scalar(7.0), DType::F64).unwrap();

        assert_eq!(a.program.signature, b.program.signature);
        assert_ne!(a.program.signature, c.program.signature);
        assert_eq!(a.program.signature.as_str(), "double <- cast<double>(scalar<int>($1))");
    }

    #[test]
    fn test_output_type_in_signature() {
        let e: Expr<'_, HostBackend> = element_index() * 2;
        let f = lower(&e, DType::F32).unwrap();
        let d = lower(&e, DType::F64).unwrap();
        assert_ne!(f.program.signature, d.program.signature);
    }

    #[test]
    fn test_function_promotes_integers() {
        let e: Expr<'_, HostBackend> = pow(sin(element_index()), 2);
        let lowered = lower(&e, DType::F64).unwrap();
        assert_eq!(
            lowered.program.signature.as_str(),
            "double <- pow(sin(cast<double>(index)), cast<double>(scalar<int>($1)))"
        );
    }

    #[test]
    fn test_multi_array_rejected() {
        let device = HostDevice::new();
        let queues = vec![device.queue()];
        let a = MultiArray::<f32, HostBackend, 2>::new(&queues, &[4, 4]).unwrap();

        let err = lower(&(&a + 1.0f32), DType::F32).err().unwrap();
        assert!(matches!(err, VexError::UnsupportedOperand(_)));
    }
}

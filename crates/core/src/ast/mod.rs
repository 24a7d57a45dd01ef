//! カーネルAST
//!
//! 式木を下位化した結果です。各ノードは型を持ち、オペランドはパラメータ番号で参照します。
//! レンダラーはこれをOpenCL Cに、ホストバックエンドはこれを直接評価します。

pub mod ops;

pub use ops::{BinaryOp, Function, UnaryOp};

use crate::cache::KernelSignature;
use crate::dtype::DType;
use std::fmt;

/// カーネルASTのノード
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// バッファパラメータのパーティション内インデックスの要素
    Load { param: usize, dtype: DType },
    /// スカラーパラメータ
    Scalar { param: usize, dtype: DType },
    /// 論理インデックス空間での要素位置（パーティションのオフセット + ローカル位置）
    GlobalIndex,
    Cast {
        dtype: DType,
        operand: Box<AstNode>,
    },
    Unary {
        op: UnaryOp,
        dtype: DType,
        operand: Box<AstNode>,
    },
    Binary {
        op: BinaryOp,
        dtype: DType,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },
    Call {
        func: Function,
        dtype: DType,
        args: Vec<AstNode>,
    },
}

impl AstNode {
    /// ノードの型
    pub fn dtype(&self) -> DType {
        match self {
            AstNode::Load { dtype, .. }
            | AstNode::Scalar { dtype, .. }
            | AstNode::Cast { dtype, .. }
            | AstNode::Unary { dtype, .. }
            | AstNode::Binary { dtype, .. }
            | AstNode::Call { dtype, .. } => *dtype,
            AstNode::GlobalIndex => DType::U64,
        }
    }

    /// 必要なら型変換ノードで包む
    pub fn cast_to(self, dtype: DType) -> AstNode {
        if self.dtype() == dtype {
            self
        } else {
            AstNode::Cast {
                dtype,
                operand: Box::new(self),
            }
        }
    }

    /// 部分木に含まれる型を列挙する
    pub fn visit_dtypes(&self, f: &mut impl FnMut(DType)) {
        f(self.dtype());
        match self {
            AstNode::Cast { operand, .. } | AstNode::Unary { operand, .. } => {
                operand.visit_dtypes(f)
            }
            AstNode::Binary { lhs, rhs, .. } => {
                lhs.visit_dtypes(f);
                rhs.visit_dtypes(f);
            }
            AstNode::Call { args, .. } => {
                for arg in args {
                    arg.visit_dtypes(f);
                }
            }
            AstNode::Load { .. } | AstNode::Scalar { .. } | AstNode::GlobalIndex => {}
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Load { param, dtype } => write!(f, "load<{}>(${})", dtype, param),
            AstNode::Scalar { param, dtype } => write!(f, "scalar<{}>(${})", dtype, param),
            AstNode::GlobalIndex => write!(f, "index"),
            AstNode::Cast { dtype, operand } => write!(f, "cast<{}>({})", dtype, operand),
            AstNode::Unary { op, operand, .. } => write!(f, "{}({})", op, operand),
            AstNode::Binary { op, lhs, rhs, .. } => write!(f, "{}({}, {})", op, lhs, rhs),
            AstNode::Call { func, args, .. } => {
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// カーネルのパラメータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelParam {
    /// デバイスバッファ（`output`なら書き込み先）
    Buffer { dtype: DType, output: bool },
    /// 値渡しのスカラー
    Scalar { dtype: DType },
}

impl KernelParam {
    pub fn dtype(&self) -> DType {
        match self {
            KernelParam::Buffer { dtype, .. } | KernelParam::Scalar { dtype } => *dtype,
        }
    }
}

/// 下位化されたカーネル
///
/// パラメータ0は常に出力バッファです。
#[derive(Debug, Clone, PartialEq)]
pub struct KernelProgram {
    pub name: String,
    pub params: Vec<KernelParam>,
    pub body: AstNode,
    pub signature: KernelSignature,
}

impl KernelProgram {
    /// 出力の型
    pub fn output_dtype(&self) -> DType {
        self.params[0].dtype()
    }

    /// 倍精度を使うかどうか
    pub fn uses_f64(&self) -> bool {
        let mut found = self.params.iter().any(|p| p.dtype() == DType::F64);
        self.body.visit_dtypes(&mut |dtype| found |= dtype == DType::F64);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_to_skips_same_type() {
        let node = AstNode::Load {
            param: 1,
            dtype: DType::F32,
        };
        assert_eq!(node.clone().cast_to(DType::F32), node);
        assert_eq!(node.cast_to(DType::F64).dtype(), DType::F64);
    }

    #[test]
    fn test_display() {
        let node = AstNode::Binary {
            op: BinaryOp::Mul,
            dtype: DType::F64,
            lhs: Box::new(AstNode::Scalar {
                param: 2,
                dtype: DType::F64,
            }),
            rhs: Box::new(AstNode::GlobalIndex.cast_to(DType::F64)),
        };
        assert_eq!(
            node.to_string(),
            "mul(scalar<double>($2), cast<double>(index))"
        );
    }
}

use crate::ast::{AstNode, BinaryOp, Function, KernelParam, KernelProgram, UnaryOp};
use crate::dtype::DType;
use crate::renderer::Renderer;

// C言語に近い構文の言語のためのレンダラー
// OpenCL、CUDAなどは式の文法がほぼ共通なので、式のレンダリングはここで共通化する。

/// パラメータ名
pub fn param_name(index: usize) -> String {
    format!("prm_{}", index)
}

pub trait CLikeRenderer: Renderer {
    // ========== バックエンド固有のメソッド（実装側で提供） ==========

    /// 型をバックエンド固有の文字列に変換
    fn render_dtype_backend(&self, dtype: DType) -> String {
        dtype.c_name().to_string()
    }

    /// プログラムのヘッダー（拡張の有効化など）をレンダリング
    fn render_header(&self, program: &KernelProgram) -> String;

    /// カーネル関数のパラメータ宣言をレンダリング
    fn render_param(&self, index: usize, param: &KernelParam) -> String;

    /// 論理インデックスの式（パーティションのオフセット込み）
    fn render_global_index(&self) -> String;

    /// 数学関数をレンダリング
    fn render_math_func(&self, func: Function, args: &[String]) -> String {
        format!("{}({})", func.name(), args.join(", "))
    }

    // ========== 共通実装 ==========

    /// 式をレンダリング
    fn render_expr(&self, node: &AstNode) -> String {
        match node {
            AstNode::Load { param, .. } => format!("{}[idx]", param_name(*param)),
            AstNode::Scalar { param, .. } => param_name(*param),
            AstNode::GlobalIndex => self.render_global_index(),
            AstNode::Cast { dtype, operand } => format!(
                "(({}){})",
                self.render_dtype_backend(*dtype),
                self.render_expr(operand)
            ),
            AstNode::Unary { op, operand, .. } => match op {
                UnaryOp::Neg => format!("(-{})", self.render_expr(operand)),
            },
            AstNode::Binary { op, dtype, lhs, rhs } => {
                let l = self.render_expr(lhs);
                let r = self.render_expr(rhs);
                // 浮動小数点の剰余は演算子ではなく関数
                if *op == BinaryOp::Rem && dtype.is_float() {
                    format!("fmod({}, {})", l, r)
                } else {
                    format!("({} {} {})", l, op.symbol(), r)
                }
            }
            AstNode::Call { func, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                self.render_math_func(*func, &args)
            }
        }
    }

    /// パラメータリストをレンダリング
    fn render_params(&self, program: &KernelProgram) -> String {
        program
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| self.render_param(i, p))
            .collect::<Vec<_>>()
            .join(",\n    ")
    }
}

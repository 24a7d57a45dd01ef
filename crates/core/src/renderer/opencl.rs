use crate::ast::{KernelParam, KernelProgram};
use crate::renderer::Renderer;
use crate::renderer::c_like::{CLikeRenderer, param_name};
use std::fmt;

/// OpenCL Cコードを表す型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCLCode {
    entry_point: String,
    code: String,
}

impl OpenCLCode {
    pub fn new(entry_point: impl Into<String>, code: String) -> Self {
        Self {
            entry_point: entry_point.into(),
            code,
        }
    }

    /// カーネル関数名
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn into_string(self) -> String {
        self.code
    }
}

impl fmt::Display for OpenCLCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// OpenCLレンダラー
///
/// カーネルは`n`個の要素をグリッドストライドループで処理します。
/// `offset`はパーティションの論理インデックス空間での開始位置です。
#[derive(Debug, Clone, Default)]
pub struct OpenCLRenderer;

impl Renderer for OpenCLRenderer {
    type CodeRepr = OpenCLCode;

    fn new() -> Self {
        OpenCLRenderer
    }

    fn render(&mut self, program: &KernelProgram) -> OpenCLCode {
        let mut code = String::new();

        code.push_str(&self.render_header(program));

        code.push_str(&format!("__kernel void {}(\n", program.name));
        code.push_str("    ulong n,\n");
        code.push_str("    ulong offset,\n");
        code.push_str("    ");
        code.push_str(&self.render_params(program));
        code.push_str("\n)\n{\n");
        code.push_str(
            "    for (ulong idx = get_global_id(0); idx < n; idx += get_global_size(0)) {\n",
        );
        code.push_str(&format!(
            "        {}[idx] = {};\n",
            param_name(0),
            self.render_expr(&program.body)
        ));
        code.push_str("    }\n}\n");

        OpenCLCode::new(program.name.clone(), code)
    }
}

impl CLikeRenderer for OpenCLRenderer {
    fn render_header(&self, program: &KernelProgram) -> String {
        if program.uses_f64() {
            "#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n\n".to_string()
        } else {
            String::new()
        }
    }

    fn render_param(&self, index: usize, param: &KernelParam) -> String {
        let ty = self.render_dtype_backend(param.dtype());
        match param {
            KernelParam::Buffer { output: true, .. } => {
                format!("__global {}* {}", ty, param_name(index))
            }
            KernelParam::Buffer { output: false, .. } => {
                format!("__global const {}* {}", ty, param_name(index))
            }
            KernelParam::Scalar { .. } => format!("{} {}", ty, param_name(index)),
        }
    }

    fn render_global_index(&self) -> String {
        "(offset + idx)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, BinaryOp, Function};
    use crate::cache::KernelSignature;
    use crate::dtype::DType;

    fn program(body: AstNode, params: Vec<KernelParam>) -> KernelProgram {
        KernelProgram {
            name: "vex_test".to_string(),
            params,
            body,
            signature: KernelSignature::new("test"),
        }
    }

    #[test]
    fn test_render_add_kernel() {
        let body = AstNode::Binary {
            op: BinaryOp::Add,
            dtype: DType::F32,
            lhs: Box::new(AstNode::Load {
                param: 1,
                dtype: DType::F32,
            }),
            rhs: Box::new(AstNode::Scalar {
                param: 2,
                dtype: DType::F32,
            }),
        };
        let params = vec![
            KernelParam::Buffer {
                dtype: DType::F32,
                output: true,
            },
            KernelParam::Buffer {
                dtype: DType::F32,
                output: false,
            },
            KernelParam::Scalar { dtype: DType::F32 },
        ];
        let code = OpenCLRenderer::new().render(&program(body, params));
        let src = code.as_str();

        assert_eq!(code.entry_point(), "vex_test");
        assert!(!src.contains("cl_khr_fp64"));
        assert!(src.contains("__kernel void vex_test("));
        assert!(src.contains("__global float* prm_0"));
        assert!(src.contains("__global const float* prm_1"));
        assert!(src.contains("float prm_2"));
        assert!(src.contains("prm_0[idx] = (prm_1[idx] + prm_2);"));
    }

    #[test]
    fn test_render_double_enables_fp64() {
        let body = AstNode::Call {
            func: Function::Sin,
            dtype: DType::F64,
            args: vec![AstNode::GlobalIndex.cast_to(DType::F64)],
        };
        let params = vec![KernelParam::Buffer {
            dtype: DType::F64,
            output: true,
        }];
        let src = OpenCLRenderer::new()
            .render(&program(body, params))
            .into_string();

        assert!(src.starts_with("#pragma OPENCL EXTENSION cl_khr_fp64 : enable"));
        assert!(src.contains("prm_0[idx] = sin(((double)(offset + idx)));"));
    }

    #[test]
    fn test_render_float_remainder_uses_fmod() {
        let body = AstNode::Binary {
            op: BinaryOp::Rem,
            dtype: DType::F32,
            lhs: Box::new(AstNode::Load {
                param: 1,
                dtype: DType::F32,
            }),
            rhs: Box::new(AstNode::Load {
                param: 2,
                dtype: DType::F32,
            }),
        };
        let params = vec![
            KernelParam::Buffer {
                dtype: DType::F32,
                output: true,
            },
            KernelParam::Buffer {
                dtype: DType::F32,
                output: false,
            },
            KernelParam::Buffer {
                dtype: DType::F32,
                output: false,
            },
        ];
        let src = OpenCLRenderer::new()
            .render(&program(body, params))
            .into_string();
        assert!(src.contains("fmod(prm_1[idx], prm_2[idx])"));
    }
}

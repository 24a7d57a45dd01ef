//! 下位表現のインタプリタ
//!
//! 各要素についてASTを評価します。演算はC言語と同じ型規則に従い、
//! 整数演算は折り返し、ゼロ除算は0を返します。

use super::HostError;
use super::buffer::HostBuffer;
use super::device::HostQueue;
use crate::ast::{AstNode, BinaryOp, KernelParam, KernelProgram, UnaryOp};
use crate::backend::{Buffer, Compiler, Kernel, KernelArg, LaunchRange};
use crate::dtype::{DType, Number};

/// ホストバックエンドのカーネルコンパイラ
///
/// プログラムの整合性を検査し、評価用のカーネルを作るだけです。
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCompiler;

impl Compiler for HostCompiler {
    type Queue = HostQueue;
    type Kernel = HostKernel;
    type Error = HostError;

    fn new() -> Self {
        HostCompiler
    }

    fn compile(&self, _queue: &HostQueue, program: &KernelProgram) -> Result<HostKernel, HostError> {
        match program.params.first() {
            Some(KernelParam::Buffer { output: true, .. }) => {}
            _ => {
                return Err(HostError::InvalidProgram(
                    "parameter 0 must be the output buffer".to_string(),
                ));
            }
        }
        validate(&program.body, &program.params)?;
        log::debug!("host compile {}: {}", program.name, program.body);

        Ok(HostKernel {
            program: program.clone(),
        })
    }
}

fn validate(node: &AstNode, params: &[KernelParam]) -> Result<(), HostError> {
    match node {
        AstNode::Load { param, dtype } => match params.get(*param) {
            Some(KernelParam::Buffer { dtype: d, .. }) if d == dtype => Ok(()),
            _ => Err(HostError::InvalidProgram(format!(
                "load of ${} does not match a {} buffer parameter",
                param, dtype
            ))),
        },
        AstNode::Scalar { param, dtype } => match params.get(*param) {
            Some(KernelParam::Scalar { dtype: d }) if d == dtype => Ok(()),
            _ => Err(HostError::InvalidProgram(format!(
                "scalar ${} does not match a {} scalar parameter",
                param, dtype
            ))),
        },
        AstNode::GlobalIndex => Ok(()),
        AstNode::Cast { operand, .. } | AstNode::Unary { operand, .. } => {
            validate(operand, params)
        }
        AstNode::Binary { lhs, rhs, .. } => {
            validate(lhs, params)?;
            validate(rhs, params)
        }
        AstNode::Call { func, args, .. } => {
            if args.len() != func.arity() {
                return Err(HostError::InvalidProgram(format!(
                    "{} takes {} arguments, got {}",
                    func,
                    func.arity(),
                    args.len()
                )));
            }
            args.iter().try_for_each(|a| validate(a, params))
        }
    }
}

/// ホストバックエンドのカーネル
#[derive(Debug, Clone)]
pub struct HostKernel {
    program: KernelProgram,
}

/// 評価中に参照する引数
enum Bound {
    /// 入力バッファの該当範囲のスナップショット
    Data(Vec<u8>),
    Scalar(Number),
    Output,
}

impl Kernel for HostKernel {
    type Queue = HostQueue;
    type Buffer = HostBuffer;
    type Error = HostError;

    fn name(&self) -> &str {
        &self.program.name
    }

    fn launch(
        &self,
        _queue: &HostQueue,
        args: &[KernelArg<'_, HostBuffer>],
        range: LaunchRange,
    ) -> Result<(), HostError> {
        let params = &self.program.params;
        if args.len() != params.len() {
            return Err(HostError::InvalidArguments(format!(
                "{} expects {} arguments, got {}",
                self.program.name,
                params.len(),
                args.len()
            )));
        }

        // 出力が入力と同じバッファでも良いように、入力は先に読み出しておく
        let mut bound = Vec::with_capacity(args.len());
        let mut output = None;
        for (i, (param, arg)) in params.iter().zip(args).enumerate() {
            match (param, arg) {
                (KernelParam::Buffer { dtype, output: out }, KernelArg::Buffer(buf)) => {
                    if buf.dtype() != *dtype || buf.len() < range.count {
                        return Err(HostError::InvalidArguments(format!(
                            "argument {} is {} x {}, expected at least {} x {}",
                            i,
                            buf.len(),
                            buf.dtype(),
                            range.count,
                            dtype
                        )));
                    }
                    if *out {
                        output = Some(*buf);
                        bound.push(Bound::Output);
                    } else {
                        bound.push(Bound::Data(buf.read_bytes(0, range.count)?));
                    }
                }
                (KernelParam::Scalar { dtype }, KernelArg::Scalar(n)) => {
                    bound.push(Bound::Scalar(n.cast(*dtype)));
                }
                _ => {
                    return Err(HostError::InvalidArguments(format!(
                        "argument {} does not match parameter kind",
                        i
                    )));
                }
            }
        }
        let output = output.ok_or_else(|| {
            HostError::InvalidArguments("no output buffer bound".to_string())
        })?;

        log::trace!(
            "host launch {} offset={} count={}",
            self.program.name,
            range.offset,
            range.count
        );

        let out_dtype = self.program.output_dtype();
        let mut result = Vec::with_capacity(range.count * out_dtype.size_in_bytes());
        for idx in 0..range.count {
            let value = eval(&self.program.body, &bound, idx, range.offset).cast(out_dtype);
            result.extend_from_slice(&value.to_ne_bytes());
        }
        output.write_bytes(0, &result)
    }
}

fn load(dtype: DType, bytes: &[u8], idx: usize) -> Number {
    macro_rules! read {
        ($ty:ty, $variant:ident) => {{
            const N: usize = std::mem::size_of::<$ty>();
            let mut raw = [0u8; N];
            raw.copy_from_slice(&bytes[idx * N..(idx + 1) * N]);
            Number::$variant(<$ty>::from_ne_bytes(raw))
        }};
    }
    match dtype {
        DType::I32 => read!(i32, I32),
        DType::U32 => read!(u32, U32),
        DType::I64 => read!(i64, I64),
        DType::U64 => read!(u64, U64),
        DType::F32 => read!(f32, F32),
        DType::F64 => read!(f64, F64),
    }
}

fn eval(node: &AstNode, bound: &[Bound], idx: usize, offset: usize) -> Number {
    match node {
        AstNode::Load { param, dtype } => match &bound[*param] {
            Bound::Data(bytes) => load(*dtype, bytes, idx),
            // 検証済みのプログラムでは到達しない
            _ => Number::from(0i32).cast(*dtype),
        },
        AstNode::Scalar { param, dtype } => match &bound[*param] {
            Bound::Scalar(n) => n.cast(*dtype),
            _ => Number::from(0i32).cast(*dtype),
        },
        AstNode::GlobalIndex => Number::U64((offset + idx) as u64),
        AstNode::Cast { dtype, operand } => eval(operand, bound, idx, offset).cast(*dtype),
        AstNode::Unary { op, dtype, operand } => {
            let v = eval(operand, bound, idx, offset).cast(*dtype);
            match op {
                UnaryOp::Neg => negate(v),
            }
        }
        AstNode::Binary { op, dtype, lhs, rhs } => {
            let l = eval(lhs, bound, idx, offset).cast(*dtype);
            let r = eval(rhs, bound, idx, offset).cast(*dtype);
            binary(*op, *dtype, l, r)
        }
        AstNode::Call { func, dtype, args } => {
            let args: Vec<f64> = args
                .iter()
                .map(|a| eval(a, bound, idx, offset).as_f64())
                .collect();
            // 引数の数はコンパイル時に検査済み
            Number::F64(func.eval(&args).unwrap_or(f64::NAN)).cast(*dtype)
        }
    }
}

fn negate(v: Number) -> Number {
    match v {
        Number::I32(x) => Number::I32(x.wrapping_neg()),
        Number::U32(x) => Number::U32(x.wrapping_neg()),
        Number::I64(x) => Number::I64(x.wrapping_neg()),
        Number::U64(x) => Number::U64(x.wrapping_neg()),
        Number::F32(x) => Number::F32(-x),
        Number::F64(x) => Number::F64(-x),
    }
}

fn binary(op: BinaryOp, dtype: DType, l: Number, r: Number) -> Number {
    match (l, r) {
        (Number::F32(a), Number::F32(b)) => Number::F32(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
        }),
        (Number::F64(a), Number::F64(b)) => Number::F64(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
        }),
        // 符号付き整数はi64で計算してから切り詰める（2の補数の折り返しと一致する）
        _ if dtype.is_signed() => {
            let (a, b) = (l.as_i64(), r.as_i64());
            let v = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div if b == 0 => 0,
                BinaryOp::Div => a.wrapping_div(b),
                BinaryOp::Rem if b == 0 => 0,
                BinaryOp::Rem => a.wrapping_rem(b),
            };
            Number::I64(v).cast(dtype)
        }
        _ => {
            let (a, b) = (l.as_u64(), r.as_u64());
            let v = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b).unwrap_or(0),
                BinaryOp::Rem => a.checked_rem(b).unwrap_or(0),
            };
            Number::U64(v).cast(dtype)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Function;
    use crate::backend::host::HostDevice;
    use crate::cache::KernelSignature;

    fn program(out: DType, params: Vec<KernelParam>, body: AstNode) -> KernelProgram {
        let mut all = vec![KernelParam::Buffer {
            dtype: out,
            output: true,
        }];
        all.extend(params);
        KernelProgram {
            name: "vex_test".to_string(),
            params: all,
            body,
            signature: KernelSignature::new("test"),
        }
    }

    #[test]
    fn test_integer_semantics() {
        assert_eq!(
            binary(BinaryOp::Add, DType::I32, Number::I32(i32::MAX), Number::I32(1)),
            Number::I32(i32::MIN)
        );
        assert_eq!(
            binary(BinaryOp::Div, DType::U32, Number::U32(7), Number::U32(0)),
            Number::U32(0)
        );
        assert_eq!(
            binary(BinaryOp::Rem, DType::I64, Number::I64(-7), Number::I64(3)),
            Number::I64(-1)
        );
        assert_eq!(negate(Number::U32(1)), Number::U32(u32::MAX));
    }

    #[test]
    fn test_compile_rejects_bad_program() {
        let device = HostDevice::new();
        let queue = device.queue();

        let bad_load = program(
            DType::F32,
            vec![],
            AstNode::Load {
                param: 1,
                dtype: DType::F32,
            },
        );
        assert!(HostCompiler.compile(&queue, &bad_load).is_err());

        let bad_call = program(
            DType::F64,
            vec![],
            AstNode::Call {
                func: Function::Pow,
                dtype: DType::F64,
                args: vec![AstNode::GlobalIndex.cast_to(DType::F64)],
            },
        );
        assert!(HostCompiler.compile(&queue, &bad_call).is_err());
    }

    #[test]
    fn test_launch_in_place() {
        let device = HostDevice::new();
        let queue = device.queue();
        let buf = HostBuffer::allocate(&queue, DType::I32, 4).unwrap();
        buf.write_slice(0, &[1i32, 2, 3, 4]).unwrap();

        // y = y + index
        let prog = program(
            DType::I32,
            vec![KernelParam::Buffer {
                dtype: DType::I32,
                output: false,
            }],
            AstNode::Binary {
                op: BinaryOp::Add,
                dtype: DType::I32,
                lhs: Box::new(AstNode::Load {
                    param: 1,
                    dtype: DType::I32,
                }),
                rhs: Box::new(AstNode::GlobalIndex.cast_to(DType::I32)),
            },
        );
        let kernel = HostCompiler.compile(&queue, &prog).unwrap();
        kernel
            .launch(
                &queue,
                &[KernelArg::Buffer(&buf), KernelArg::Buffer(&buf)],
                LaunchRange::new(10, 4),
            )
            .unwrap();

        assert_eq!(buf.read_vec::<i32>(0, 4).unwrap(), vec![11, 13, 15, 17]);
    }

    #[test]
    fn test_launch_argument_mismatch() {
        let device = HostDevice::new();
        let queue = device.queue();
        let buf = HostBuffer::allocate(&queue, DType::F32, 2).unwrap();
        let prog = program(
            DType::F32,
            vec![KernelParam::Scalar { dtype: DType::F32 }],
            AstNode::Scalar {
                param: 1,
                dtype: DType::F32,
            },
        );
        let kernel = HostCompiler.compile(&queue, &prog).unwrap();

        let err = kernel
            .launch(&queue, &[KernelArg::Buffer(&buf)], LaunchRange::new(0, 2))
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments(_)));

        kernel
            .launch(
                &queue,
                &[KernelArg::Buffer(&buf), KernelArg::Scalar(Number::F64(2.5))],
                LaunchRange::new(0, 2),
            )
            .unwrap();
        assert_eq!(buf.read_vec::<f32>(0, 2).unwrap(), vec![2.5, 2.5]);
    }
}

//! 要素ごとの演算の種類

use std::fmt;

/// 単項演算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
}

/// 二項演算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// C言語の演算子記号
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

/// 要素ごとの組み込み関数
///
/// すべて浮動小数点で評価されます。整数のオペランドは`double`に変換されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Fabs,
    Floor,
    Ceil,
    Pow,
    Fmax,
    Fmin,
}

impl Function {
    /// デバイス言語での関数名
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sqrt => "sqrt",
            Function::Fabs => "fabs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Pow => "pow",
            Function::Fmax => "fmax",
            Function::Fmin => "fmin",
        }
    }

    /// 引数の数
    pub fn arity(&self) -> usize {
        match self {
            Function::Pow | Function::Fmax | Function::Fmin => 2,
            _ => 1,
        }
    }

    /// f64で評価
    ///
    /// 引数の数が`arity()`と合わなければ`None`を返します。
    pub fn eval(&self, args: &[f64]) -> Option<f64> {
        if args.len() != self.arity() {
            return None;
        }
        let x = args[0];
        Some(match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Exp => x.exp(),
            Function::Log => x.ln(),
            Function::Sqrt => x.sqrt(),
            Function::Fabs => x.abs(),
            Function::Floor => x.floor(),
            Function::Ceil => x.ceil(),
            Function::Pow => x.powf(args[1]),
            Function::Fmax => x.max(args[1]),
            Function::Fmin => x.min(args[1]),
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "neg"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "add"),
            BinaryOp::Sub => write!(f, "sub"),
            BinaryOp::Mul => write!(f, "mul"),
            BinaryOp::Div => write!(f, "div"),
            BinaryOp::Rem => write!(f, "rem"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_arity() {
        assert_eq!(Function::Sin.arity(), 1);
        assert_eq!(Function::Pow.arity(), 2);
        assert_eq!(Function::Fmin.arity(), 2);
    }

    #[test]
    fn test_function_eval() {
        assert_eq!(Function::Pow.eval(&[2.0, 3.0]), Some(8.0));
        assert_eq!(Function::Fabs.eval(&[-1.5]), Some(1.5));
        assert_eq!(Function::Fmax.eval(&[1.0, 4.0]), Some(4.0));
    }

    #[test]
    fn test_function_eval_wrong_arity() {
        assert_eq!(Function::Pow.eval(&[2.0]), None);
        assert_eq!(Function::Sin.eval(&[]), None);
        assert_eq!(Function::Sqrt.eval(&[4.0, 1.0]), None);
    }
}

//! カーネルソースのレンダリング
//!
//! 下位化された`KernelProgram`をデバイス言語のソースコードに変換します。

pub mod c_like;
pub mod opencl;

use crate::ast::KernelProgram;

pub use c_like::CLikeRenderer;
pub use opencl::{OpenCLCode, OpenCLRenderer};

pub trait Renderer {
    type CodeRepr;
    fn new() -> Self;
    fn render(&mut self, program: &KernelProgram) -> Self::CodeRepr;
}

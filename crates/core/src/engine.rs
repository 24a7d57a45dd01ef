//! 式の実行エンジン
//!
//! 下位化したカーネルをパーティションごとにキャッシュから取得（なければコンパイル）し、
//! 各パーティションのキューに投入します。パーティション間の同期は行いません。
//! カーネルはすべてのパーティション分を揃えてから投入を始めます。

use crate::backend::{Backend, Compiler, Kernel, KernelArg, LaunchRange, Queue};
use crate::error::{Result, VexError};
use crate::expr::{Expr, VectorOperand};
use crate::lowerer::{Binding, LoweredKernel, lower};
use crate::renderer::{OpenCLRenderer, Renderer};

/// 式を`target`に代入する
///
/// すべてのオペランドのパーティション構成（キューと要素数）が`target`と一致している
/// 必要があります。検査はデバイスに何かを投入する前に行われます。
pub fn assign<'a, B: Backend>(target: &VectorOperand<'_, B>, expr: &Expr<'a, B>) -> Result<()> {
    let LoweredKernel { program, bindings } = lower(expr, target.dtype)?;

    for binding in &bindings {
        if let Binding::Vector(operand) = binding {
            check_layout(target, operand)?;
        }
    }

    if target.size == 0 {
        return Ok(());
    }

    // 一つでもコンパイルに失敗したら、どのパーティションにも書き込まない
    let kernels = target
        .partitions
        .iter()
        .map(|part| {
            let ctx = part.queue.context();
            ctx.kernel_cache()
                .get_or_insert_with(&program.signature, || {
                    log::debug!(
                        "compiling {} for {} ({})",
                        program.name,
                        ctx.name(),
                        B::name()
                    );
                    if ctx.config().show_kernels {
                        let source = OpenCLRenderer::new().render(&program);
                        log::debug!("{}\n{}", program.signature, source);
                    }
                    B::Compiler::new()
                        .compile(&part.queue, &program)
                        .map_err(|e| VexError::Compilation(e.to_string()))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    for (i, (part, kernel)) in target.partitions.iter().zip(&kernels).enumerate() {
        let mut args = Vec::with_capacity(bindings.len() + 1);
        args.push(KernelArg::Buffer(&target.buffers[i]));
        for binding in &bindings {
            args.push(match binding {
                Binding::Vector(operand) => KernelArg::Buffer(&operand.buffers[i]),
                Binding::Scalar(value) => KernelArg::Scalar(*value),
            });
        }

        log::trace!(
            "launch {} on partition {} (offset={}, count={})",
            kernel.name(),
            i,
            part.offset,
            part.count
        );
        kernel
            .launch(&part.queue, &args, LaunchRange::new(part.offset, part.count))
            .map_err(|e| VexError::KernelExecution(e.to_string()))?;
    }

    Ok(())
}

fn check_layout<B: Backend>(target: &VectorOperand<'_, B>, operand: &VectorOperand<'_, B>) -> Result<()> {
    if operand.size != target.size {
        return Err(VexError::size_mismatch(target.size, operand.size));
    }
    let same = operand.partitions.len() == target.partitions.len()
        && operand
            .partitions
            .iter()
            .zip(target.partitions)
            .all(|(a, b)| a.same_layout(b));
    if !same {
        return Err(VexError::SizeMismatch(format!(
            "operand is split into {} partitions that do not match the {} partitions of the target",
            operand.partitions.len(),
            target.partitions.len()
        )));
    }
    Ok(())
}

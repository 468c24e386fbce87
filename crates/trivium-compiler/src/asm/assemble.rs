//! Program assembler
//!
//! Wraps a lowered program into one NASM translation unit: externs, the
//! output format string, the lambda bodies, then `main` between the
//! machine's prologue and epilogue.

use super::templates::FORMAT_LABEL;
use super::{render, AsmBuffer};
use crate::ir::{Instruction, Program};
use crate::machine::Backend;

pub fn assemble<B: Backend>(program: &Program<B::Instr>) -> String {
    let mut asm = AsmBuffer::new();

    for symbol in B::EXTERNS {
        asm.directive(format!("extern {}", symbol));
    }
    asm.blank();
    asm.directive("SECTION .data");
    asm.directive(format!("{}: db \"%lld\", 10, 0", FORMAT_LABEL));
    asm.blank();
    asm.directive("SECTION .text");

    for body in program.lambdas.iter() {
        asm.blank();
        asm.directive(format!("global {}", body.label));
        asm.label(&body.label);
        lower_stream::<B>(&body.code, &mut asm);
    }

    asm.blank();
    asm.directive("global main");
    asm.label("main");
    B::prologue(program, &mut asm);
    lower_stream::<B>(&program.code, &mut asm);
    B::epilogue(program, &mut asm);

    tracing::debug!(
        machine = %B::MACHINE,
        lines = asm.len(),
        lambdas = program.lambdas.len(),
        "assembled"
    );
    render(asm.lines())
}

fn lower_stream<B: Backend>(code: &[B::Instr], asm: &mut AsmBuffer) {
    for instr in code {
        if instr.defines().is_none() {
            asm.comment(instr);
        }
        B::lower(instr, asm);
    }
}

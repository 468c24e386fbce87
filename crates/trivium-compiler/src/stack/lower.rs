//! Stack machine lowering
//!
//! `rbx` holds the native address of VM address 0 and the VM stack grows
//! with the native one, so VM address `a` is native `rbx - a`. `rbp` keeps
//! the frame pointer as a VM address.

use super::instr::StackInstr;
use crate::asm::templates;
use crate::asm::{mem, AsmBuffer};
use crate::ir::{Const, Program};
use crate::scope::WORD;

pub fn lower(instr: &StackInstr, asm: &mut AsmBuffer) {
    match instr {
        StackInstr::Loadc(Const::Int(value)) => templates::loadc(asm, value),
        StackInstr::Loadc(Const::Addr(label)) => templates::loadc(asm, label),
        StackInstr::Load => {
            asm.op("pop", "rax");
            asm.op("mov", "rcx, rbx");
            asm.op("sub", "rcx, rax");
            asm.op("push", "qword [rcx]");
        }
        StackInstr::Store => {
            asm.op("pop", "rax");
            asm.op("mov", "rcx, rbx");
            asm.op("sub", "rcx, rax");
            asm.op("mov", "rdx, [rsp]");
            asm.op("mov", "[rcx], rdx");
        }
        StackInstr::Loadrc(offset) => {
            asm.op("mov", "rax, rbp");
            asm.op("add", &format!("rax, {}", offset));
            asm.op("push", "rax");
        }
        StackInstr::Pop => templates::pop(asm),
        StackInstr::Dup => templates::dup(asm),
        StackInstr::Swap => templates::swap(asm),
        StackInstr::Dec => templates::dec(asm),
        StackInstr::Unary(op) => templates::unary(asm, *op),
        StackInstr::Binary(op) => templates::binary(asm, *op),
        StackInstr::Label(label) => asm.label(label),
        StackInstr::Jump(target) => templates::jump(asm, target),
        StackInstr::Jumpz(target) => templates::jumpz(asm, target),
        StackInstr::Enter => {
            asm.op("mov", "rbp, rbx");
            asm.op("sub", "rbp, rsp");
        }
        StackInstr::Alloc(bytes) => asm.op("sub", &format!("rsp, {}", bytes)),
        StackInstr::Mark => asm.op("push", "rbp"),
        StackInstr::Call => {
            asm.op("pop", "rax");
            asm.op("call", "rax");
        }
        StackInstr::Ret => {
            asm.op("mov", "rsp, rbx");
            asm.op("sub", "rsp, rbp");
            asm.op_commented("mov", "rbp, [rsp + 8]", "caller frame");
            asm.op("ret", "");
        }
        StackInstr::Slide { drop, keep } => {
            // Highest word first, so no source is overwritten before it is read.
            for i in (0..keep / WORD).rev() {
                asm.op("mov", &format!("rax, {}", mem("rsp", WORD * i)));
                asm.op("mov", &format!("{}, rax", mem("rsp", drop + WORD * i)));
            }
            asm.op("add", &format!("rsp, {}", drop));
        }
    }
}

/// Zeroed globals below the first frame; the frame pointer starts at the
/// last global.
pub fn prologue(program: &Program<StackInstr>, asm: &mut AsmBuffer) {
    let total = program.global_space();
    templates::save_registers(asm);
    for global in &program.globals {
        asm.op_commented("push", "qword 0", &global.name);
    }
    asm.op("lea", &format!("rbx, {}", mem("rsp", total - WORD)));
    asm.op("mov", "rbp, rbx");
    asm.op("sub", "rbp, rsp");
}

pub fn epilogue(_program: &Program<StackInstr>, asm: &mut AsmBuffer) {
    asm.op_commented("pop", "rsi", "result");
    asm.op("lea", "rsp, [rbx + 8]");
    templates::restore_registers(asm);
    templates::print_and_return(asm);
}

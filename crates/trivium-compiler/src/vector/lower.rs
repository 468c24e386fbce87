//! Vector machine lowering
//!
//! `r12` holds the globals vector, `r13` the formals vector and `r14` the
//! return-point vector of the running function. `rbp` points at the
//! caller's saved `rbp`, with `[rbp + 8]` the caller's globals and the
//! caller's return points, formals and callee cell above it. Every value
//! lives in an indirection cell `[payload, tag]`.

use super::instr::{Tag, VectorInstr};
use crate::asm::templates;
use crate::asm::{mem, AsmBuffer};
use crate::ir::{Const, Program};
use crate::scope::WORD;

pub fn lower(instr: &VectorInstr, asm: &mut AsmBuffer) {
    match instr {
        VectorInstr::Loadc(Const::Int(value)) => templates::loadc(asm, value),
        VectorInstr::Loadc(Const::Addr(label)) => templates::loadc(asm, label),
        VectorInstr::Pop => templates::pop(asm),
        VectorInstr::Dup => templates::dup(asm),
        VectorInstr::Swap => templates::swap(asm),
        VectorInstr::Dec => templates::dec(asm),
        VectorInstr::Unary(op) => templates::unary(asm, *op),
        VectorInstr::Binary(op) => templates::binary(asm, *op),
        VectorInstr::Label(label) => asm.label(label),
        VectorInstr::Jump(target) => templates::jump(asm, target),
        VectorInstr::Jumpz(target) => templates::jumpz(asm, target),
        VectorInstr::Mkbasic => {
            templates::heap_alloc(asm, 1);
            asm.op("pop", "rax");
            asm.op("mov", "[rdx], rax");
            asm.op("push", "rdx");
        }
        VectorInstr::Getbasic => {
            asm.op("pop", "rdx");
            asm.op("mov", "rax, [rdx]");
            asm.op("mov", "rcx, [rax]");
            asm.op("cmp", &format!("qword [rdx + 8], {}", Tag::Basic));
            asm.op_commented("cmove", "rax, rcx", "other tags keep the payload");
            asm.op("push", "rax");
        }
        VectorInstr::Mkind(tag) => indirection(asm, *tag),
        VectorInstr::Copy => {
            templates::heap_alloc(asm, 2);
            asm.op("pop", "rax");
            asm.op("mov", "rcx, [rax]");
            asm.op("mov", "[rdx], rcx");
            asm.op("mov", "rcx, [rax + 8]");
            asm.op("mov", "[rdx + 8], rcx");
            asm.op("push", "rdx");
        }
        VectorInstr::Mkvec(n) => templates::mkvec(asm, *n),
        VectorInstr::Mkfunval(label) => templates::mkfunval(asm, label),
        VectorInstr::Pushloc(a) => asm.op("push", &format!("qword {}", mem("rbp", -WORD * a))),
        VectorInstr::Pushglob(i) => {
            asm.op("push", &format!("qword {}", mem("r12", WORD * (i + 1))))
        }
        VectorInstr::Pushform(i) => {
            asm.op("push", &format!("qword {}", mem("r13", WORD * (i + 1))))
        }
        VectorInstr::Alloc(n) => {
            for _ in 0..*n {
                templates::heap_alloc(asm, 1);
                asm.op("mov", "qword [rdx], 0");
                asm.op("push", "rdx");
                indirection(asm, Tag::Basic);
            }
        }
        VectorInstr::Store => templates::copy_pair(asm, "[rsp]"),
        VectorInstr::Setgp => asm.op("pop", "r12"),
        VectorInstr::Call => {
            asm.op_commented("mov", "rdx, [rsp + 16]", "callee cell");
            asm.op("mov", "rdx, [rdx]");
            asm.op("push", "r12");
            asm.op("mov", "r12, [rdx + 8]");
            asm.op("push", "rbp");
            asm.op("mov", "rbp, rsp");
            asm.op("xchg", "r14, [rbp + 16]");
            asm.op("xchg", "r13, [rbp + 24]");
            asm.op("jmp", "qword [rdx]");
        }
        VectorInstr::Return(i) => {
            asm.op("pop", "rax");
            asm.op_commented("mov", "[rbp + 32], rax", "result over callee cell");
            asm.op("mov", "rsp, rbp");
            asm.op("pop", "rbp");
            asm.op("pop", "r12");
            asm.op("mov", &format!("rax, {}", mem("r14", WORD * (i + 1))));
            asm.op("pop", "r14");
            asm.op("pop", "r13");
            asm.op("jmp", "rax");
        }
        VectorInstr::Slide(n) => templates::slide(asm, *n),
    }
}

/// Wrap the pointer on top in a `[payload, tag]` cell.
fn indirection(asm: &mut AsmBuffer, tag: Tag) {
    templates::heap_alloc(asm, 2);
    asm.op("pop", "rax");
    asm.op("mov", "[rdx], rax");
    asm.op("mov", &format!("qword [rdx + 8], {}", tag));
    asm.op("push", "rdx");
}

pub fn prologue(_program: &Program<VectorInstr>, asm: &mut AsmBuffer) {
    templates::save_registers(asm);
    asm.op("mov", "rbp, rsp");
}

pub fn epilogue(_program: &Program<VectorInstr>, asm: &mut AsmBuffer) {
    asm.op_commented("pop", "rsi", "result");
    asm.op("mov", "rsp, rbp");
    templates::restore_registers(asm);
    templates::print_and_return(asm);
}

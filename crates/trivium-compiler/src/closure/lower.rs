//! Closure machine lowering
//!
//! `rbx` is the globals pointer and `rbp` points at the newest `mark`:
//! `[rbp]` return address, `[rbp + 8]` caller frame, `[rbp + 16]` caller
//! globals. Vectors are `[n, e1 .. en]`, closures `[code, globals]`.

use super::instr::ClosureInstr;
use crate::asm::templates;
use crate::asm::{mem, AsmBuffer};
use crate::ir::{Const, Program};
use crate::scope::WORD;

pub fn lower(instr: &ClosureInstr, asm: &mut AsmBuffer) {
    match instr {
        ClosureInstr::Loadc(Const::Int(value)) => templates::loadc(asm, value),
        ClosureInstr::Loadc(Const::Addr(label)) => templates::loadc(asm, label),
        ClosureInstr::Pop => templates::pop(asm),
        ClosureInstr::Dup => templates::dup(asm),
        ClosureInstr::Swap => templates::swap(asm),
        ClosureInstr::Dec => templates::dec(asm),
        ClosureInstr::Unary(op) => templates::unary(asm, *op),
        ClosureInstr::Binary(op) => templates::binary(asm, *op),
        ClosureInstr::Label(label) => asm.label(label),
        ClosureInstr::Jump(target) => templates::jump(asm, target),
        ClosureInstr::Jumpz(target) => templates::jumpz(asm, target),
        ClosureInstr::Pushloc(k) => asm.op("push", &format!("qword {}", mem("rsp", WORD * k))),
        ClosureInstr::Storeloc(k) => {
            asm.op("mov", "rax, [rsp]");
            asm.op("mov", &format!("{}, rax", mem("rsp", WORD * k)));
        }
        ClosureInstr::Pushglob(i) => {
            asm.op("push", &format!("qword {}", mem("rbx", WORD * (i + 1))))
        }
        ClosureInstr::Load => {
            asm.op("pop", "rax");
            asm.op("push", "qword [rax]");
        }
        ClosureInstr::Store => {
            asm.op("pop", "rax");
            asm.op("mov", "rcx, [rsp]");
            asm.op("mov", "[rax], rcx");
        }
        ClosureInstr::Alloc(n) => {
            for _ in 0..*n {
                templates::heap_alloc(asm, 2);
                asm.op("mov", "qword [rdx], 0");
                asm.op("mov", "qword [rdx + 8], 0");
                asm.op("push", "rdx");
            }
        }
        ClosureInstr::Rewrite(k) => templates::copy_pair(asm, &mem("rsp", WORD * (k - 1))),
        ClosureInstr::Mkvec(n) => templates::mkvec(asm, *n),
        ClosureInstr::Mkfunval(label) => templates::mkfunval(asm, label),
        ClosureInstr::Mark(label) => {
            asm.op("push", "rbx");
            asm.op("push", "rbp");
            asm.op("lea", &format!("rax, [rel {}]", label));
            asm.op("push", "rax");
            asm.op("mov", "rbp, rsp");
        }
        ClosureInstr::Apply(_) => {
            asm.op("pop", "rax");
            asm.op("mov", "rbx, [rax + 8]");
            asm.op("jmp", "qword [rax]");
        }
        ClosureInstr::Popenv => {
            asm.op("pop", "rax");
            asm.op("mov", "rbx, [rbp + 16]");
            asm.op_commented("mov", "[rbp + 16], rax", "result over saved globals");
            asm.op("lea", "rsp, [rbp + 16]");
            asm.op("mov", "rax, [rbp]");
            asm.op("mov", "rbp, [rbp + 8]");
            asm.op("jmp", "rax");
        }
        ClosureInstr::Slide(n) => templates::slide(asm, *n),
        ClosureInstr::Setgp => asm.op("pop", "rbx"),
    }
}

pub fn prologue(_program: &Program<ClosureInstr>, asm: &mut AsmBuffer) {
    templates::save_registers(asm);
    asm.op("mov", "rbp, rsp");
}

pub fn epilogue(_program: &Program<ClosureInstr>, asm: &mut AsmBuffer) {
    asm.op_commented("pop", "rsi", "result");
    asm.op("mov", "rsp, rbp");
    templates::restore_registers(asm);
    templates::print_and_return(asm);
}

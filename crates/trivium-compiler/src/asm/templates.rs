//! Lowering templates shared by all three machines
//!
//! The native stack is the operand stack: `rax`, `rcx` and `rdx` are
//! scratch, `r15` holds `rsp` across calls into the C runtime.

use super::{mem, AsmBuffer};
use crate::labels::Label;
use trivium_parser::ast::{BinaryOp, UnaryOp};

/// Registers the entry point saves for its C caller, in push order.
pub const CALLEE_SAVED: [&str; 6] = ["rbp", "rbx", "r12", "r13", "r14", "r15"];

pub const FORMAT_LABEL: &str = "i64_fmt";

pub fn loadc(asm: &mut AsmBuffer, value: impl std::fmt::Display) {
    asm.op("mov", &format!("rax, qword {}", value));
    asm.op("push", "rax");
}

pub fn pop(asm: &mut AsmBuffer) {
    asm.op("add", "rsp, 8");
}

pub fn dup(asm: &mut AsmBuffer) {
    asm.op("push", "qword [rsp]");
}

pub fn swap(asm: &mut AsmBuffer) {
    asm.op("pop", "rax");
    asm.op("pop", "rcx");
    asm.op("push", "rax");
    asm.op("push", "rcx");
}

pub fn dec(asm: &mut AsmBuffer) {
    asm.op("dec", "qword [rsp]");
}

pub fn unary(asm: &mut AsmBuffer, op: UnaryOp) {
    match op {
        UnaryOp::Neg => asm.op("neg", "qword [rsp]"),
        UnaryOp::Not => {
            asm.op("pop", "rax");
            asm.op("test", "rax, rax");
            asm.op("sete", "al");
            asm.op("movzx", "rax, al");
            asm.op("push", "rax");
        }
    }
}

pub fn binary(asm: &mut AsmBuffer, op: BinaryOp) {
    asm.op("pop", "rcx");
    asm.op("pop", "rax");
    match op {
        BinaryOp::Add => asm.op("add", "rax, rcx"),
        BinaryOp::Sub => asm.op("sub", "rax, rcx"),
        BinaryOp::Mul => asm.op("imul", "rax, rcx"),
        BinaryOp::Div => {
            asm.op("cqo", "");
            asm.op("idiv", "rcx");
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            let set = match op {
                BinaryOp::Lt => "setl",
                BinaryOp::Gt => "setg",
                BinaryOp::Le => "setle",
                BinaryOp::Ge => "setge",
                BinaryOp::Eq => "sete",
                _ => "setne",
            };
            asm.op("cmp", "rax, rcx");
            asm.op(set, "al");
            asm.op("movzx", "rax, al");
        }
        BinaryOp::And | BinaryOp::Or => {
            asm.op("test", "rax, rax");
            asm.op("setne", "al");
            asm.op("test", "rcx, rcx");
            asm.op("setne", "cl");
            asm.op(if op == BinaryOp::And { "and" } else { "or" }, "al, cl");
            asm.op("movzx", "rax, al");
        }
    }
    asm.op("push", "rax");
}

pub fn jump(asm: &mut AsmBuffer, target: &Label) {
    asm.op("jmp", target.as_str());
}

pub fn jumpz(asm: &mut AsmBuffer, target: &Label) {
    asm.op("pop", "rax");
    asm.op("test", "rax, rax");
    asm.op("je", target.as_str());
}

/// `malloc(8 * words)` with the native stack realigned; leaves the block
/// in `rdx` and the operand stack untouched.
pub fn heap_alloc(asm: &mut AsmBuffer, words: i64) {
    asm.op("mov", "r15, rsp");
    asm.op("and", "rsp, -16");
    asm.op("mov", &format!("rdi, {}", 8 * words));
    asm.op("call", "malloc");
    asm.op("mov", "rsp, r15");
    asm.op("mov", "rdx, rax");
}

/// Pop `n` words into a fresh `[n, e1 .. en]` block and push it.
pub fn mkvec(asm: &mut AsmBuffer, n: i64) {
    heap_alloc(asm, n + 1);
    asm.op("mov", &format!("qword [rdx], {}", n));
    for i in (1..=n).rev() {
        asm.op("pop", "rax");
        asm.op("mov", &format!("{}, rax", mem("rdx", 8 * i)));
    }
    asm.op("push", "rdx");
}

/// Pair `label` with the vector on top: `[code, vector]`.
pub fn mkfunval(asm: &mut AsmBuffer, label: &Label) {
    heap_alloc(asm, 2);
    asm.op("lea", &format!("rax, [rel {}]", label));
    asm.op("mov", "[rdx], rax");
    asm.op("pop", "rax");
    asm.op("mov", "[rdx + 8], rax");
    asm.op("push", "rdx");
}

/// Pop a source block and copy its first two words into the block at
/// `target`.
pub fn copy_pair(asm: &mut AsmBuffer, target: &str) {
    asm.op("pop", "rax");
    asm.op("mov", &format!("rcx, {}", target));
    asm.op("mov", "rdx, [rax]");
    asm.op("mov", "[rcx], rdx");
    asm.op("mov", "rdx, [rax + 8]");
    asm.op("mov", "[rcx + 8], rdx");
}

pub fn slide(asm: &mut AsmBuffer, words: i64) {
    if words > 0 {
        asm.op("pop", "rax");
        asm.op("add", &format!("rsp, {}", 8 * words));
        asm.op("push", "rax");
    }
}

pub fn save_registers(asm: &mut AsmBuffer) {
    for reg in CALLEE_SAVED {
        asm.op("push", reg);
    }
}

pub fn restore_registers(asm: &mut AsmBuffer) {
    for reg in CALLEE_SAVED.iter().rev() {
        asm.op("pop", reg);
    }
}

/// Print `rsi` and return 0 from `main`. Expects the registers restored,
/// so `rsp` is 8 off 16-byte alignment as on entry.
pub fn print_and_return(asm: &mut AsmBuffer) {
    asm.op("sub", "rsp, 8");
    asm.op("mov", &format!("rdi, {}", FORMAT_LABEL));
    asm.op("xor", "eax, eax");
    asm.op_commented("call", "printf", "print result");
    asm.op("add", "rsp, 8");
    asm.op("xor", "eax, eax");
    asm.op("ret", "");
}

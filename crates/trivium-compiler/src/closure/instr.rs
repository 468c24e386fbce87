//! Closure machine instructions

use crate::ir::control::ControlFlow;
use crate::ir::{binop_mnemonic, fmt_instruction, unop_mnemonic, Const, Instruction};
use crate::labels::Label;
use std::fmt;
use trivium_parser::ast::{BinaryOp, UnaryOp};

/// Words a `mark` pushes: globals pointer, frame pointer, return address.
pub const FRAME_WORDS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureInstr {
    Loadc(Const),
    Pop,
    Dup,
    Swap,
    Dec,
    Unary(UnaryOp),
    Binary(BinaryOp),
    Label(Label),
    Jump(Label),
    Jumpz(Label),
    /// Push the word `k` slots below the top
    Pushloc(i64),
    /// Copy the top into the slot `k` below it
    Storeloc(i64),
    /// Push element `i` of the globals vector
    Pushglob(i64),
    /// Replace a global cell pointer with the word it holds
    Load,
    /// Pop a global cell pointer and write the top into it
    Store,
    /// Push `n` empty closure cells
    Alloc(i64),
    /// Pop a closure and copy it into the cell `k` below the popped slot
    Rewrite(i64),
    /// Pop `n` words into a fresh vector
    Mkvec(i64),
    /// Pop a globals vector and pair it with a code label
    Mkfunval(Label),
    /// Save the globals pointer, frame pointer and return address
    Mark(Label),
    /// Pop a closure and enter it with `n` arguments on the stack
    Apply(i64),
    /// Return to the last `mark`, leaving the result in its place
    Popenv,
    Slide(i64),
    /// Pop the globals vector into the GP register
    Setgp,
}

impl Instruction for ClosureInstr {
    fn mnemonic(&self) -> &'static str {
        match self {
            ClosureInstr::Loadc(_) => "loadc",
            ClosureInstr::Pop => "pop",
            ClosureInstr::Dup => "dup",
            ClosureInstr::Swap => "swap",
            ClosureInstr::Dec => "dec",
            ClosureInstr::Unary(op) => unop_mnemonic(*op),
            ClosureInstr::Binary(op) => binop_mnemonic(*op),
            ClosureInstr::Label(_) => "label",
            ClosureInstr::Jump(_) => "jump",
            ClosureInstr::Jumpz(_) => "jumpz",
            ClosureInstr::Pushloc(_) => "pushloc",
            ClosureInstr::Storeloc(_) => "storeloc",
            ClosureInstr::Pushglob(_) => "pushglob",
            ClosureInstr::Load => "load",
            ClosureInstr::Store => "store",
            ClosureInstr::Alloc(_) => "alloc",
            ClosureInstr::Rewrite(_) => "rewrite",
            ClosureInstr::Mkvec(_) => "mkvec",
            ClosureInstr::Mkfunval(_) => "mkfunval",
            ClosureInstr::Mark(_) => "mark",
            ClosureInstr::Apply(_) => "apply",
            ClosureInstr::Popenv => "popenv",
            ClosureInstr::Slide(_) => "slide",
            ClosureInstr::Setgp => "setgp",
        }
    }

    fn operands(&self) -> Vec<String> {
        match self {
            ClosureInstr::Loadc(value) => vec![value.to_string()],
            ClosureInstr::Pushloc(n)
            | ClosureInstr::Storeloc(n)
            | ClosureInstr::Pushglob(n)
            | ClosureInstr::Alloc(n)
            | ClosureInstr::Rewrite(n)
            | ClosureInstr::Mkvec(n)
            | ClosureInstr::Apply(n)
            | ClosureInstr::Slide(n) => vec![n.to_string()],
            ClosureInstr::Label(label)
            | ClosureInstr::Jump(label)
            | ClosureInstr::Jumpz(label)
            | ClosureInstr::Mkfunval(label)
            | ClosureInstr::Mark(label) => vec![label.to_string()],
            _ => Vec::new(),
        }
    }

    fn defines(&self) -> Option<&Label> {
        match self {
            ClosureInstr::Label(label) => Some(label),
            _ => None,
        }
    }

    fn references(&self) -> Option<&Label> {
        match self {
            ClosureInstr::Jump(label)
            | ClosureInstr::Jumpz(label)
            | ClosureInstr::Mkfunval(label)
            | ClosureInstr::Mark(label)
            | ClosureInstr::Loadc(Const::Addr(label)) => Some(label),
            _ => None,
        }
    }

    fn stack_effect(&self) -> i64 {
        match self {
            ClosureInstr::Loadc(_)
            | ClosureInstr::Dup
            | ClosureInstr::Pushloc(_)
            | ClosureInstr::Pushglob(_) => 1,
            ClosureInstr::Pop
            | ClosureInstr::Binary(_)
            | ClosureInstr::Jumpz(_)
            | ClosureInstr::Rewrite(_)
            | ClosureInstr::Store
            | ClosureInstr::Setgp => -1,
            ClosureInstr::Alloc(n) => *n,
            ClosureInstr::Mkvec(n) => 1 - n,
            ClosureInstr::Mark(_) => FRAME_WORDS,
            // the callee's popenv folds arguments, closure and frame into one result
            ClosureInstr::Apply(n) => -(n + FRAME_WORDS),
            ClosureInstr::Slide(n) => -n,
            ClosureInstr::Swap
            | ClosureInstr::Dec
            | ClosureInstr::Unary(_)
            | ClosureInstr::Label(_)
            | ClosureInstr::Jump(_)
            | ClosureInstr::Storeloc(_)
            | ClosureInstr::Load
            | ClosureInstr::Mkfunval(_)
            | ClosureInstr::Popenv => 0,
        }
    }
}

impl ControlFlow for ClosureInstr {
    fn loadc(value: i64) -> Self {
        ClosureInstr::Loadc(Const::Int(value))
    }

    fn pop() -> Self {
        ClosureInstr::Pop
    }

    fn dup() -> Self {
        ClosureInstr::Dup
    }

    fn swap() -> Self {
        ClosureInstr::Swap
    }

    fn dec() -> Self {
        ClosureInstr::Dec
    }

    fn binary(op: BinaryOp) -> Self {
        ClosureInstr::Binary(op)
    }

    fn label(label: Label) -> Self {
        ClosureInstr::Label(label)
    }

    fn jump(target: Label) -> Self {
        ClosureInstr::Jump(target)
    }

    fn jumpz(target: Label) -> Self {
        ClosureInstr::Jumpz(target)
    }
}

impl fmt::Display for ClosureInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_instruction(self, f)
    }
}

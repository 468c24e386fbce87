//! Stack machine instructions
//!
//! Addresses are byte offsets into the VM stack. Globals sit at the bottom
//! at absolute addresses; formals and locals are reached through `loadrc`,
//! relative to the frame pointer.

use crate::ir::control::ControlFlow;
use crate::ir::{binop_mnemonic, fmt_instruction, unop_mnemonic, Const, Instruction};
use crate::labels::Label;
use crate::scope::WORD;
use std::fmt;
use trivium_parser::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackInstr {
    /// Push a word or a code address
    Loadc(Const),
    /// Replace an address on top with the word stored there
    Load,
    /// Pop an address and store the word under it there; the word stays
    Store,
    /// Push `fp + offset`
    Loadrc(i64),
    Pop,
    Dup,
    Swap,
    Dec,
    Unary(UnaryOp),
    Binary(BinaryOp),
    Label(Label),
    Jump(Label),
    Jumpz(Label),
    /// Make the current top the frame pointer
    Enter,
    /// Reserve bytes for procedure locals
    Alloc(i64),
    /// Push the caller's frame pointer
    Mark,
    /// Pop a code address and call it
    Call,
    /// Drop the frame, restore the caller's frame pointer and return
    Ret,
    /// Drop `drop` bytes under the top `keep` bytes
    Slide { drop: i64, keep: i64 },
}

impl Instruction for StackInstr {
    fn mnemonic(&self) -> &'static str {
        match self {
            StackInstr::Loadc(_) => "loadc",
            StackInstr::Load => "load",
            StackInstr::Store => "store",
            StackInstr::Loadrc(_) => "loadrc",
            StackInstr::Pop => "pop",
            StackInstr::Dup => "dup",
            StackInstr::Swap => "swap",
            StackInstr::Dec => "dec",
            StackInstr::Unary(op) => unop_mnemonic(*op),
            StackInstr::Binary(op) => binop_mnemonic(*op),
            StackInstr::Label(_) => "label",
            StackInstr::Jump(_) => "jump",
            StackInstr::Jumpz(_) => "jumpz",
            StackInstr::Enter => "enter",
            StackInstr::Alloc(_) => "alloc",
            StackInstr::Mark => "mark",
            StackInstr::Call => "call",
            StackInstr::Ret => "return",
            StackInstr::Slide { .. } => "slide",
        }
    }

    fn operands(&self) -> Vec<String> {
        match self {
            StackInstr::Loadc(value) => vec![value.to_string()],
            StackInstr::Loadrc(offset) => vec![offset.to_string()],
            StackInstr::Alloc(bytes) => vec![bytes.to_string()],
            StackInstr::Label(label) | StackInstr::Jump(label) | StackInstr::Jumpz(label) => {
                vec![label.to_string()]
            }
            StackInstr::Slide { drop, keep } => vec![drop.to_string(), keep.to_string()],
            _ => Vec::new(),
        }
    }

    fn defines(&self) -> Option<&Label> {
        match self {
            StackInstr::Label(label) => Some(label),
            _ => None,
        }
    }

    fn references(&self) -> Option<&Label> {
        match self {
            StackInstr::Jump(label)
            | StackInstr::Jumpz(label)
            | StackInstr::Loadc(Const::Addr(label)) => Some(label),
            _ => None,
        }
    }

    fn stack_effect(&self) -> i64 {
        match self {
            StackInstr::Loadc(_) | StackInstr::Loadrc(_) | StackInstr::Dup | StackInstr::Mark => 1,
            StackInstr::Store
            | StackInstr::Pop
            | StackInstr::Binary(_)
            | StackInstr::Jumpz(_)
            | StackInstr::Call => -1,
            StackInstr::Alloc(bytes) => bytes / WORD,
            StackInstr::Slide { drop, .. } => -(drop / WORD),
            StackInstr::Load
            | StackInstr::Swap
            | StackInstr::Dec
            | StackInstr::Unary(_)
            | StackInstr::Label(_)
            | StackInstr::Jump(_)
            | StackInstr::Enter
            | StackInstr::Ret => 0,
        }
    }
}

impl ControlFlow for StackInstr {
    fn loadc(value: i64) -> Self {
        StackInstr::Loadc(Const::Int(value))
    }

    fn pop() -> Self {
        StackInstr::Pop
    }

    fn dup() -> Self {
        StackInstr::Dup
    }

    fn swap() -> Self {
        StackInstr::Swap
    }

    fn dec() -> Self {
        StackInstr::Dec
    }

    fn binary(op: BinaryOp) -> Self {
        StackInstr::Binary(op)
    }

    fn label(label: Label) -> Self {
        StackInstr::Label(label)
    }

    fn jump(target: Label) -> Self {
        StackInstr::Jump(target)
    }

    fn jumpz(target: Label) -> Self {
        StackInstr::Jumpz(target)
    }
}

impl fmt::Display for StackInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_instruction(self, f)
    }
}

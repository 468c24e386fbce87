//! Vector machine instructions

use crate::ir::control::ControlFlow;
use crate::ir::{binop_mnemonic, fmt_instruction, unop_mnemonic, Const, Instruction};
use crate::labels::Label;
use std::fmt;
use trivium_parser::ast::{BinaryOp, UnaryOp};

/// What an indirection cell's payload points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Basic,
    Function,
    Vector,
}

impl Tag {
    pub fn as_char(self) -> char {
        match self {
            Tag::Basic => 'B',
            Tag::Function => 'F',
            Tag::Vector => 'V',
        }
    }

    /// The tag word as stored in a cell.
    pub fn word(self) -> i64 {
        self.as_char() as i64
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorInstr {
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
    /// Box the word on top in a basic cell
    Mkbasic,
    /// Replace a `'B'` indirection cell with its word
    Getbasic,
    /// Wrap the pointer on top in an indirection cell
    Mkind(Tag),
    /// Replace a cell with a fresh copy
    Copy,
    Mkvec(i64),
    Mkfunval(Label),
    /// Push the cell of local `a`
    Pushloc(i64),
    /// Push the cell of global or captured variable `i`
    Pushglob(i64),
    /// Push the cell of formal `i`
    Pushform(i64),
    /// Push `n` cells holding basic 0
    Alloc(i64),
    /// Pop a cell and copy it into the cell below, which stays
    Store,
    Setgp,
    /// Enter the function under the formals and return-point vectors
    Call,
    /// Leave through entry `i` of the return-point vector
    Return(i64),
    Slide(i64),
}

impl Instruction for VectorInstr {
    fn mnemonic(&self) -> &'static str {
        match self {
            VectorInstr::Loadc(_) => "loadc",
            VectorInstr::Pop => "pop",
            VectorInstr::Dup => "dup",
            VectorInstr::Swap => "swap",
            VectorInstr::Dec => "dec",
            VectorInstr::Unary(op) => unop_mnemonic(*op),
            VectorInstr::Binary(op) => binop_mnemonic(*op),
            VectorInstr::Label(_) => "label",
            VectorInstr::Jump(_) => "jump",
            VectorInstr::Jumpz(_) => "jumpz",
            VectorInstr::Mkbasic => "mkbasic",
            VectorInstr::Getbasic => "getbasic",
            VectorInstr::Mkind(_) => "mkind",
            VectorInstr::Copy => "copy",
            VectorInstr::Mkvec(_) => "mkvec",
            VectorInstr::Mkfunval(_) => "mkfunval",
            VectorInstr::Pushloc(_) => "pushloc",
            VectorInstr::Pushglob(_) => "pushglob",
            VectorInstr::Pushform(_) => "pushform",
            VectorInstr::Alloc(_) => "alloc",
            VectorInstr::Store => "store",
            VectorInstr::Setgp => "setgp",
            VectorInstr::Call => "call",
            VectorInstr::Return(_) => "return",
            VectorInstr::Slide(_) => "slide",
        }
    }

    fn operands(&self) -> Vec<String> {
        match self {
            VectorInstr::Loadc(value) => vec![value.to_string()],
            VectorInstr::Mkind(tag) => vec![tag.to_string()],
            VectorInstr::Mkvec(n)
            | VectorInstr::Pushloc(n)
            | VectorInstr::Pushglob(n)
            | VectorInstr::Pushform(n)
            | VectorInstr::Alloc(n)
            | VectorInstr::Return(n)
            | VectorInstr::Slide(n) => vec![n.to_string()],
            VectorInstr::Label(label)
            | VectorInstr::Jump(label)
            | VectorInstr::Jumpz(label)
            | VectorInstr::Mkfunval(label) => vec![label.to_string()],
            _ => Vec::new(),
        }
    }

    fn defines(&self) -> Option<&Label> {
        match self {
            VectorInstr::Label(label) => Some(label),
            _ => None,
        }
    }

    fn references(&self) -> Option<&Label> {
        match self {
            VectorInstr::Jump(label)
            | VectorInstr::Jumpz(label)
            | VectorInstr::Mkfunval(label)
            | VectorInstr::Loadc(Const::Addr(label)) => Some(label),
            _ => None,
        }
    }

    fn stack_effect(&self) -> i64 {
        match self {
            VectorInstr::Loadc(_)
            | VectorInstr::Dup
            | VectorInstr::Pushloc(_)
            | VectorInstr::Pushglob(_)
            | VectorInstr::Pushform(_) => 1,
            VectorInstr::Pop
            | VectorInstr::Binary(_)
            | VectorInstr::Jumpz(_)
            | VectorInstr::Store
            | VectorInstr::Setgp => -1,
            VectorInstr::Alloc(n) => *n,
            VectorInstr::Mkvec(n) => 1 - n,
            // callee cell, formals and return points become one result cell
            VectorInstr::Call => -2,
            VectorInstr::Slide(n) => -n,
            VectorInstr::Swap
            | VectorInstr::Dec
            | VectorInstr::Unary(_)
            | VectorInstr::Label(_)
            | VectorInstr::Jump(_)
            | VectorInstr::Mkbasic
            | VectorInstr::Getbasic
            | VectorInstr::Mkind(_)
            | VectorInstr::Copy
            | VectorInstr::Mkfunval(_)
            | VectorInstr::Return(_) => 0,
        }
    }
}

impl ControlFlow for VectorInstr {
    fn loadc(value: i64) -> Self {
        VectorInstr::Loadc(Const::Int(value))
    }

    fn pop() -> Self {
        VectorInstr::Pop
    }

    fn dup() -> Self {
        VectorInstr::Dup
    }

    fn swap() -> Self {
        VectorInstr::Swap
    }

    fn dec() -> Self {
        VectorInstr::Dec
    }

    fn binary(op: BinaryOp) -> Self {
        VectorInstr::Binary(op)
    }

    fn label(label: Label) -> Self {
        VectorInstr::Label(label)
    }

    fn jump(target: Label) -> Self {
        VectorInstr::Jump(target)
    }

    fn jumpz(target: Label) -> Self {
        VectorInstr::Jumpz(target)
    }
}

impl fmt::Display for VectorInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_instruction(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_words_are_ascii() {
        assert_eq!(Tag::Basic.word(), 66);
        assert_eq!(VectorInstr::Mkind(Tag::Function).to_string(), "mkind 'F'");
    }
}

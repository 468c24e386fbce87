//! Pieces shared by the IR simulators
//!
//! A simulator runs a [`Program`] the way the lowered code would, with code
//! and heap addresses kept in disjoint ranges so a stray word is caught
//! instead of silently reused.

use crate::ir::{Instruction, Program};
use crate::labels::Label;
use rustc_hash::FxHashMap;
use thiserror::Error;
use trivium_parser::ast::{BinaryOp, UnaryOp};

/// Code address of instruction 0.
pub const CODE_BASE: i64 = 0x4000_0000;

/// Address of the first heap word.
pub const HEAP_BASE: i64 = 0x1000_0000_0000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("operand stack underflow at instruction {pc}")]
    StackUnderflow { pc: usize },

    #[error("jump to undefined label {label}")]
    UnknownLabel { label: String },

    #[error("{address:#x} is not a valid {expected} address")]
    BadAddress { address: i64, expected: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("step limit of {limit} exceeded")]
    StepLimit { limit: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 5_000_000,
        }
    }
}

/// Flattened code: every lambda body, then the entry stream.
///
/// Running off the end of the entry stream halts, so no body may sit
/// after it.
pub struct CodeImage<'p, I> {
    instrs: Vec<&'p I>,
    labels: FxHashMap<&'p Label, usize>,
    /// First instruction of the entry stream.
    pub entry: usize,
    /// One past the last instruction; reaching it halts.
    pub main_end: usize,
}

impl<'p, I: Instruction> CodeImage<'p, I> {
    pub fn load(program: &'p Program<I>) -> Self {
        let mut instrs: Vec<&I> = Vec::with_capacity(program.instruction_count());
        let mut labels = FxHashMap::default();
        for body in program.lambdas.iter() {
            labels.insert(&body.label, instrs.len());
            instrs.extend(body.code.iter());
        }
        let entry = instrs.len();
        instrs.extend(program.code.iter());
        for (pc, instr) in instrs.iter().enumerate() {
            if let Some(label) = instr.defines() {
                labels.insert(label, pc);
            }
        }
        let main_end = instrs.len();
        Self {
            instrs,
            labels,
            entry,
            main_end,
        }
    }

    pub fn get(&self, pc: usize) -> Option<&'p I> {
        self.instrs.get(pc).copied()
    }

    pub fn target(&self, label: &Label) -> Result<usize, MachineError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| MachineError::UnknownLabel {
                label: label.to_string(),
            })
    }

    /// The word `loadc label` / `mark label` pushes.
    pub fn address_of(&self, label: &Label) -> Result<i64, MachineError> {
        Ok(CODE_BASE + self.target(label)? as i64)
    }

    pub fn pc_of(&self, address: i64) -> Result<usize, MachineError> {
        let pc = address - CODE_BASE;
        if pc < 0 || pc as usize >= self.instrs.len() {
            return Err(MachineError::BadAddress {
                address,
                expected: "code",
            });
        }
        Ok(pc as usize)
    }
}

/// Word-addressed heap that only grows.
#[derive(Debug, Default)]
pub struct Heap {
    words: Vec<i64>,
}

impl Heap {
    pub fn alloc(&mut self, words: usize) -> i64 {
        let address = HEAP_BASE + 8 * self.words.len() as i64;
        self.words.resize(self.words.len() + words, 0);
        address
    }

    fn index(&self, address: i64) -> Result<usize, MachineError> {
        let offset = address - HEAP_BASE;
        if offset < 0 || offset % 8 != 0 || (offset / 8) as usize >= self.words.len() {
            return Err(MachineError::BadAddress {
                address,
                expected: "heap",
            });
        }
        Ok((offset / 8) as usize)
    }

    pub fn load(&self, address: i64) -> Result<i64, MachineError> {
        Ok(self.words[self.index(address)?])
    }

    pub fn store(&mut self, address: i64, value: i64) -> Result<(), MachineError> {
        let index = self.index(address)?;
        self.words[index] = value;
        Ok(())
    }

    /// Words allocated so far.
    pub fn size(&self) -> usize {
        self.words.len()
    }
}

/// Operand stack with underflow reported against the current instruction.
#[derive(Debug, Default)]
pub struct Stack {
    words: Vec<i64>,
    pub pc: usize,
}

impl Stack {
    pub fn push(&mut self, value: i64) {
        self.words.push(value);
    }

    pub fn pop(&mut self) -> Result<i64, MachineError> {
        self.words
            .pop()
            .ok_or(MachineError::StackUnderflow { pc: self.pc })
    }

    pub fn top(&self) -> Result<i64, MachineError> {
        self.peek(0)
    }

    /// The word `depth` slots below the top.
    pub fn peek(&self, depth: usize) -> Result<i64, MachineError> {
        self.index_from_top(depth).map(|i| self.words[i])
    }

    pub fn poke(&mut self, depth: usize, value: i64) -> Result<(), MachineError> {
        let index = self.index_from_top(depth)?;
        self.words[index] = value;
        Ok(())
    }

    fn index_from_top(&self, depth: usize) -> Result<usize, MachineError> {
        self.words
            .len()
            .checked_sub(depth + 1)
            .ok_or(MachineError::StackUnderflow { pc: self.pc })
    }

    pub fn get(&self, index: usize) -> Result<i64, MachineError> {
        self.words
            .get(index)
            .copied()
            .ok_or(MachineError::StackUnderflow { pc: self.pc })
    }

    pub fn set(&mut self, index: usize, value: i64) -> Result<(), MachineError> {
        match self.words.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(MachineError::StackUnderflow { pc: self.pc }),
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.words.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Drop `count` words under the top one.
    pub fn slide(&mut self, count: usize) -> Result<(), MachineError> {
        let top = self.pop()?;
        let len = self
            .words
            .len()
            .checked_sub(count)
            .ok_or(MachineError::StackUnderflow { pc: self.pc })?;
        self.words.truncate(len);
        self.words.push(top);
        Ok(())
    }
}

/// Step counter shared by the interpreter loops.
pub struct Fuel {
    remaining: u64,
    limit: u64,
}

impl Fuel {
    pub fn new(limits: Limits) -> Self {
        Self {
            remaining: limits.max_steps,
            limit: limits.max_steps,
        }
    }

    pub fn burn(&mut self) -> Result<(), MachineError> {
        if self.remaining == 0 {
            return Err(MachineError::StepLimit { limit: self.limit });
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Word arithmetic as the lowered code performs it.
pub fn binary(op: BinaryOp, lhs: i64, rhs: i64) -> Result<i64, MachineError> {
    let value = match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div => {
            if rhs == 0 {
                return Err(MachineError::DivisionByZero);
            }
            lhs.checked_div(rhs).ok_or(MachineError::Overflow)?
        }
        BinaryOp::Lt => (lhs < rhs) as i64,
        BinaryOp::Gt => (lhs > rhs) as i64,
        BinaryOp::Le => (lhs <= rhs) as i64,
        BinaryOp::Ge => (lhs >= rhs) as i64,
        BinaryOp::Eq => (lhs == rhs) as i64,
        BinaryOp::Ne => (lhs != rhs) as i64,
        BinaryOp::And => (lhs != 0 && rhs != 0) as i64,
        BinaryOp::Or => (lhs != 0 || rhs != 0) as i64,
    };
    Ok(value)
}

pub fn unary(op: UnaryOp, operand: i64) -> i64 {
    match op {
        UnaryOp::Neg => operand.wrapping_neg(),
        UnaryOp::Not => (operand == 0) as i64,
    }
}

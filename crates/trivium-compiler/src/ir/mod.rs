//! Shared IR structure
//!
//! Each machine has its own instruction enum; they all plug into the same
//! [`Program`] container, lambda-body table, label checking and text
//! output.

pub mod control;
pub mod pretty;

use crate::error::{CompileError, CompileResult};
use crate::labels::Label;
use crate::machine::Machine;
use crate::scope::Binding;
use rustc_hash::FxHashMap;
use std::fmt;
use trivium_parser::ast::{BinaryOp, UnaryOp};

pub use control::Structured;
pub use pretty::PrettyPrint;

/// Operand of `loadc`: a word, or the code address of a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Const {
    Int(i64),
    Addr(Label),
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(n) => write!(f, "{}", n),
            Const::Addr(label) => write!(f, "{}", label),
        }
    }
}

impl From<i64> for Const {
    fn from(n: i64) -> Self {
        Const::Int(n)
    }
}

pub fn binop_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Lt => "le",
        BinaryOp::Gt => "gr",
        BinaryOp::Le => "leq",
        BinaryOp::Ge => "geq",
        BinaryOp::Eq => "eq",
        BinaryOp::Ne => "neq",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

pub fn unop_mnemonic(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "neg",
        UnaryOp::Not => "not",
    }
}

/// Behaviour every machine instruction provides.
pub trait Instruction: fmt::Display + fmt::Debug + Clone {
    fn mnemonic(&self) -> &'static str;

    fn operands(&self) -> Vec<String>;

    /// The label this instruction defines, for `label` pseudo-instructions.
    fn defines(&self) -> Option<&Label>;

    /// The label this instruction transfers control to or takes the address of.
    fn references(&self) -> Option<&Label>;

    /// Net words pushed (negative when popping), where fixed.
    fn stack_effect(&self) -> i64;
}

/// `Display` body shared by the instruction enums: `mnemonic op op`, or
/// `name:` for labels.
pub(crate) fn fmt_instruction<I: Instruction>(instr: &I, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(label) = instr.defines() {
        return write!(f, "{}:", label);
    }
    let operands = instr.operands();
    if operands.is_empty() {
        f.write_str(instr.mnemonic())
    } else {
        write!(f, "{} {}", instr.mnemonic(), operands.join(" "))
    }
}

/// An out-of-line function body.
#[derive(Debug, Clone)]
pub struct LambdaBody<I> {
    pub label: Label,
    pub params: Vec<String>,
    /// Captured names, in closure-vector order.
    pub captures: Vec<String>,
    pub code: Vec<I>,
}

/// Lambda bodies in registration order.
#[derive(Debug, Clone)]
pub struct LambdaTable<I> {
    bodies: Vec<LambdaBody<I>>,
}

impl<I> Default for LambdaTable<I> {
    fn default() -> Self {
        Self { bodies: Vec::new() }
    }
}

impl<I> LambdaTable<I> {
    pub fn register(&mut self, body: LambdaBody<I>) -> CompileResult<()> {
        if self.get(&body.label).is_some() {
            return Err(CompileError::internal(format!(
                "lambda body {} registered twice",
                body.label
            )));
        }
        self.bodies.push(body);
        Ok(())
    }

    pub fn get(&self, label: &Label) -> Option<&LambdaBody<I>> {
        self.bodies.iter().find(|body| &body.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LambdaBody<I>> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// Output of one IR generation pass.
#[derive(Debug, Clone)]
pub struct Program<I> {
    pub machine: Machine,
    /// Entry-point instruction stream.
    pub code: Vec<I>,
    pub lambdas: LambdaTable<I>,
    /// Global bindings in address order.
    pub globals: Vec<Binding>,
}

impl<I: Instruction> Program<I> {
    /// Bytes reserved for globals.
    pub fn global_space(&self) -> i64 {
        self.globals.iter().map(|g| g.size).sum()
    }

    pub fn instruction_count(&self) -> usize {
        self.code.len() + self.lambdas.iter().map(|b| b.code.len()).sum::<usize>()
    }

    /// Every instruction, lambda bodies included.
    pub fn instructions(&self) -> impl Iterator<Item = &I> {
        self.code
            .iter()
            .chain(self.lambdas.iter().flat_map(|b| b.code.iter()))
    }

    /// Check that every label is defined exactly once and every referenced
    /// label is defined.
    pub fn check_labels(&self) -> CompileResult<()> {
        let mut defined: FxHashMap<&Label, usize> = FxHashMap::default();
        let definitions = self
            .instructions()
            .filter_map(|instr| instr.defines())
            .chain(self.lambdas.iter().map(|b| &b.label));
        for label in definitions {
            *defined.entry(label).or_insert(0) += 1;
        }

        if let Some((label, _)) = defined.iter().find(|(_, count)| **count > 1) {
            return Err(CompileError::internal(format!(
                "label {} is defined more than once",
                label
            )));
        }
        for label in self.instructions().filter_map(|instr| instr.references()) {
            if !defined.contains_key(label) {
                return Err(CompileError::internal(format!(
                    "label {} is referenced but never defined",
                    label
                )));
            }
        }
        Ok(())
    }
}

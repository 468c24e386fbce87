//! Target machine selection
//!
//! The three machines share the AST, the scope table and the session, but
//! their activation records differ, so each one is a separate
//! [`Backend`] picked once per compilation.

use crate::asm::AsmBuffer;
use crate::error::CompileResult;
use crate::ir::{Instruction, Program};
use crate::session::Session;
use crate::sim::{Limits, MachineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trivium_parser::ast::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Machine {
    /// First-order stack machine with frame-relative slots
    #[default]
    Stack,
    /// Closures as heap records, captured values copied into a globals vector
    Closure,
    /// Every value in a heap cell, bindings through indirection cells
    Vector,
}

impl Machine {
    pub const ALL: [Machine; 3] = [Machine::Stack, Machine::Closure, Machine::Vector];

    pub fn name(self) -> &'static str {
        match self {
            Machine::Stack => "stack",
            Machine::Closure => "closure",
            Machine::Vector => "vector",
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Machine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Machine::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown machine `{}` (expected stack, closure or vector)", s))
    }
}

/// One target machine: IR generation, lowering to NASM and an IR simulator.
pub trait Backend {
    type Instr: Instruction;

    const MACHINE: Machine;

    /// C runtime symbols the lowered code calls.
    const EXTERNS: &'static [&'static str];

    fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<Self::Instr>>;

    fn lower(instr: &Self::Instr, asm: &mut AsmBuffer);

    fn prologue(program: &Program<Self::Instr>, asm: &mut AsmBuffer);

    /// Runs with the program's result on top of the operand stack.
    fn epilogue(program: &Program<Self::Instr>, asm: &mut AsmBuffer);

    fn simulate(program: &Program<Self::Instr>, limits: Limits) -> Result<i64, MachineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_names_round_trip() {
        for machine in Machine::ALL {
            assert_eq!(machine.name().parse::<Machine>(), Ok(machine));
        }
        assert!("cma".parse::<Machine>().is_err());
    }
}

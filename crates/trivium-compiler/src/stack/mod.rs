//! First-order stack machine
//!
//! Procedures are defined inline behind a jump and called through their
//! address; they see globals, their formals and their own locals only.

pub mod gen;
pub mod instr;
pub mod lower;
pub mod sim;

pub use instr::StackInstr;

use crate::asm::AsmBuffer;
use crate::error::CompileResult;
use crate::ir::Program;
use crate::machine::{Backend, Machine};
use crate::session::Session;
use crate::sim::{Limits, MachineError};
use trivium_parser::ast::Expr;

pub struct StackMachine;

impl Backend for StackMachine {
    type Instr = StackInstr;

    const MACHINE: Machine = Machine::Stack;
    const EXTERNS: &'static [&'static str] = &["printf"];

    fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<StackInstr>> {
        gen::generate(expr, session)
    }

    fn lower(instr: &StackInstr, asm: &mut AsmBuffer) {
        lower::lower(instr, asm)
    }

    fn prologue(program: &Program<StackInstr>, asm: &mut AsmBuffer) {
        lower::prologue(program, asm)
    }

    fn epilogue(program: &Program<StackInstr>, asm: &mut AsmBuffer) {
        lower::epilogue(program, asm)
    }

    fn simulate(program: &Program<StackInstr>, limits: Limits) -> Result<i64, MachineError> {
        sim::simulate(program, limits)
    }
}

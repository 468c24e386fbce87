//! Closure machine
//!
//! Functions are first-class: a closure pairs a code label with a vector of
//! captured values, and entering it makes that vector the globals of the
//! call. Globals live in heap cells that every closure shares. Other
//! captures are copies, so a function sees the values its enclosing locals
//! had when it was created.

pub mod gen;
pub mod instr;
pub mod lower;
pub mod sim;

pub use instr::ClosureInstr;

use crate::asm::AsmBuffer;
use crate::error::CompileResult;
use crate::ir::Program;
use crate::machine::{Backend, Machine};
use crate::session::Session;
use crate::sim::{Limits, MachineError};
use trivium_parser::ast::Expr;

pub struct ClosureMachine;

impl Backend for ClosureMachine {
    type Instr = ClosureInstr;

    const MACHINE: Machine = Machine::Closure;
    const EXTERNS: &'static [&'static str] = &["printf", "malloc"];

    fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<ClosureInstr>> {
        gen::generate(expr, session)
    }

    fn lower(instr: &ClosureInstr, asm: &mut AsmBuffer) {
        lower::lower(instr, asm)
    }

    fn prologue(program: &Program<ClosureInstr>, asm: &mut AsmBuffer) {
        lower::prologue(program, asm)
    }

    fn epilogue(program: &Program<ClosureInstr>, asm: &mut AsmBuffer) {
        lower::epilogue(program, asm)
    }

    fn simulate(program: &Program<ClosureInstr>, limits: Limits) -> Result<i64, MachineError> {
        sim::simulate(program, limits)
    }
}

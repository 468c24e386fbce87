//! Vector machine
//!
//! Every value lives in a heap cell that records what it holds, and
//! variables are those cells. Closures capture the cells themselves, so
//! an assignment made after a function was created is visible inside it.
//! Calls pass their arguments as one vector and name the return point
//! through another.

pub mod gen;
pub mod instr;
pub mod lower;
pub mod sim;

pub use instr::{Tag, VectorInstr};

use crate::asm::AsmBuffer;
use crate::error::CompileResult;
use crate::ir::Program;
use crate::machine::{Backend, Machine};
use crate::session::Session;
use crate::sim::{Limits, MachineError};
use trivium_parser::ast::Expr;

pub struct VectorMachine;

impl Backend for VectorMachine {
    type Instr = VectorInstr;

    const MACHINE: Machine = Machine::Vector;
    const EXTERNS: &'static [&'static str] = &["printf", "malloc"];

    fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<VectorInstr>> {
        gen::generate(expr, session)
    }

    fn lower(instr: &VectorInstr, asm: &mut AsmBuffer) {
        lower::lower(instr, asm)
    }

    fn prologue(program: &Program<VectorInstr>, asm: &mut AsmBuffer) {
        lower::prologue(program, asm)
    }

    fn epilogue(program: &Program<VectorInstr>, asm: &mut AsmBuffer) {
        lower::epilogue(program, asm)
    }

    fn simulate(program: &Program<VectorInstr>, limits: Limits) -> Result<i64, MachineError> {
        sim::simulate(program, limits)
    }
}

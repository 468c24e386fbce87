//! Trivium compiler
//!
//! Lowers a trivium AST to x86-64 NASM through one of three abstract
//! machines: a first-order stack machine, a closure machine and a vector
//! machine. Each machine has its own IR, generator, lowering pass and IR
//! simulator; the scope table, free-variable analysis, labels and the
//! program assembler are shared.

pub mod asm;
pub mod closure;
pub mod config;
pub mod error;
pub mod free_vars;
pub mod ir;
pub mod labels;
pub mod machine;
pub mod pipeline;
pub mod scope;
pub mod session;
pub mod sim;
pub mod stack;
pub mod toolchain;
pub mod vector;

pub use closure::ClosureMachine;
pub use config::{CompilerConfig, Config, ConfigError};
pub use error::{CompileError, CompileResult};
pub use ir::{PrettyPrint, Program};
pub use machine::{Backend, Machine};
pub use pipeline::{Pipeline, Stage};
pub use session::Session;
pub use sim::{Limits, MachineError};
pub use stack::StackMachine;
pub use toolchain::Toolchain;
pub use vector::VectorMachine;

use closure::ClosureInstr;
use scope::Binding;
use stack::StackInstr;
use trivium_parser::ast::Expr;
use vector::VectorInstr;

/// IR for one of the three machines.
#[derive(Debug, Clone)]
pub enum CompiledProgram {
    Stack(Program<StackInstr>),
    Closure(Program<ClosureInstr>),
    Vector(Program<VectorInstr>),
}

impl CompiledProgram {
    pub fn machine(&self) -> Machine {
        match self {
            CompiledProgram::Stack(_) => Machine::Stack,
            CompiledProgram::Closure(_) => Machine::Closure,
            CompiledProgram::Vector(_) => Machine::Vector,
        }
    }

    pub fn pretty_print(&self) -> String {
        match self {
            CompiledProgram::Stack(program) => program.pretty_print(),
            CompiledProgram::Closure(program) => program.pretty_print(),
            CompiledProgram::Vector(program) => program.pretty_print(),
        }
    }

    /// Complete NASM translation unit.
    pub fn assemble(&self) -> String {
        match self {
            CompiledProgram::Stack(program) => asm::assemble::<StackMachine>(program),
            CompiledProgram::Closure(program) => asm::assemble::<ClosureMachine>(program),
            CompiledProgram::Vector(program) => asm::assemble::<VectorMachine>(program),
        }
    }

    /// Run the IR on the machine's simulator and return the value the
    /// executable would print.
    pub fn simulate(&self, limits: Limits) -> Result<i64, MachineError> {
        match self {
            CompiledProgram::Stack(program) => StackMachine::simulate(program, limits),
            CompiledProgram::Closure(program) => ClosureMachine::simulate(program, limits),
            CompiledProgram::Vector(program) => VectorMachine::simulate(program, limits),
        }
    }

    pub fn instruction_count(&self) -> usize {
        match self {
            CompiledProgram::Stack(program) => program.instruction_count(),
            CompiledProgram::Closure(program) => program.instruction_count(),
            CompiledProgram::Vector(program) => program.instruction_count(),
        }
    }

    pub fn globals(&self) -> &[Binding] {
        match self {
            CompiledProgram::Stack(program) => &program.globals,
            CompiledProgram::Closure(program) => &program.globals,
            CompiledProgram::Vector(program) => &program.globals,
        }
    }
}

/// Main compiler entry point
pub struct Compiler {
    machine: Machine,
}

impl Compiler {
    pub fn new(machine: Machine) -> Self {
        Self { machine }
    }

    /// Generate IR in a fresh session
    pub fn compile(&self, expr: &Expr) -> CompileResult<CompiledProgram> {
        match self.machine {
            Machine::Stack => generate::<StackMachine>(expr).map(CompiledProgram::Stack),
            Machine::Closure => generate::<ClosureMachine>(expr).map(CompiledProgram::Closure),
            Machine::Vector => generate::<VectorMachine>(expr).map(CompiledProgram::Vector),
        }
    }
}

pub fn compile(expr: &Expr, machine: Machine) -> CompileResult<CompiledProgram> {
    Compiler::new(machine).compile(expr)
}

fn generate<B: Backend>(expr: &Expr) -> CompileResult<Program<B::Instr>> {
    let mut session = Session::new();
    let program = B::generate(expr, &mut session)?;
    program.check_labels()?;
    tracing::debug!(
        machine = %B::MACHINE,
        instructions = program.instruction_count(),
        lambdas = program.lambdas.len(),
        globals = program.globals.len(),
        labels = session.labels.issued(),
        "generated IR"
    );
    Ok(program)
}

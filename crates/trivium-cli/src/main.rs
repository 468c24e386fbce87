//! Trivium command-line driver
//!
//! Parses a source file and drives it through the compiler: print the AST
//! or the IR, run the IR on a simulator, or build assembly, an object file
//! or an executable.

mod commands;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use trivium_compiler::{Machine, Stage};

#[derive(Parser)]
#[command(name = "trivium")]
#[command(about = "Trivium compiler for the stack, closure and vector machines", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// When to color diagnostics
    #[arg(long, global = true, value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a program to IR, assembly, an object file or an executable
    Compile {
        /// Source file
        file: PathBuf,
        /// Output path (`-` for stdout with a text stage)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Target machine
        #[arg(long = "vm", value_enum)]
        machine: Option<MachineArg>,
        /// Output stage; inferred from the output name when omitted
        #[arg(long, value_enum)]
        emit: Option<StageArg>,
        /// Keep the .s and .o files
        #[arg(long)]
        keep_intermediates: bool,
        /// Configuration file (default: ./trivium.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the IR of a program
    Ir {
        /// Source file
        file: PathBuf,
        /// Target machine
        #[arg(long = "vm", value_enum)]
        machine: Option<MachineArg>,
    },

    /// Print the syntax tree of a program
    Parse {
        /// Source file
        file: PathBuf,
        /// Print JSON instead of the debug form
        #[arg(long)]
        json: bool,
    },

    /// Run a program on the IR simulator and print its result
    Eval {
        /// Source file
        file: PathBuf,
        /// Target machine
        #[arg(long = "vm", value_enum)]
        machine: Option<MachineArg>,
        /// Abort after this many instructions
        #[arg(long, default_value_t = 5_000_000)]
        max_steps: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MachineArg {
    Stack,
    Closure,
    Vector,
}

impl From<MachineArg> for Machine {
    fn from(arg: MachineArg) -> Self {
        match arg {
            MachineArg::Stack => Machine::Stack,
            MachineArg::Closure => Machine::Closure,
            MachineArg::Vector => Machine::Vector,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    Ir,
    Asm,
    Obj,
    Exe,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Ir => Stage::Ir,
            StageArg::Asm => Stage::Asm,
            StageArg::Obj => Stage::Obj,
            StageArg::Exe => Stage::Exe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            file,
            output,
            machine,
            emit,
            keep_intermediates,
            config,
        } => commands::compile::execute(commands::compile::CompileArgs {
            file,
            output,
            machine: machine.map(Machine::from),
            emit: emit.map(Stage::from),
            keep_intermediates,
            config,
        }),

        Commands::Ir { file, machine } => {
            commands::ir::execute(&file, machine.map(Machine::from))
        }

        Commands::Parse { file, json } => commands::parse::execute(&file, json),

        Commands::Eval {
            file,
            machine,
            max_steps,
        } => commands::eval::execute(&file, machine.map(Machine::from), max_steps),
    };

    if let Err(e) = result {
        output::report_error(&e, output::resolve_color_choice(cli.color));
        std::process::exit(1);
    }
}

//! Compile pipeline
//!
//! Runs a program through as many stages as the requested output needs:
//! IR text, assembly text, object file, executable.

use crate::error::{CompileError, CompileResult};
use crate::machine::Machine;
use crate::toolchain::Toolchain;
use crate::{compile, CompiledProgram};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use trivium_parser::ast::Expr;

/// How far to take a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ir,
    Asm,
    Obj,
    #[default]
    Exe,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Ir, Stage::Asm, Stage::Obj, Stage::Exe];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Ir => "ir",
            Stage::Asm => "asm",
            Stage::Obj => "obj",
            Stage::Exe => "exe",
        }
    }

    /// Stage implied by an output file name.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ir") => Stage::Ir,
            Some("s") | Some("asm") => Stage::Asm,
            Some("o") => Stage::Obj,
            _ => Stage::Exe,
        }
    }

    /// IR and assembly can go to stdout.
    pub fn is_text(self) -> bool {
        matches!(self, Stage::Ir | Stage::Asm)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| format!("unknown stage `{}` (expected ir, asm, obj or exe)", s))
    }
}

pub struct Pipeline {
    machine: Machine,
    toolchain: Toolchain,
}

impl Pipeline {
    pub fn new(machine: Machine, toolchain: Toolchain) -> Self {
        Self { machine, toolchain }
    }

    pub fn machine(&self) -> Machine {
        self.machine
    }

    /// Text of a text stage.
    pub fn render(&self, expr: &Expr, stage: Stage) -> CompileResult<String> {
        let program = compile(expr, self.machine)?;
        match stage {
            Stage::Ir => Ok(program.pretty_print()),
            Stage::Asm => Ok(program.assemble()),
            Stage::Obj | Stage::Exe => Err(CompileError::internal(format!(
                "stage {} produces a binary file, not text",
                stage
            ))),
        }
    }

    /// Write `stage` of the program to `output`.
    pub fn run(&self, expr: &Expr, stage: Stage, output: &Path) -> CompileResult<()> {
        let program = compile(expr, self.machine)?;
        match stage {
            Stage::Ir => write(output, &program.pretty_print()),
            Stage::Asm => write(output, &program.assemble()),
            Stage::Obj => {
                let source = intermediate(output, "s");
                let result = self.object(&program, &source, output);
                self.clean_up(&[&source]);
                result
            }
            Stage::Exe => {
                let source = intermediate(output, "s");
                let object = intermediate(output, "o");
                let result = self
                    .object(&program, &source, &object)
                    .and_then(|()| self.toolchain.link(&object, output));
                self.clean_up(&[&source, &object]);
                result
            }
        }
    }

    fn object(&self, program: &CompiledProgram, source: &Path, object: &Path) -> CompileResult<()> {
        write(source, &program.assemble())?;
        self.toolchain.assemble(source, object)
    }

    fn clean_up(&self, intermediates: &[&Path]) {
        if self.toolchain.keep_intermediates {
            return;
        }
        for path in intermediates {
            if let Err(e) = fs::remove_file(path) {
                tracing::debug!(path = %path.display(), error = %e, "intermediate not removed");
            }
        }
    }
}

fn write(path: &Path, text: &str) -> CompileResult<()> {
    fs::write(path, text).map_err(|e| CompileError::io(path, e))
}

/// `prog` → `prog.s`; an output that already has the extension gets it twice.
fn intermediate(output: &Path, extension: &str) -> PathBuf {
    let path = output.with_extension(extension);
    if path == output {
        output.with_extension(format!("{}.{}", extension, extension))
    } else {
        path
    }
}

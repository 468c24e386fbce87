//! External assembler and linker
//!
//! Both tools run as blocking subprocesses. A tool that cannot be started
//! or exits non-zero stops the pipeline with
//! [`CompileError::ExternalToolFailure`].

use crate::error::{CompileError, CompileResult};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

/// Programs used for the object and executable stages (`[toolchain]`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toolchain {
    /// NASM-compatible assembler (default: "nasm")
    #[serde(default = "default_assembler")]
    pub assembler: String,

    /// C compiler driver used to link against libc (default: "gcc")
    #[serde(default = "default_linker")]
    pub linker: String,

    /// Leave the `.s` and `.o` files next to the output
    #[serde(default)]
    pub keep_intermediates: bool,
}

fn default_assembler() -> String {
    "nasm".to_string()
}

fn default_linker() -> String {
    "gcc".to_string()
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            assembler: default_assembler(),
            linker: default_linker(),
            keep_intermediates: false,
        }
    }
}

impl Toolchain {
    /// `nasm -g -F dwarf -f elf64 -o <object> <source>`
    pub fn assemble(&self, source: &Path, object: &Path) -> CompileResult<()> {
        let args: [&OsStr; 8] = [
            OsStr::new("-g"),
            OsStr::new("-F"),
            OsStr::new("dwarf"),
            OsStr::new("-f"),
            OsStr::new("elf64"),
            OsStr::new("-o"),
            object.as_os_str(),
            source.as_os_str(),
        ];
        run(&self.assembler, &args)
    }

    /// `gcc -g -z noexecstack -no-pie -o <executable> <object>`
    pub fn link(&self, object: &Path, executable: &Path) -> CompileResult<()> {
        let args: [&OsStr; 7] = [
            OsStr::new("-g"),
            OsStr::new("-z"),
            OsStr::new("noexecstack"),
            OsStr::new("-no-pie"),
            OsStr::new("-o"),
            executable.as_os_str(),
            object.as_os_str(),
        ];
        run(&self.linker, &args)
    }
}

fn run(program: &str, args: &[&OsStr]) -> CompileResult<()> {
    tracing::info!(tool = program, ?args, "running");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CompileError::ExternalToolFailure {
            tool: program.to_string(),
            status: "not started".to_string(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(CompileError::ExternalToolFailure {
        tool: program.to_string(),
        status: output.status.to_string(),
        detail: stderr.trim().to_string(),
    })
}

//! `trivium ir`: print the IR of a program.

use super::{load_config, read_program};
use std::path::Path;
use trivium_compiler::{compile, Machine};

pub fn execute(file: &Path, machine: Option<Machine>) -> anyhow::Result<()> {
    let machine = match machine {
        Some(machine) => machine,
        None => load_config(None)?.compiler.machine,
    };
    let expr = read_program(file)?;
    let program = compile(&expr, machine)?;
    print!("{}", program.pretty_print());
    Ok(())
}

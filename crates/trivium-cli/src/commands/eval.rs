//! `trivium eval`: run a program on the IR simulator.

use super::{load_config, read_program};
use anyhow::Context;
use std::path::Path;
use trivium_compiler::{compile, Limits, Machine};

pub fn execute(file: &Path, machine: Option<Machine>, max_steps: u64) -> anyhow::Result<()> {
    let machine = match machine {
        Some(machine) => machine,
        None => load_config(None)?.compiler.machine,
    };
    let expr = read_program(file)?;
    let program = compile(&expr, machine)?;
    let value = program
        .simulate(Limits { max_steps })
        .with_context(|| format!("{} machine stopped", machine))?;
    println!("{}", value);
    Ok(())
}

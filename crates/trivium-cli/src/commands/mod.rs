//! Subcommand implementations

pub mod compile;
pub mod eval;
pub mod ir;
pub mod parse;

use anyhow::Context;
use std::path::Path;
use trivium_compiler::Config;
use trivium_parser::Expr;

/// Read and parse a source file.
pub fn read_program(path: &Path) -> anyhow::Result<Expr> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let expr = trivium_parser::parse(&source)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    tracing::debug!(file = %path.display(), root = expr.kind_name(), "parsed");
    Ok(expr)
}

/// `--config` when given, otherwise `trivium.toml` in the working directory.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => Config::from_file(path)?,
        None => {
            let dir = std::env::current_dir().context("cannot determine the working directory")?;
            Config::discover(&dir)?
        }
    };
    Ok(config)
}

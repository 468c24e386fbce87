//! `trivium parse`: print the syntax tree.

use super::read_program;
use anyhow::Context;
use std::path::Path;

pub fn execute(file: &Path, json: bool) -> anyhow::Result<()> {
    let expr = read_program(file)?;
    if json {
        let text = serde_json::to_string_pretty(&expr).context("cannot serialize the syntax tree")?;
        println!("{}", text);
    } else {
        println!("{:#?}", expr);
    }
    Ok(())
}

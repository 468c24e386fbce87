//! Pretty-printing for IR
//!
//! Same column layout as the assembly output: `label:` lines on their own,
//! instructions in the mnemonic column.

use super::{Instruction, Program};
use crate::asm::format::format_line;
use crate::asm::AsmLine;
use std::fmt::Write;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

fn as_line<I: Instruction>(instr: &I) -> AsmLine {
    match instr.defines() {
        Some(label) => AsmLine::Label(label.to_string()),
        None => AsmLine::Instr {
            mnemonic: instr.mnemonic().to_string(),
            operands: instr.operands(),
            comment: None,
        },
    }
}

fn write_stream<I: Instruction>(output: &mut String, code: &[I]) {
    for instr in code {
        let _ = writeln!(output, "{}", format_line(&as_line(instr)));
    }
}

impl<I: Instruction> PrettyPrint for Program<I> {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "; {} machine", self.machine);
        if !self.globals.is_empty() {
            let globals: Vec<String> = self
                .globals
                .iter()
                .map(|g| format!("{}@{}", g.name, g.address))
                .collect();
            let _ = writeln!(output, "; globals: {}", globals.join(", "));
        }

        for body in self.lambdas.iter() {
            let _ = writeln!(output);
            let _ = writeln!(
                output,
                "; ({}) captures [{}]",
                body.params.join(", "),
                body.captures.join(", ")
            );
            let _ = writeln!(output, "{}:", body.label);
            write_stream(&mut output, &body.code);
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "main:");
        write_stream(&mut output, &self.code);
        output
    }
}

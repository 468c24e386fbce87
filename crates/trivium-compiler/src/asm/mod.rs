//! x86-64 NASM output
//!
//! Lowering passes append [`AsmLine`]s to an [`AsmBuffer`]; the buffer is
//! rendered once with aligned columns.

pub mod assemble;
pub mod format;
pub mod templates;

pub use assemble::assemble;
pub use format::{format_line, render};

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmLine {
    Label(String),
    Instr {
        mnemonic: String,
        operands: Vec<String>,
        comment: Option<String>,
    },
    /// `;;;` line echoing the IR instruction that follows
    Comment(String),
    /// Written at column 0 as is (`extern`, `SECTION`, data)
    Directive(String),
    Blank,
}

#[derive(Debug, Default)]
pub struct AsmBuffer {
    lines: Vec<AsmLine>,
}

impl AsmBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&mut self, name: impl Display) {
        self.lines.push(AsmLine::Label(name.to_string()));
    }

    /// Append an instruction; `operands` is comma separated.
    pub fn op(&mut self, mnemonic: &str, operands: &str) {
        self.push_instr(mnemonic, operands, None);
    }

    pub fn op_commented(&mut self, mnemonic: &str, operands: &str, comment: &str) {
        self.push_instr(mnemonic, operands, Some(comment.to_string()));
    }

    fn push_instr(&mut self, mnemonic: &str, operands: &str, comment: Option<String>) {
        let operands = operands
            .split(',')
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .map(str::to_string)
            .collect();
        self.lines.push(AsmLine::Instr {
            mnemonic: mnemonic.to_string(),
            operands,
            comment,
        });
    }

    pub fn comment(&mut self, text: impl Display) {
        self.lines.push(AsmLine::Comment(text.to_string()));
    }

    pub fn directive(&mut self, text: impl Display) {
        self.lines.push(AsmLine::Directive(text.to_string()));
    }

    pub fn blank(&mut self) {
        self.lines.push(AsmLine::Blank);
    }

    pub fn lines(&self) -> &[AsmLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// `[base + offset]` / `[base - offset]`
pub fn mem(base: &str, offset: i64) -> String {
    match offset {
        0 => format!("[{}]", base),
        o if o > 0 => format!("[{} + {}]", base, o),
        o => format!("[{} - {}]", base, -o),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operands_are_split_and_trimmed() {
        let mut asm = AsmBuffer::new();
        asm.op("mov", "rax, qword [rsp + 8]");
        asm.op("ret", "");
        assert_eq!(
            asm.lines()[0],
            AsmLine::Instr {
                mnemonic: "mov".into(),
                operands: vec!["rax".into(), "qword [rsp + 8]".into()],
                comment: None,
            }
        );
        assert!(matches!(&asm.lines()[1], AsmLine::Instr { operands, .. } if operands.is_empty()));
    }

    #[test]
    fn test_mem_operand_sign() {
        assert_eq!(mem("rsp", 0), "[rsp]");
        assert_eq!(mem("rbp", 16), "[rbp + 16]");
        assert_eq!(mem("rbp", -24), "[rbp - 24]");
    }
}

//! Column layout for assembly and IR text
//!
//! Label field and mnemonic each take one tab stop, every operand but the
//! last takes one tab stop including its comma, and trailing comments
//! start at [`COMMENT_COLUMN`].

use super::AsmLine;

pub const TAB_WIDTH: usize = 8;
pub const COMMENT_COLUMN: usize = 40;

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

pub fn format_line(line: &AsmLine) -> String {
    match line {
        AsmLine::Label(name) => format!("{}:", name),
        AsmLine::Comment(text) => format!("{};;; {}", pad("", TAB_WIDTH), text),
        AsmLine::Directive(text) => text.clone(),
        AsmLine::Blank => String::new(),
        AsmLine::Instr {
            mnemonic,
            operands,
            comment,
        } => {
            let mut out = pad("", TAB_WIDTH);
            if operands.is_empty() {
                out.push_str(mnemonic);
            } else {
                out.push_str(&pad(mnemonic, TAB_WIDTH - 1));
                out.push(' ');
                let last = operands.len() - 1;
                for (i, operand) in operands.iter().enumerate() {
                    if i < last {
                        out.push_str(&pad(&format!("{},", operand), TAB_WIDTH));
                    } else {
                        out.push_str(operand);
                    }
                }
            }
            if let Some(comment) = comment {
                if out.len() < COMMENT_COLUMN {
                    out = pad(&out, COMMENT_COLUMN);
                } else {
                    out.push(' ');
                }
                out.push_str("; ");
                out.push_str(comment);
            }
            out
        }
    }
}

pub fn render(lines: &[AsmLine]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(&format_line(line));
        text.push('\n');
    }
    text
}

//! Structured control flow
//!
//! `if`, the loops and sequences lower to the same label/jump skeleton on
//! every machine. Each generator implements [`Structured`] and supplies the
//! operand code through closures, so only the skeleton lives here.

use super::Instruction;
use crate::error::{CompileError, CompileResult};
use crate::labels::Label;
use crate::session::Session;
use trivium_parser::ast::BinaryOp;

/// Instructions every machine has for building control flow.
pub trait ControlFlow: Instruction {
    fn loadc(value: i64) -> Self;
    fn pop() -> Self;
    fn dup() -> Self;
    fn swap() -> Self;
    fn dec() -> Self;
    fn binary(op: BinaryOp) -> Self;
    fn label(label: Label) -> Self;
    fn jump(target: Label) -> Self;
    fn jumpz(target: Label) -> Self;
}

/// A code generator that appends to an instruction stream.
pub trait Structured {
    type Instr: ControlFlow;

    fn session(&mut self) -> &mut Session;

    fn emit(&mut self, instr: Self::Instr);
}

/// `label if; cond; jumpz else; label then; then; jump endif; label else; else; label endif`
pub fn if_then_else<G: Structured>(
    g: &mut G,
    cond: impl FnOnce(&mut G) -> CompileResult<()>,
    then_branch: impl FnOnce(&mut G) -> CompileResult<()>,
    else_branch: impl FnOnce(&mut G) -> CompileResult<()>,
) -> CompileResult<()> {
    let [start, then_label, else_label, end] = g
        .session()
        .labels
        .fresh_group(["if", "then", "else", "endif"]);
    g.emit(G::Instr::label(start));
    cond(g)?;
    g.emit(G::Instr::jumpz(else_label.clone()));
    g.emit(G::Instr::label(then_label));
    then_branch(g)?;
    g.emit(G::Instr::jump(end.clone()));
    g.emit(G::Instr::label(else_label));
    else_branch(g)?;
    g.emit(G::Instr::label(end));
    Ok(())
}

/// The loop value starts as `neutral` and is replaced by each pass of `body`.
pub fn while_do<G: Structured>(
    g: &mut G,
    neutral: impl FnOnce(&mut G) -> CompileResult<()>,
    cond: impl FnOnce(&mut G) -> CompileResult<()>,
    body: impl FnOnce(&mut G) -> CompileResult<()>,
) -> CompileResult<()> {
    let [start, end] = g.session().labels.fresh_group(["while", "endwhile"]);
    neutral(g)?;
    g.emit(G::Instr::label(start.clone()));
    cond(g)?;
    g.emit(G::Instr::jumpz(end.clone()));
    g.emit(G::Instr::pop());
    body(g)?;
    g.emit(G::Instr::jump(start));
    g.emit(G::Instr::label(end));
    Ok(())
}

pub fn do_while<G: Structured>(
    g: &mut G,
    body: impl FnOnce(&mut G) -> CompileResult<()>,
    cond: impl FnOnce(&mut G) -> CompileResult<()>,
) -> CompileResult<()> {
    let [start, end] = g.session().labels.fresh_group(["dowhile", "enddowhile"]);
    g.emit(G::Instr::label(start.clone()));
    body(g)?;
    cond(g)?;
    g.emit(G::Instr::jumpz(end.clone()));
    g.emit(G::Instr::pop());
    g.emit(G::Instr::jump(start));
    g.emit(G::Instr::label(end));
    Ok(())
}

/// Counter sits under the loop value; `swap` brings it up for the test.
pub fn counted_loop<G: Structured>(
    g: &mut G,
    neutral: impl FnOnce(&mut G) -> CompileResult<()>,
    count: impl FnOnce(&mut G) -> CompileResult<()>,
    body: impl FnOnce(&mut G) -> CompileResult<()>,
) -> CompileResult<()> {
    let [start, end] = g.session().labels.fresh_group(["loop", "endloop"]);
    neutral(g)?;
    count(g)?;
    g.emit(G::Instr::label(start.clone()));
    g.emit(G::Instr::dup());
    g.emit(G::Instr::loadc(0));
    g.emit(G::Instr::binary(BinaryOp::Gt));
    g.emit(G::Instr::jumpz(end.clone()));
    g.emit(G::Instr::dec());
    g.emit(G::Instr::swap());
    g.emit(G::Instr::pop());
    body(g)?;
    g.emit(G::Instr::swap());
    g.emit(G::Instr::jump(start));
    g.emit(G::Instr::label(end));
    g.emit(G::Instr::pop());
    Ok(())
}

/// Every item but the last is generated by `discard` and dropped.
pub fn sequence<'e, G: Structured, E>(
    g: &mut G,
    items: &'e [E],
    mut discard: impl FnMut(&mut G, &'e E) -> CompileResult<()>,
    last: impl FnOnce(&mut G, &'e E) -> CompileResult<()>,
) -> CompileResult<()> {
    let Some((final_item, init)) = items.split_last() else {
        return Err(CompileError::internal("empty sequence"));
    };
    for item in init {
        discard(g, item)?;
        g.emit(G::Instr::pop());
    }
    last(g, final_item)
}

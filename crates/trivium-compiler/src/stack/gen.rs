//! Stack machine code generation
//!
//! `kp` is the number of words between the frame pointer and the top of
//! the stack when an expression starts; a local block allocated at `kp`
//! puts its first binding at `8 * (kp + 1)`.

use super::instr::StackInstr;
use crate::error::{CompileError, CompileResult};
use crate::free_vars::capture_set;
use crate::ir::control::{self, Structured};
use crate::ir::{Const, LambdaTable, Program};
use crate::machine::Machine;
use crate::scope::{Binding, ScopeId, ScopeKind, ScopeTable, WORD};
use crate::session::Session;
use trivium_parser::ast::{Binding as LocalBinding, Expr};

/// Frame offset of formal 0; it doubles as the result slot.
pub const FIRST_FORMAL: i64 = -2 * WORD;

pub fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<StackInstr>> {
    let mut gen = StackGenerator {
        session,
        scopes: ScopeTable::new(),
        code: Vec::new(),
    };
    let global = gen.scopes.global();
    gen.expr(expr, global, 0)?;
    Ok(Program {
        machine: Machine::Stack,
        code: gen.code,
        lambdas: LambdaTable::default(),
        globals: gen.scopes.globals(),
    })
}

struct StackGenerator<'s> {
    session: &'s mut Session,
    scopes: ScopeTable,
    code: Vec<StackInstr>,
}

impl Structured for StackGenerator<'_> {
    type Instr = StackInstr;

    fn session(&mut self) -> &mut Session {
        self.session
    }

    fn emit(&mut self, instr: StackInstr) {
        self.code.push(instr);
    }
}

impl StackGenerator<'_> {
    fn expr(&mut self, expr: &Expr, scope: ScopeId, kp: i64) -> CompileResult<()> {
        match expr {
            Expr::Number { value } => self.emit(StackInstr::Loadc(Const::Int(*value))),
            Expr::Bool { value } => self.emit(StackInstr::Loadc(Const::Int(*value as i64))),
            Expr::Var { name } => {
                let binding = self.scopes.lookup(scope, name)?.clone();
                self.address(&binding)?;
                self.emit(StackInstr::Load);
            }
            Expr::Unary { op, operand } => {
                self.expr(operand, scope, kp)?;
                self.emit(StackInstr::Unary(*op));
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs, scope, kp)?;
                self.expr(rhs, scope, kp + 1)?;
                self.emit(StackInstr::Binary(*op));
            }
            Expr::Assign { name, value } => {
                let binding =
                    self.scopes
                        .resolve_or_allocate(scope, name, &mut self.session.globals)?;
                self.expr(value, scope, kp)?;
                self.address(&binding)?;
                self.emit(StackInstr::Store);
            }
            Expr::Seq { items } => control::sequence(
                self,
                items,
                |g, item| g.expr(item, scope, kp),
                |g, item| g.expr(item, scope, kp),
            )?,
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => control::if_then_else(
                self,
                |g| g.expr(cond, scope, kp),
                |g| g.expr(then_branch, scope, kp),
                |g| match else_branch {
                    Some(else_branch) => g.expr(else_branch, scope, kp),
                    None => g.neutral(),
                },
            )?,
            Expr::While { cond, body } => control::while_do(
                self,
                |g| g.neutral(),
                |g| g.expr(cond, scope, kp + 1),
                |g| g.expr(body, scope, kp),
            )?,
            Expr::DoWhile { body, cond } => control::do_while(
                self,
                |g| g.expr(body, scope, kp),
                |g| g.expr(cond, scope, kp + 1),
            )?,
            Expr::Loop { count, body } => control::counted_loop(
                self,
                |g| g.neutral(),
                |g| g.expr(count, scope, kp + 1),
                |g| g.expr(body, scope, kp + 1),
            )?,
            Expr::Local { bindings, body } => self.local(bindings, body, scope, kp)?,
            Expr::Lambda { params, body } => self.procedure(params, &[], body, scope)?,
            Expr::Proc {
                params,
                locals,
                body,
            } => self.procedure(params, locals, body, scope)?,
            Expr::Call { callee, args } => self.call(callee, args, scope, kp)?,
        }
        Ok(())
    }

    fn neutral(&mut self) -> CompileResult<()> {
        self.emit(StackInstr::Loadc(Const::Int(0)));
        Ok(())
    }

    /// Push the VM address of a binding.
    fn address(&mut self, binding: &Binding) -> CompileResult<()> {
        match binding.kind {
            ScopeKind::Global => self.emit(StackInstr::Loadc(Const::Int(binding.address))),
            ScopeKind::Local | ScopeKind::Formal => {
                self.emit(StackInstr::Loadrc(binding.address))
            }
            ScopeKind::Captured => {
                return Err(CompileError::internal(format!(
                    "captured binding {} on the stack machine",
                    binding
                )))
            }
        }
        Ok(())
    }

    fn local(
        &mut self,
        bindings: &[LocalBinding],
        body: &Expr,
        scope: ScopeId,
        kp: i64,
    ) -> CompileResult<()> {
        let count = bindings.len() as i64;
        let inner = self
            .scopes
            .declare(scope, bindings.iter().map(|b| b.name.as_str()));
        for (i, binding) in bindings.iter().enumerate() {
            let offset = WORD * (kp + i as i64 + 1);
            self.scopes
                .bind(inner, Binding::new(&binding.name, ScopeKind::Local, offset))?;
        }

        self.emit(StackInstr::Alloc(WORD * count));
        for (i, binding) in bindings.iter().enumerate() {
            self.expr(&binding.value, inner, kp + count)?;
            self.emit(StackInstr::Loadrc(WORD * (kp + i as i64 + 1)));
            self.emit(StackInstr::Store);
            self.emit(StackInstr::Pop);
        }
        self.expr(body, inner, kp + count)?;
        self.emit(StackInstr::Slide {
            drop: WORD * count,
            keep: WORD,
        });
        Ok(())
    }

    /// Jump over the body, define it, then push its address.
    fn procedure(
        &mut self,
        params: &[String],
        locals: &[String],
        body: &Expr,
        scope: ScopeId,
    ) -> CompileResult<()> {
        let bound: Vec<String> = params.iter().chain(locals).cloned().collect();
        for name in capture_set(&bound, body) {
            if let Ok(binding) = self.scopes.lookup(scope, &name) {
                if binding.kind != ScopeKind::Global {
                    return Err(CompileError::UnsupportedConstruct {
                        construct: format!("closure capturing {} `{}`", binding.kind, name),
                        machine: Machine::Stack,
                    });
                }
            }
        }

        let [entry, end] = self.session.labels.fresh_group(["proc", "endproc"]);
        tracing::trace!(label = %entry, params = params.len(), locals = locals.len(), "procedure");

        let root = self.scopes.root(scope);
        let frame = self
            .scopes
            .declare(root, bound.iter().map(String::as_str));
        for (i, param) in params.iter().enumerate() {
            let offset = FIRST_FORMAL - WORD * i as i64;
            self.scopes
                .bind(frame, Binding::new(param, ScopeKind::Formal, offset))?;
        }
        for (j, local) in locals.iter().enumerate() {
            let offset = WORD * (j as i64 + 1);
            self.scopes
                .bind(frame, Binding::new(local, ScopeKind::Local, offset))?;
        }

        self.emit(StackInstr::Jump(end.clone()));
        self.emit(StackInstr::Label(entry.clone()));
        self.emit(StackInstr::Enter);
        if !locals.is_empty() {
            self.emit(StackInstr::Alloc(WORD * locals.len() as i64));
        }
        self.expr(body, frame, locals.len() as i64)?;
        self.emit(StackInstr::Loadrc(FIRST_FORMAL));
        self.emit(StackInstr::Store);
        self.emit(StackInstr::Pop);
        self.emit(StackInstr::Ret);
        self.emit(StackInstr::Label(end));
        self.emit(StackInstr::Loadc(Const::Addr(entry)));
        Ok(())
    }

    /// Arguments right to left, so formal 0 is nearest the frame and
    /// receives the result.
    fn call(&mut self, callee: &Expr, args: &[Expr], scope: ScopeId, kp: i64) -> CompileResult<()> {
        if args.is_empty() {
            self.neutral()?;
        }
        for (pushed, arg) in args.iter().rev().enumerate() {
            self.expr(arg, scope, kp + pushed as i64)?;
        }
        let slots = args.len().max(1) as i64;
        self.emit(StackInstr::Mark);
        self.expr(callee, scope, kp + slots + 1)?;
        self.emit(StackInstr::Call);
        self.emit(StackInstr::Pop);
        if slots > 1 {
            self.emit(StackInstr::Slide {
                drop: WORD * (slots - 1),
                keep: WORD,
            });
        }
        Ok(())
    }
}

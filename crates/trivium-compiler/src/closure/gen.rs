//! Closure machine code generation
//!
//! Addresses are stack depths: a binding at address `a` is read with
//! `pushloc (kp - a)`. Function bodies are generated in a fresh scope that
//! holds only their formals and their captured names.
//!
//! Each global lives in its own heap cell and the globals vector holds the
//! cell pointers. A lambda that mentions a global captures the pointer, so
//! every closure reads and writes the same cell.

use super::instr::{ClosureInstr, FRAME_WORDS};
use crate::error::{CompileError, CompileResult};
use crate::free_vars::{assigned_vars, capture_set, free_vars};
use crate::ir::control::{self, Structured};
use crate::ir::{Const, LambdaBody, LambdaTable, Program};
use crate::machine::Machine;
use crate::scope::{Binding, ScopeId, ScopeKind, ScopeTable};
use crate::session::Session;
use trivium_parser::ast::{Binding as LocalBinding, Expr};

pub fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<ClosureInstr>> {
    let mut gen = ClosureGenerator {
        session,
        scopes: ScopeTable::new(),
        code: Vec::new(),
        lambdas: LambdaTable::default(),
    };
    let global = gen.scopes.global();
    let assigned = assigned_vars(expr);
    let globals: Vec<String> = free_vars(expr)
        .into_iter()
        .filter(|name| assigned.contains(name))
        .collect();
    for (i, name) in globals.iter().enumerate() {
        gen.scopes
            .bind(global, Binding::new(name, ScopeKind::Global, i as i64))?;
    }
    gen.emit(ClosureInstr::Alloc(globals.len() as i64));
    gen.emit(ClosureInstr::Mkvec(globals.len() as i64));
    gen.emit(ClosureInstr::Setgp);
    gen.expr(expr, global, 0)?;

    Ok(Program {
        machine: Machine::Closure,
        code: gen.code,
        lambdas: gen.lambdas,
        globals: gen.scopes.globals(),
    })
}

struct ClosureGenerator<'s> {
    session: &'s mut Session,
    scopes: ScopeTable,
    code: Vec<ClosureInstr>,
    lambdas: LambdaTable<ClosureInstr>,
}

impl Structured for ClosureGenerator<'_> {
    type Instr = ClosureInstr;

    fn session(&mut self) -> &mut Session {
        self.session
    }

    fn emit(&mut self, instr: ClosureInstr) {
        self.code.push(instr);
    }
}

impl ClosureGenerator<'_> {
    fn expr(&mut self, expr: &Expr, scope: ScopeId, kp: i64) -> CompileResult<()> {
        match expr {
            Expr::Number { value } => self.emit(ClosureInstr::Loadc(Const::Int(*value))),
            Expr::Bool { value } => self.emit(ClosureInstr::Loadc(Const::Int(*value as i64))),
            Expr::Var { name } => self.var(name, scope, kp)?,
            Expr::Unary { op, operand } => {
                self.expr(operand, scope, kp)?;
                self.emit(ClosureInstr::Unary(*op));
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs, scope, kp)?;
                self.expr(rhs, scope, kp + 1)?;
                self.emit(ClosureInstr::Binary(*op));
            }
            Expr::Assign { name, value } => {
                let binding = self.scopes.lookup(scope, name)?.clone();
                if binding.kind == ScopeKind::Captured {
                    return Err(CompileError::UnsupportedConstruct {
                        construct: format!("assignment to captured variable `{}`", name),
                        machine: Machine::Closure,
                    });
                }
                self.expr(value, scope, kp)?;
                match binding.kind {
                    ScopeKind::Global => {
                        self.emit(ClosureInstr::Pushglob(binding.address));
                        self.emit(ClosureInstr::Store);
                    }
                    _ => self.emit(ClosureInstr::Storeloc(kp + 1 - binding.address)),
                }
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
            Expr::Lambda { params, body } => self.lambda(params, body, scope, kp)?,
            Expr::Proc {
                params,
                locals,
                body,
            } => {
                if locals.is_empty() {
                    self.lambda(params, body, scope, kp)?
                } else {
                    let body = Expr::local(
                        locals
                            .iter()
                            .map(|local| (local.as_str(), Expr::number(0)))
                            .collect(),
                        (**body).clone(),
                    );
                    self.lambda(params, &body, scope, kp)?
                }
            }
            Expr::Call { callee, args } => self.call(callee, args, scope, kp)?,
        }
        Ok(())
    }

    fn neutral(&mut self) -> CompileResult<()> {
        self.emit(ClosureInstr::Loadc(Const::Int(0)));
        Ok(())
    }

    fn var(&mut self, name: &str, scope: ScopeId, kp: i64) -> CompileResult<()> {
        let binding = self.scopes.lookup(scope, name)?.clone();
        match binding.kind {
            ScopeKind::Global => {
                self.emit(ClosureInstr::Pushglob(binding.address));
                self.emit(ClosureInstr::Load);
            }
            ScopeKind::Captured => self.emit(ClosureInstr::Pushglob(binding.address)),
            ScopeKind::Local | ScopeKind::Formal => {
                self.emit(ClosureInstr::Pushloc(kp - binding.address))
            }
        }
        Ok(())
    }

    /// One empty cell per binding first, so function bindings can refer to
    /// each other; `rewrite` fills a cell in place once its closure exists.
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
            self.scopes.bind(
                inner,
                Binding::new(&binding.name, ScopeKind::Local, kp + i as i64 + 1),
            )?;
        }

        self.emit(ClosureInstr::Alloc(count));
        for (i, binding) in bindings.iter().enumerate() {
            self.expr(&binding.value, inner, kp + count)?;
            let offset = count - i as i64;
            if matches!(binding.value, Expr::Lambda { .. } | Expr::Proc { .. }) {
                self.emit(ClosureInstr::Rewrite(offset));
            } else {
                self.emit(ClosureInstr::Storeloc(offset));
                self.emit(ClosureInstr::Pop);
            }
        }
        self.expr(body, inner, kp + count)?;
        self.emit(ClosureInstr::Slide(count));
        Ok(())
    }

    /// Copy the captured values into a vector, pair it with the body label
    /// and queue the body. Globals are captured as their cell pointers.
    fn lambda(
        &mut self,
        params: &[String],
        body: &Expr,
        scope: ScopeId,
        kp: i64,
    ) -> CompileResult<()> {
        let captures: Vec<String> = capture_set(params, body).into_iter().collect();
        let mut shared = Vec::with_capacity(captures.len());
        for (j, name) in captures.iter().enumerate() {
            let binding = self.scopes.lookup(scope, name)?.clone();
            if binding.kind == ScopeKind::Global {
                self.emit(ClosureInstr::Pushglob(binding.address));
            } else {
                self.var(name, scope, kp + j as i64)?;
            }
            shared.push(binding.kind == ScopeKind::Global);
        }
        let label = self.session.label("fun");
        self.emit(ClosureInstr::Mkvec(captures.len() as i64));
        self.emit(ClosureInstr::Mkfunval(label.clone()));

        let arity = params.len() as i64;
        let frame = self.scopes.detached(
            params
                .iter()
                .chain(captures.iter())
                .map(String::as_str),
        );
        for (j, (name, shared)) in captures.iter().zip(shared).enumerate() {
            let kind = if shared {
                ScopeKind::Global
            } else {
                ScopeKind::Captured
            };
            self.scopes.bind(frame, Binding::new(name, kind, j as i64))?;
        }
        for (i, param) in params.iter().enumerate() {
            let address = i as i64 - arity + 1;
            self.scopes
                .bind(frame, Binding::new(param, ScopeKind::Formal, address))?;
        }

        let outer = std::mem::take(&mut self.code);
        let generated = self.expr(body, frame, 0);
        let mut code = std::mem::replace(&mut self.code, outer);
        generated?;
        code.push(ClosureInstr::Popenv);

        tracing::trace!(label = %label, captures = captures.len(), "lambda body");
        self.lambdas.register(LambdaBody {
            label,
            params: params.to_vec(),
            captures,
            code,
        })
    }

    fn call(&mut self, callee: &Expr, args: &[Expr], scope: ScopeId, kp: i64) -> CompileResult<()> {
        let ret = self.session.label("ret");
        self.emit(ClosureInstr::Mark(ret.clone()));
        for (i, arg) in args.iter().enumerate() {
            self.expr(arg, scope, kp + FRAME_WORDS + i as i64)?;
        }
        self.expr(callee, scope, kp + FRAME_WORDS + args.len() as i64)?;
        self.emit(ClosureInstr::Apply(args.len() as i64));
        self.emit(ClosureInstr::Label(ret));
        Ok(())
    }
}

//! Vector machine code generation
//!
//! Three entry points per expression: [`Mode::Basic`] leaves a raw word,
//! [`Mode::Value`] leaves a fresh indirection cell holding the value, and
//! `storage` leaves a variable's own cell. Locals are addressed from the
//! frame pointer, so their addresses do not move with the stack top.

use super::instr::{Tag, VectorInstr};
use crate::error::CompileResult;
use crate::free_vars::{assigned_vars, capture_set, free_vars};
use crate::ir::control::{self, Structured};
use crate::ir::{Const, LambdaBody, LambdaTable, Program};
use crate::machine::Machine;
use crate::scope::{Binding, ScopeId, ScopeKind, ScopeTable};
use crate::session::Session;
use trivium_parser::ast::{Binding as LocalBinding, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Basic,
    Value,
}

pub fn generate(expr: &Expr, session: &mut Session) -> CompileResult<Program<VectorInstr>> {
    let mut gen = VectorGenerator {
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
    let count = globals.len() as i64;
    gen.emit(VectorInstr::Alloc(count));
    gen.emit(VectorInstr::Mkvec(count));
    gen.emit(VectorInstr::Setgp);
    gen.expr(expr, global, 0, Mode::Basic)?;

    Ok(Program {
        machine: Machine::Vector,
        code: gen.code,
        lambdas: gen.lambdas,
        globals: gen.scopes.globals(),
    })
}

struct VectorGenerator<'s> {
    session: &'s mut Session,
    scopes: ScopeTable,
    code: Vec<VectorInstr>,
    lambdas: LambdaTable<VectorInstr>,
}

impl Structured for VectorGenerator<'_> {
    type Instr = VectorInstr;

    fn session(&mut self) -> &mut Session {
        self.session
    }

    fn emit(&mut self, instr: VectorInstr) {
        self.code.push(instr);
    }
}

impl VectorGenerator<'_> {
    fn expr(&mut self, expr: &Expr, scope: ScopeId, kp: i64, mode: Mode) -> CompileResult<()> {
        match expr {
            Expr::Number { value } => {
                self.emit(VectorInstr::Loadc(Const::Int(*value)));
                self.boxed(mode);
            }
            Expr::Bool { value } => {
                self.emit(VectorInstr::Loadc(Const::Int(*value as i64)));
                self.boxed(mode);
            }
            Expr::Var { name } => {
                self.storage(name, scope)?;
                self.emit(match mode {
                    Mode::Basic => VectorInstr::Getbasic,
                    Mode::Value => VectorInstr::Copy,
                });
            }
            Expr::Unary { op, operand } => {
                self.expr(operand, scope, kp, Mode::Basic)?;
                self.emit(VectorInstr::Unary(*op));
                self.boxed(mode);
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs, scope, kp, Mode::Basic)?;
                self.expr(rhs, scope, kp + 1, Mode::Basic)?;
                self.emit(VectorInstr::Binary(*op));
                self.boxed(mode);
            }
            Expr::Assign { name, value } => {
                self.storage(name, scope)?;
                self.expr(value, scope, kp + 1, Mode::Value)?;
                self.emit(VectorInstr::Store);
                self.emit(match mode {
                    Mode::Basic => VectorInstr::Getbasic,
                    Mode::Value => VectorInstr::Copy,
                });
            }
            Expr::Seq { items } => control::sequence(
                self,
                items,
                |g, item| g.expr(item, scope, kp, Mode::Value),
                |g, item| g.expr(item, scope, kp, mode),
            )?,
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => control::if_then_else(
                self,
                |g| g.expr(cond, scope, kp, Mode::Basic),
                |g| g.expr(then_branch, scope, kp, mode),
                |g| match else_branch {
                    Some(else_branch) => g.expr(else_branch, scope, kp, mode),
                    None => g.neutral(mode),
                },
            )?,
            Expr::While { cond, body } => control::while_do(
                self,
                |g| g.neutral(mode),
                |g| g.expr(cond, scope, kp + 1, Mode::Basic),
                |g| g.expr(body, scope, kp, mode),
            )?,
            Expr::DoWhile { body, cond } => control::do_while(
                self,
                |g| g.expr(body, scope, kp, mode),
                |g| g.expr(cond, scope, kp + 1, Mode::Basic),
            )?,
            Expr::Loop { count, body } => control::counted_loop(
                self,
                |g| g.neutral(mode),
                |g| g.expr(count, scope, kp + 1, Mode::Basic),
                |g| g.expr(body, scope, kp + 1, mode),
            )?,
            Expr::Local { bindings, body } => self.local(bindings, body, scope, kp, mode)?,
            Expr::Lambda { params, body } => {
                self.lambda(params, body, scope)?;
                self.unbox(mode);
            }
            Expr::Proc {
                params,
                locals,
                body,
            } => {
                if locals.is_empty() {
                    self.lambda(params, body, scope)?;
                } else {
                    let body = Expr::local(
                        locals
                            .iter()
                            .map(|local| (local.as_str(), Expr::number(0)))
                            .collect(),
                        (**body).clone(),
                    );
                    self.lambda(params, &body, scope)?;
                }
                self.unbox(mode);
            }
            Expr::Call { callee, args } => {
                self.call(callee, args, scope, kp)?;
                self.unbox(mode);
            }
        }
        Ok(())
    }

    /// A raw word on top becomes a `'B'` cell in value mode.
    fn boxed(&mut self, mode: Mode) {
        if mode == Mode::Value {
            self.emit(VectorInstr::Mkbasic);
            self.emit(VectorInstr::Mkind(Tag::Basic));
        }
    }

    /// A fresh cell on top gives up its word in basic mode.
    fn unbox(&mut self, mode: Mode) {
        if mode == Mode::Basic {
            self.emit(VectorInstr::Getbasic);
        }
    }

    fn neutral(&mut self, mode: Mode) -> CompileResult<()> {
        self.emit(VectorInstr::Loadc(Const::Int(0)));
        self.boxed(mode);
        Ok(())
    }

    /// Push the cell that holds `name`.
    fn storage(&mut self, name: &str, scope: ScopeId) -> CompileResult<()> {
        let binding = self.scopes.lookup(scope, name)?;
        let instr = match binding.kind {
            ScopeKind::Local => VectorInstr::Pushloc(binding.address),
            ScopeKind::Formal => VectorInstr::Pushform(binding.address),
            ScopeKind::Global | ScopeKind::Captured => VectorInstr::Pushglob(binding.address),
        };
        self.emit(instr);
        Ok(())
    }

    fn local(
        &mut self,
        bindings: &[LocalBinding],
        body: &Expr,
        scope: ScopeId,
        kp: i64,
        mode: Mode,
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

        self.emit(VectorInstr::Alloc(count));
        for binding in bindings {
            self.storage(&binding.name, inner)?;
            self.expr(&binding.value, inner, kp + count + 1, Mode::Value)?;
            self.emit(VectorInstr::Store);
            self.emit(VectorInstr::Pop);
        }
        self.expr(body, inner, kp + count, mode)?;
        self.emit(VectorInstr::Slide(count));
        Ok(())
    }

    /// Captured variables travel as their cells, so the closure shares
    /// them with the scope that created it.
    fn lambda(
        &mut self,
        params: &[String],
        body: &Expr,
        scope: ScopeId,
    ) -> CompileResult<()> {
        let captures: Vec<String> = capture_set(params, body).into_iter().collect();
        for name in &captures {
            self.storage(name, scope)?;
        }
        let label = self.session.label("fun");
        self.emit(VectorInstr::Mkvec(captures.len() as i64));
        self.emit(VectorInstr::Mkfunval(label.clone()));
        self.emit(VectorInstr::Mkind(Tag::Function));

        let frame = self.scopes.detached(
            params
                .iter()
                .chain(captures.iter())
                .map(String::as_str),
        );
        for (i, param) in params.iter().enumerate() {
            self.scopes
                .bind(frame, Binding::new(param, ScopeKind::Formal, i as i64))?;
        }
        for (j, name) in captures.iter().enumerate() {
            self.scopes
                .bind(frame, Binding::new(name, ScopeKind::Captured, j as i64))?;
        }

        let outer = std::mem::take(&mut self.code);
        let generated = self.expr(body, frame, 0, Mode::Value);
        let mut code = std::mem::replace(&mut self.code, outer);
        generated?;
        code.push(VectorInstr::Return(0));

        tracing::trace!(label = %label, captures = captures.len(), "lambda body");
        self.lambdas.register(LambdaBody {
            label,
            params: params.to_vec(),
            captures,
            code,
        })
    }

    /// Leaves the callee's result cell in place of the callee.
    fn call(&mut self, callee: &Expr, args: &[Expr], scope: ScopeId, kp: i64) -> CompileResult<()> {
        self.expr(callee, scope, kp, Mode::Value)?;
        for (i, arg) in args.iter().enumerate() {
            self.expr(arg, scope, kp + 1 + i as i64, Mode::Value)?;
        }
        let ret = self.session.label("ret");
        self.emit(VectorInstr::Mkvec(args.len() as i64));
        self.emit(VectorInstr::Loadc(Const::Addr(ret.clone())));
        self.emit(VectorInstr::Mkvec(1));
        self.emit(VectorInstr::Call);
        self.emit(VectorInstr::Label(ret));
        Ok(())
    }
}

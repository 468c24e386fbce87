//! Shared helpers for the compiler integration tests
//!
//! `evaluate` is a tree-walking reference evaluator over the same AST. Its
//! closures share variables with the scope that created them, which is
//! what the vector machine does; the stack and closure machines agree with
//! it on every program they accept that does not assign a captured local
//! after the closure is made.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use trivium_compiler::{compile, Limits, Machine};
use trivium_parser::ast::{BinaryOp, Expr, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    Undefined(String),
    DivisionByZero,
    Overflow,
    NotAFunction,
    Arity,
    StepLimit,
}

#[derive(Clone)]
enum Value {
    Int(i64),
    Fun(Rc<Function>),
}

struct Function {
    params: Vec<String>,
    locals: Vec<String>,
    body: Expr,
    env: Env,
}

type Cell = Rc<RefCell<Value>>;

#[derive(Clone, Default)]
struct Env {
    frames: Vec<Rc<HashMap<String, Cell>>>,
}

impl Env {
    fn lookup(&self, name: &str) -> Option<Cell> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    fn extend(&self, frame: HashMap<String, Cell>) -> Env {
        let mut frames = self.frames.clone();
        frames.push(Rc::new(frame));
        Env { frames }
    }
}

struct Evaluator {
    globals: HashMap<String, Cell>,
    steps: u64,
}

const MAX_STEPS: u64 = 1_000_000;

/// Value of `expr`, as the compiled program would print it.
pub fn evaluate(expr: &Expr) -> Result<i64, EvalError> {
    let mut evaluator = Evaluator {
        globals: HashMap::new(),
        steps: 0,
    };
    match evaluator.eval(expr, &Env::default())? {
        Value::Int(n) => Ok(n),
        Value::Fun(_) => Err(EvalError::NotAFunction),
    }
}

fn int(value: Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(n),
        Value::Fun(_) => Err(EvalError::NotAFunction),
    }
}

fn cell(value: Value) -> Cell {
    Rc::new(RefCell::new(value))
}

impl Evaluator {
    fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return Err(EvalError::StepLimit);
        }
        Ok(())
    }

    fn resolve(&self, name: &str, env: &Env) -> Option<Cell> {
        env.lookup(name).or_else(|| self.globals.get(name).cloned())
    }

    fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        self.tick()?;
        match expr {
            Expr::Number { value } => Ok(Value::Int(*value)),
            Expr::Bool { value } => Ok(Value::Int(*value as i64)),
            Expr::Var { name } => self
                .resolve(name, env)
                .map(|cell| cell.borrow().clone())
                .ok_or_else(|| EvalError::Undefined(name.clone())),
            Expr::Unary { op, operand } => {
                let n = int(self.eval(operand, env)?)?;
                Ok(Value::Int(match op {
                    UnaryOp::Neg => n.wrapping_neg(),
                    UnaryOp::Not => (n == 0) as i64,
                }))
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = int(self.eval(lhs, env)?)?;
                let r = int(self.eval(rhs, env)?)?;
                binary(*op, l, r).map(Value::Int)
            }
            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                match self.resolve(name, env) {
                    Some(target) => *target.borrow_mut() = value.clone(),
                    None => {
                        self.globals.insert(name.clone(), cell(value.clone()));
                    }
                }
                Ok(value)
            }
            Expr::Seq { items } => {
                let mut last = Value::Int(0);
                for item in items {
                    last = self.eval(item, env)?;
                }
                Ok(last)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if int(self.eval(cond, env)?)? != 0 {
                    self.eval(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch, env)
                } else {
                    Ok(Value::Int(0))
                }
            }
            Expr::While { cond, body } => {
                let mut last = Value::Int(0);
                while int(self.eval(cond, env)?)? != 0 {
                    last = self.eval(body, env)?;
                }
                Ok(last)
            }
            Expr::DoWhile { body, cond } => loop {
                let last = self.eval(body, env)?;
                if int(self.eval(cond, env)?)? == 0 {
                    return Ok(last);
                }
            },
            Expr::Loop { count, body } => {
                let count = int(self.eval(count, env)?)?;
                let mut last = Value::Int(0);
                for _ in 0..count.max(0) {
                    self.tick()?;
                    last = self.eval(body, env)?;
                }
                Ok(last)
            }
            Expr::Local { bindings, body } => {
                let frame: HashMap<String, Cell> = bindings
                    .iter()
                    .map(|b| (b.name.clone(), cell(Value::Int(0))))
                    .collect();
                let inner = env.extend(frame);
                for binding in bindings {
                    let value = self.eval(&binding.value, &inner)?;
                    if let Some(target) = inner.lookup(&binding.name) {
                        *target.borrow_mut() = value;
                    }
                }
                self.eval(body, &inner)
            }
            Expr::Lambda { params, body } => Ok(Value::Fun(Rc::new(Function {
                params: params.clone(),
                locals: Vec::new(),
                body: (**body).clone(),
                env: env.clone(),
            }))),
            Expr::Proc {
                params,
                locals,
                body,
            } => Ok(Value::Fun(Rc::new(Function {
                params: params.clone(),
                locals: locals.clone(),
                body: (**body).clone(),
                env: env.clone(),
            }))),
            Expr::Call { callee, args } => {
                let function = match self.eval(callee, env)? {
                    Value::Fun(function) => function,
                    Value::Int(_) => return Err(EvalError::NotAFunction),
                };
                if function.params.len() != args.len() {
                    return Err(EvalError::Arity);
                }
                let mut frame = HashMap::new();
                for (param, arg) in function.params.iter().zip(args) {
                    frame.insert(param.clone(), cell(self.eval(arg, env)?));
                }
                for local in &function.locals {
                    frame.insert(local.clone(), cell(Value::Int(0)));
                }
                let inner = function.env.extend(frame);
                self.eval(&function.body, &inner)
            }
        }
    }
}

fn binary(op: BinaryOp, l: i64, r: i64) -> Result<i64, EvalError> {
    Ok(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l.checked_div(r).ok_or(EvalError::Overflow)?
        }
        BinaryOp::Lt => (l < r) as i64,
        BinaryOp::Gt => (l > r) as i64,
        BinaryOp::Le => (l <= r) as i64,
        BinaryOp::Ge => (l >= r) as i64,
        BinaryOp::Eq => (l == r) as i64,
        BinaryOp::Ne => (l != r) as i64,
        BinaryOp::And => (l != 0 && r != 0) as i64,
        BinaryOp::Or => (l != 0 || r != 0) as i64,
    })
}

pub fn parse(source: &str) -> Expr {
    trivium_parser::parse(source).unwrap()
}

/// Compile for `machine` and run the IR simulator.
pub fn run(machine: Machine, source: &str) -> i64 {
    let program = compile(&parse(source), machine).unwrap();
    program.simulate(Limits::default()).unwrap()
}

pub fn run_expr(machine: Machine, expr: &Expr) -> i64 {
    let program = compile(expr, machine).unwrap();
    program.simulate(Limits::default()).unwrap()
}

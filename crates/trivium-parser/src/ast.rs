//! Abstract syntax tree
//!
//! A program is a single expression. Every construct yields a value, so
//! sequences, loops and local blocks can appear anywhere an operand can.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical negation (0 becomes 1, everything else becomes 0)
    Not,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// Source spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    /// Whether the operator yields a 0/1 truth value
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Integer literal
    Number { value: i64 },

    /// `true` / `false`
    Bool { value: bool },

    /// Variable reference
    Var { name: String },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// `name := value`; evaluates to the assigned value
    Assign { name: String, value: Box<Expr> },

    /// `a; b; c`; evaluates to the last element
    Seq { items: Vec<Expr> },

    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    While { cond: Box<Expr>, body: Box<Expr> },

    /// `do body while cond`
    DoWhile { body: Box<Expr>, cond: Box<Expr> },

    /// `loop count do body`
    Loop { count: Box<Expr>, body: Box<Expr> },

    /// `local a := e1, b := e2 in body`
    Local {
        bindings: Vec<Binding>,
        body: Box<Expr>,
    },

    /// `(a, b) -> body`
    Lambda { params: Vec<String>, body: Box<Expr> },

    /// `proc (a, b) local t -> body`
    ///
    /// A procedure only sees globals, its parameters and its locals.
    Proc {
        params: Vec<String>,
        locals: Vec<String>,
        body: Box<Expr>,
    },

    Call { callee: Box<Expr>, args: Vec<Expr> },
}

/// One `name := value` pair of a local block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub value: Expr,
}

impl Expr {
    pub fn number(value: i64) -> Self {
        Expr::Number { value }
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Bool { value }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Expr::Assign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// Builds a sequence, collapsing a single item to itself.
    pub fn seq(mut items: Vec<Expr>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Seq { items }
        }
    }

    pub fn if_then(cond: Expr, then_branch: Expr, else_branch: Option<Expr>) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    pub fn while_do(cond: Expr, body: Expr) -> Self {
        Expr::While {
            cond: Box::new(cond),
            body: Box::new(body),
        }
    }

    pub fn do_while(body: Expr, cond: Expr) -> Self {
        Expr::DoWhile {
            body: Box::new(body),
            cond: Box::new(cond),
        }
    }

    pub fn loop_do(count: Expr, body: Expr) -> Self {
        Expr::Loop {
            count: Box::new(count),
            body: Box::new(body),
        }
    }

    pub fn local(bindings: Vec<(&str, Expr)>, body: Expr) -> Self {
        Expr::Local {
            bindings: bindings
                .into_iter()
                .map(|(name, value)| Binding {
                    name: name.to_string(),
                    value,
                })
                .collect(),
            body: Box::new(body),
        }
    }

    pub fn lambda(params: &[&str], body: Expr) -> Self {
        Expr::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Box::new(body),
        }
    }

    pub fn procedure(params: &[&str], locals: &[&str], body: Expr) -> Self {
        Expr::Proc {
            params: params.iter().map(|p| p.to_string()).collect(),
            locals: locals.iter().map(|l| l.to_string()).collect(),
            body: Box::new(body),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// `fun name(params) -> body`, which binds `name` inside its own body:
    /// `name := local name := (params) -> body in name`.
    pub fn fun(name: &str, params: &[&str], body: Expr) -> Self {
        Expr::assign(
            name,
            Expr::local(vec![(name, Expr::lambda(params, body))], Expr::var(name)),
        )
    }

    /// Short node-kind name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Number { .. } => "number",
            Expr::Bool { .. } => "boolean",
            Expr::Var { .. } => "variable",
            Expr::Unary { .. } => "unary operation",
            Expr::Binary { .. } => "binary operation",
            Expr::Assign { .. } => "assignment",
            Expr::Seq { .. } => "sequence",
            Expr::If { .. } => "if",
            Expr::While { .. } => "while",
            Expr::DoWhile { .. } => "do-while",
            Expr::Loop { .. } => "loop",
            Expr::Local { .. } => "local",
            Expr::Lambda { .. } => "lambda",
            Expr::Proc { .. } => "procedure",
            Expr::Call { .. } => "call",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fun_desugars_to_self_binding_local() {
        let f = Expr::fun("f", &["x"], Expr::var("x"));
        match f {
            Expr::Assign { name, value } => {
                assert_eq!(name, "f");
                match *value {
                    Expr::Local { bindings, body } => {
                        assert_eq!(bindings.len(), 1);
                        assert_eq!(bindings[0].name, "f");
                        assert!(matches!(bindings[0].value, Expr::Lambda { .. }));
                        assert_eq!(*body, Expr::var("f"));
                    }
                    other => panic!("expected local, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_seq_of_one_collapses() {
        assert_eq!(Expr::seq(vec![Expr::number(1)]), Expr::number(1));
    }

    #[test]
    fn test_comparison_classification() {
        assert!(BinaryOp::Le.is_comparison());
        assert!(!BinaryOp::And.is_comparison());
        assert_eq!(BinaryOp::Ne.to_string(), "!=");
    }
}

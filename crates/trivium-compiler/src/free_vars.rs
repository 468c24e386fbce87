//! Free-variable analysis
//!
//! Sets are ordered so that capture vectors and pre-declared globals get
//! the same slots on every compilation.

use std::collections::BTreeSet;
use trivium_parser::ast::Expr;

/// Names used in `expr` but not bound inside it.
pub fn free_vars(expr: &Expr) -> BTreeSet<String> {
    let mut collector = Collector::default();
    collector.visit(expr);
    collector.free
}

/// Free names of `expr` that are assignment targets somewhere in it.
pub fn assigned_vars(expr: &Expr) -> BTreeSet<String> {
    let mut collector = Collector::default();
    collector.visit(expr);
    collector.assigned
}

/// Free variables of a lambda body minus its parameters: the capture set.
pub fn capture_set(params: &[String], body: &Expr) -> BTreeSet<String> {
    let mut free = free_vars(body);
    for param in params {
        free.remove(param);
    }
    free
}

#[derive(Default)]
struct Collector {
    free: BTreeSet<String>,
    assigned: BTreeSet<String>,
}

impl Collector {
    fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Number { .. } | Expr::Bool { .. } => {}
            Expr::Var { name } => {
                self.free.insert(name.clone());
            }
            Expr::Unary { operand, .. } => self.visit(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.visit(lhs);
                self.visit(rhs);
            }
            Expr::Assign { name, value } => {
                self.free.insert(name.clone());
                self.assigned.insert(name.clone());
                self.visit(value);
            }
            Expr::Seq { items } => items.iter().for_each(|item| self.visit(item)),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit(cond);
                self.visit(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit(else_branch);
                }
            }
            Expr::While { cond, body } | Expr::DoWhile { body, cond } => {
                self.visit(cond);
                self.visit(body);
            }
            Expr::Loop { count, body } => {
                self.visit(count);
                self.visit(body);
            }
            Expr::Local { bindings, body } => {
                let mut inner = Collector::default();
                for binding in bindings {
                    inner.visit(&binding.value);
                }
                inner.visit(body);
                let bound: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
                self.absorb(inner, &bound);
            }
            Expr::Lambda { params, body } => {
                let mut inner = Collector::default();
                inner.visit(body);
                let bound: Vec<&str> = params.iter().map(String::as_str).collect();
                self.absorb(inner, &bound);
            }
            Expr::Proc {
                params,
                locals,
                body,
            } => {
                let mut inner = Collector::default();
                inner.visit(body);
                let bound: Vec<&str> = params
                    .iter()
                    .chain(locals.iter())
                    .map(String::as_str)
                    .collect();
                self.absorb(inner, &bound);
            }
            Expr::Call { callee, args } => {
                self.visit(callee);
                args.iter().for_each(|arg| self.visit(arg));
            }
        }
    }

    fn absorb(&mut self, inner: Collector, bound: &[&str]) {
        let outside = |name: &String| !bound.contains(&name.as_str());
        self.free.extend(inner.free.into_iter().filter(outside));
        self.assigned.extend(inner.assigned.into_iter().filter(outside));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivium_parser::ast::BinaryOp;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_literals_have_no_free_variables() {
        assert!(free_vars(&Expr::number(3)).is_empty());
        assert!(free_vars(&Expr::boolean(true)).is_empty());
    }

    #[test]
    fn test_assignment_target_is_free_and_assigned() {
        let e = Expr::assign("x", Expr::var("y"));
        assert_eq!(names(&free_vars(&e)), vec!["x", "y"]);
        assert_eq!(names(&assigned_vars(&e)), vec!["x"]);
    }

    #[test]
    fn test_lambda_subtracts_parameters() {
        let e = Expr::lambda(
            &["a"],
            Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b")),
        );
        assert_eq!(names(&free_vars(&e)), vec!["b"]);
    }

    #[test]
    fn test_local_bindings_see_each_other() {
        // local f := (x) -> f(x) in f
        let e = Expr::local(
            vec![(
                "f",
                Expr::lambda(&["x"], Expr::call(Expr::var("f"), vec![Expr::var("x")])),
            )],
            Expr::var("f"),
        );
        assert!(free_vars(&e).is_empty());
    }

    #[test]
    fn test_proc_subtracts_params_and_locals() {
        let e = Expr::procedure(
            &["p"],
            &["t"],
            Expr::seq(vec![
                Expr::assign("t", Expr::var("p")),
                Expr::assign("g", Expr::var("t")),
            ]),
        );
        assert_eq!(names(&free_vars(&e)), vec!["g"]);
        assert_eq!(names(&assigned_vars(&e)), vec!["g"]);
    }

    #[test]
    fn test_capture_set_excludes_params() {
        let params = vec!["x".to_string()];
        let body = Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::var("k"));
        assert_eq!(names(&capture_set(&params, &body)), vec!["k"]);
    }
}

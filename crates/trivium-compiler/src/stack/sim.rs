//! Stack machine simulator
//!
//! The operand stack doubles as VM memory: VM address `a` is word `a / 8`.

use super::instr::StackInstr;
use crate::ir::{Const, Program};
use crate::scope::WORD;
use crate::sim::{self, CodeImage, Fuel, Limits, MachineError, Stack};

pub fn simulate(program: &Program<StackInstr>, limits: Limits) -> Result<i64, MachineError> {
    let image = CodeImage::load(program);
    let mut fuel = Fuel::new(limits);
    let mut stack = Stack::default();
    for _ in &program.globals {
        stack.push(0);
    }
    let mut fp = program.global_space() - WORD;
    let mut pc = image.entry;

    while pc != image.main_end {
        fuel.burn()?;
        stack.pc = pc;
        let instr = image.get(pc).ok_or(MachineError::BadAddress {
            address: pc as i64,
            expected: "instruction",
        })?;
        pc += 1;
        match instr {
            StackInstr::Loadc(Const::Int(value)) => stack.push(*value),
            StackInstr::Loadc(Const::Addr(label)) => stack.push(image.address_of(label)?),
            StackInstr::Load => {
                let address = stack.pop()?;
                stack.push(stack.get(slot(address)?)?);
            }
            StackInstr::Store => {
                let address = stack.pop()?;
                let value = stack.top()?;
                stack.set(slot(address)?, value)?;
            }
            StackInstr::Loadrc(offset) => stack.push(fp + offset),
            StackInstr::Pop => {
                stack.pop()?;
            }
            StackInstr::Dup => stack.push(stack.top()?),
            StackInstr::Swap => {
                let top = stack.pop()?;
                let below = stack.pop()?;
                stack.push(top);
                stack.push(below);
            }
            StackInstr::Dec => stack.poke(0, stack.top()?.wrapping_sub(1))?,
            StackInstr::Unary(op) => {
                let operand = stack.pop()?;
                stack.push(sim::unary(*op, operand));
            }
            StackInstr::Binary(op) => {
                let rhs = stack.pop()?;
                let lhs = stack.pop()?;
                stack.push(sim::binary(*op, lhs, rhs)?);
            }
            StackInstr::Label(_) => {}
            StackInstr::Jump(target) => pc = image.target(target)?,
            StackInstr::Jumpz(target) => {
                if stack.pop()? == 0 {
                    pc = image.target(target)?;
                }
            }
            StackInstr::Enter => fp = top_address(&stack),
            StackInstr::Alloc(bytes) => {
                for _ in 0..bytes / WORD {
                    stack.push(0);
                }
            }
            StackInstr::Mark => stack.push(fp),
            StackInstr::Call => {
                let target = stack.pop()?;
                stack.push(sim::CODE_BASE + pc as i64);
                pc = image.pc_of(target)?;
            }
            StackInstr::Ret => {
                stack.truncate(slot(fp)? + 1);
                let return_address = stack.pop()?;
                fp = stack.top()?;
                pc = image.pc_of(return_address)?;
            }
            StackInstr::Slide { drop, keep } => {
                let kept = (keep / WORD) as usize;
                let mut words = Vec::with_capacity(kept);
                for _ in 0..kept {
                    words.push(stack.pop()?);
                }
                for _ in 0..drop / WORD {
                    stack.pop()?;
                }
                for word in words.into_iter().rev() {
                    stack.push(word);
                }
            }
        }
    }
    stack.pop()
}

fn slot(address: i64) -> Result<usize, MachineError> {
    if address < 0 || address % WORD != 0 {
        return Err(MachineError::BadAddress {
            address,
            expected: "stack",
        });
    }
    Ok((address / WORD) as usize)
}

fn top_address(stack: &Stack) -> i64 {
    WORD * (stack.len() as i64 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::stack::gen::generate;
    use trivium_parser::ast::{BinaryOp, Expr};

    fn run(expr: &Expr) -> i64 {
        let program = generate(expr, &mut Session::new()).unwrap();
        simulate(&program, Limits::default()).unwrap()
    }

    #[test]
    fn test_globals_scenario() {
        let e = Expr::seq(vec![
            Expr::assign("x", Expr::number(3)),
            Expr::assign("y", Expr::number(4)),
            Expr::binary(BinaryOp::Add, Expr::var("x"), Expr::var("y")),
        ]);
        assert_eq!(run(&e), 7);
    }

    #[test]
    fn test_procedure_with_locals() {
        // sq := proc (a) local t -> (t := a * a; t + 1); sq(6)
        let e = Expr::seq(vec![
            Expr::assign(
                "sq",
                Expr::procedure(
                    &["a"],
                    &["t"],
                    Expr::seq(vec![
                        Expr::assign("t", Expr::binary(BinaryOp::Mul, Expr::var("a"), Expr::var("a"))),
                        Expr::binary(BinaryOp::Add, Expr::var("t"), Expr::number(1)),
                    ]),
                ),
            ),
            Expr::call(Expr::var("sq"), vec![Expr::number(6)]),
        ]);
        assert_eq!(run(&e), 37);
    }

    #[test]
    fn test_two_argument_call_keeps_order() {
        let sub = Expr::lambda(&["a", "b"], Expr::binary(BinaryOp::Sub, Expr::var("a"), Expr::var("b")));
        assert_eq!(run(&Expr::call(sub, vec![Expr::number(10), Expr::number(3)])), 7);
    }

    #[test]
    fn test_recursion_through_global() {
        // fact := n -> if n < 2 then 1 else n * fact(n - 1); fact(5)
        let body = Expr::if_then(
            Expr::binary(BinaryOp::Lt, Expr::var("n"), Expr::number(2)),
            Expr::number(1),
            Some(Expr::binary(
                BinaryOp::Mul,
                Expr::var("n"),
                Expr::call(
                    Expr::var("fact"),
                    vec![Expr::binary(BinaryOp::Sub, Expr::var("n"), Expr::number(1))],
                ),
            )),
        );
        let e = Expr::seq(vec![
            Expr::assign("fact", Expr::lambda(&["n"], body)),
            Expr::call(Expr::var("fact"), vec![Expr::number(5)]),
        ]);
        assert_eq!(run(&e), 120);
    }

    #[test]
    fn test_runaway_loop_hits_step_limit() {
        let e = Expr::while_do(Expr::boolean(true), Expr::number(1));
        let program = generate(&e, &mut Session::new()).unwrap();
        let err = simulate(&program, Limits { max_steps: 1000 }).unwrap_err();
        assert_eq!(err, MachineError::StepLimit { limit: 1000 });
    }
}

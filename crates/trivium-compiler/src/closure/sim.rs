//! Closure machine simulator

use super::instr::ClosureInstr;
use crate::ir::{Const, Program};
use crate::scope::WORD;
use crate::sim::{self, CodeImage, Fuel, Heap, Limits, MachineError, Stack};

struct Registers {
    gp: i64,
    /// Stack index of the newest return-address slot, or -1 in `main`
    fp: i64,
}

pub fn simulate(program: &Program<ClosureInstr>, limits: Limits) -> Result<i64, MachineError> {
    let image = CodeImage::load(program);
    let mut fuel = Fuel::new(limits);
    let mut stack = Stack::default();
    let mut heap = Heap::default();
    let mut regs = Registers { gp: 0, fp: -1 };
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
            ClosureInstr::Loadc(Const::Int(value)) => stack.push(*value),
            ClosureInstr::Loadc(Const::Addr(label)) => stack.push(image.address_of(label)?),
            ClosureInstr::Pop => {
                stack.pop()?;
            }
            ClosureInstr::Dup => stack.push(stack.top()?),
            ClosureInstr::Swap => {
                let top = stack.pop()?;
                let below = stack.pop()?;
                stack.push(top);
                stack.push(below);
            }
            ClosureInstr::Dec => stack.poke(0, stack.top()?.wrapping_sub(1))?,
            ClosureInstr::Unary(op) => {
                let operand = stack.pop()?;
                stack.push(sim::unary(*op, operand));
            }
            ClosureInstr::Binary(op) => {
                let rhs = stack.pop()?;
                let lhs = stack.pop()?;
                stack.push(sim::binary(*op, lhs, rhs)?);
            }
            ClosureInstr::Label(_) => {}
            ClosureInstr::Jump(target) => pc = image.target(target)?,
            ClosureInstr::Jumpz(target) => {
                if stack.pop()? == 0 {
                    pc = image.target(target)?;
                }
            }
            ClosureInstr::Pushloc(k) => stack.push(stack.peek(depth(*k)?)?),
            ClosureInstr::Storeloc(k) => stack.poke(depth(*k)?, stack.top()?)?,
            ClosureInstr::Pushglob(i) => stack.push(heap.load(regs.gp + WORD * (i + 1))?),
            ClosureInstr::Load => {
                let cell = stack.pop()?;
                stack.push(heap.load(cell)?);
            }
            ClosureInstr::Store => {
                let cell = stack.pop()?;
                heap.store(cell, stack.top()?)?;
            }
            ClosureInstr::Alloc(n) => {
                for _ in 0..*n {
                    stack.push(heap.alloc(2));
                }
            }
            ClosureInstr::Rewrite(k) => {
                let closure = stack.pop()?;
                let cell = stack.peek(depth(k - 1)?)?;
                heap.store(cell, heap.load(closure)?)?;
                heap.store(cell + WORD, heap.load(closure + WORD)?)?;
            }
            ClosureInstr::Mkvec(n) => {
                let vector = make_vector(&mut heap, &mut stack, *n)?;
                stack.push(vector);
            }
            ClosureInstr::Mkfunval(label) => {
                let closure = heap.alloc(2);
                heap.store(closure, image.address_of(label)?)?;
                heap.store(closure + WORD, stack.pop()?)?;
                stack.push(closure);
            }
            ClosureInstr::Mark(label) => {
                stack.push(regs.gp);
                stack.push(regs.fp);
                stack.push(image.address_of(label)?);
                regs.fp = stack.len() as i64 - 1;
            }
            ClosureInstr::Apply(_) => {
                let closure = stack.pop()?;
                regs.gp = heap.load(closure + WORD)?;
                pc = image.pc_of(heap.load(closure)?)?;
            }
            ClosureInstr::Popenv => {
                let result = stack.pop()?;
                let fp = frame_index(regs.fp)?;
                let return_address = stack.get(fp)?;
                let caller_fp = stack.get(fp - 1)?;
                regs.gp = stack.get(fp - 2)?;
                stack.truncate(fp - 2);
                stack.push(result);
                regs.fp = caller_fp;
                pc = image.pc_of(return_address)?;
            }
            ClosureInstr::Slide(n) => stack.slide(depth(*n)?)?,
            ClosureInstr::Setgp => regs.gp = stack.pop()?,
        }
    }
    stack.pop()
}

/// Pop `n` words into a fresh `[n, e1 .. en]` block.
pub(crate) fn make_vector(heap: &mut Heap, stack: &mut Stack, n: i64) -> Result<i64, MachineError> {
    let vector = heap.alloc(depth(n)? + 1);
    heap.store(vector, n)?;
    for i in (1..=n).rev() {
        heap.store(vector + WORD * i, stack.pop()?)?;
    }
    Ok(vector)
}

fn depth(k: i64) -> Result<usize, MachineError> {
    usize::try_from(k).map_err(|_| MachineError::BadAddress {
        address: k,
        expected: "stack offset",
    })
}

fn frame_index(fp: i64) -> Result<usize, MachineError> {
    usize::try_from(fp)
        .ok()
        .filter(|&fp| fp >= 2)
        .ok_or(MachineError::BadAddress {
            address: fp,
            expected: "frame",
        })
}

//! Vector machine simulator

use super::instr::{Tag, VectorInstr};
use crate::closure::sim::make_vector;
use crate::ir::{Const, Program};
use crate::scope::WORD;
use crate::sim::{self, CodeImage, Fuel, Heap, Limits, MachineError, Stack};

struct Registers {
    gp: i64,
    formals: i64,
    returns: i64,
    /// Stack index of the saved frame pointer, or -1 in `main`
    fp: i64,
}

pub fn simulate(program: &Program<VectorInstr>, limits: Limits) -> Result<i64, MachineError> {
    let image = CodeImage::load(program);
    let mut fuel = Fuel::new(limits);
    let mut stack = Stack::default();
    let mut heap = Heap::default();
    let mut regs = Registers {
        gp: 0,
        formals: 0,
        returns: 0,
        fp: -1,
    };
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
            VectorInstr::Loadc(Const::Int(value)) => stack.push(*value),
            VectorInstr::Loadc(Const::Addr(label)) => stack.push(image.address_of(label)?),
            VectorInstr::Pop => {
                stack.pop()?;
            }
            VectorInstr::Dup => stack.push(stack.top()?),
            VectorInstr::Swap => {
                let top = stack.pop()?;
                let below = stack.pop()?;
                stack.push(top);
                stack.push(below);
            }
            VectorInstr::Dec => stack.poke(0, stack.top()?.wrapping_sub(1))?,
            VectorInstr::Unary(op) => {
                let operand = stack.pop()?;
                stack.push(sim::unary(*op, operand));
            }
            VectorInstr::Binary(op) => {
                let rhs = stack.pop()?;
                let lhs = stack.pop()?;
                stack.push(sim::binary(*op, lhs, rhs)?);
            }
            VectorInstr::Label(_) => {}
            VectorInstr::Jump(target) => pc = image.target(target)?,
            VectorInstr::Jumpz(target) => {
                if stack.pop()? == 0 {
                    pc = image.target(target)?;
                }
            }
            VectorInstr::Mkbasic => {
                let basic = heap.alloc(1);
                heap.store(basic, stack.pop()?)?;
                stack.push(basic);
            }
            VectorInstr::Getbasic => {
                let cell = stack.pop()?;
                let payload = heap.load(cell)?;
                if heap.load(cell + WORD)? == Tag::Basic.word() {
                    stack.push(heap.load(payload)?);
                } else {
                    stack.push(payload);
                }
            }
            VectorInstr::Mkind(tag) => {
                let payload = stack.pop()?;
                stack.push(indirection(&mut heap, payload, *tag)?);
            }
            VectorInstr::Copy => {
                let cell = stack.pop()?;
                let fresh = heap.alloc(2);
                copy_cell(&mut heap, cell, fresh)?;
                stack.push(fresh);
            }
            VectorInstr::Mkvec(n) => {
                let vector = make_vector(&mut heap, &mut stack, *n)?;
                stack.push(vector);
            }
            VectorInstr::Mkfunval(label) => {
                let function = heap.alloc(2);
                heap.store(function, image.address_of(label)?)?;
                heap.store(function + WORD, stack.pop()?)?;
                stack.push(function);
            }
            VectorInstr::Pushloc(a) => stack.push(stack.get(slot(regs.fp + a)?)?),
            VectorInstr::Pushglob(i) => stack.push(heap.load(regs.gp + WORD * (i + 1))?),
            VectorInstr::Pushform(i) => stack.push(heap.load(regs.formals + WORD * (i + 1))?),
            VectorInstr::Alloc(n) => {
                for _ in 0..*n {
                    let basic = heap.alloc(1);
                    stack.push(indirection(&mut heap, basic, Tag::Basic)?);
                }
            }
            VectorInstr::Store => {
                let source = stack.pop()?;
                copy_cell(&mut heap, source, stack.top()?)?;
            }
            VectorInstr::Setgp => regs.gp = stack.pop()?,
            VectorInstr::Call => {
                let function = heap.load(stack.peek(2)?)?;
                stack.push(regs.gp);
                regs.gp = heap.load(function + WORD)?;
                stack.push(regs.fp);
                let fp = stack.len() - 1;
                regs.fp = fp as i64;
                let returns = stack.get(fp - 2)?;
                stack.set(fp - 2, regs.returns)?;
                regs.returns = returns;
                let formals = stack.get(fp - 3)?;
                stack.set(fp - 3, regs.formals)?;
                regs.formals = formals;
                pc = image.pc_of(heap.load(function)?)?;
            }
            VectorInstr::Return(i) => {
                let result = stack.pop()?;
                let fp = slot(regs.fp)?;
                let callee = fp.checked_sub(4).ok_or(MachineError::BadAddress {
                    address: regs.fp,
                    expected: "frame",
                })?;
                stack.set(callee, result)?;
                stack.truncate(fp + 1);
                regs.fp = stack.pop()?;
                regs.gp = stack.pop()?;
                let return_address = heap.load(regs.returns + WORD * (i + 1))?;
                regs.returns = stack.pop()?;
                regs.formals = stack.pop()?;
                pc = image.pc_of(return_address)?;
            }
            VectorInstr::Slide(n) => stack.slide(slot(*n)?)?,
        }
    }
    stack.pop()
}

fn indirection(heap: &mut Heap, payload: i64, tag: Tag) -> Result<i64, MachineError> {
    let cell = heap.alloc(2);
    heap.store(cell, payload)?;
    heap.store(cell + WORD, tag.word())?;
    Ok(cell)
}

fn copy_cell(heap: &mut Heap, from: i64, to: i64) -> Result<(), MachineError> {
    heap.store(to, heap.load(from)?)?;
    heap.store(to + WORD, heap.load(from + WORD)?)
}

fn slot(index: i64) -> Result<usize, MachineError> {
    usize::try_from(index).map_err(|_| MachineError::BadAddress {
        address: index,
        expected: "stack slot",
    })
}

use memory::{Address, Region, SlotKind, StackEntry};

use crate::error::FaultKind;
use crate::opcode::instruction::Operand;
use crate::opcode::OpCode;

use super::addressing::{computed, frame_slot};

/// Stack manipulation, frame/computed addressing and heap instructions.
pub trait DataOps {
    fn handle_stack(&mut self, op: OpCode, operand: Operand) -> Result<(), FaultKind>;
    fn handle_addressing(&mut self, op: OpCode, operand: Operand) -> Result<(), FaultKind>;
    fn handle_heap(&mut self, op: OpCode) -> Result<(), FaultKind>;

    /// Reads a `kind` value at `address`, in whichever region it points to.
    fn read_at(&self, op: OpCode, address: Address, kind: SlotKind) -> Result<StackEntry, FaultKind>;
    fn write_at(&mut self, address: Address, value: StackEntry) -> Result<(), FaultKind>;
}

impl DataOps for super::vm::VM {
    fn handle_stack(&mut self, op: OpCode, operand: Operand) -> Result<(), FaultKind> {
        match op {
            OpCode::PushInt => self.stack.push(StackEntry::Int(operand.as_i32())),
            OpCode::PushByte => self.stack.push(StackEntry::Byte(operand.as_i32() as u8)),
            OpCode::Pop => self.stack.pop().map(drop),
            OpCode::Dup => {
                let top = self.stack.peek()?;
                self.stack.push(top)
            }
            OpCode::Swap => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push(b)?;
                self.stack.push(a)
            }
            // Unit is slots, not bytes.
            OpCode::Reserve => self.stack.reserve(operand.as_u32() as usize),
            _ => unreachable!("handle_stack called with {op}"),
        }
    }

    fn handle_addressing(&mut self, op: OpCode, operand: Operand) -> Result<(), FaultKind> {
        match op {
            OpCode::Load => {
                let slot = frame_slot(self.fp, operand.as_i32())?;
                let value = self.stack.get(slot.payload() as usize)?;
                self.stack.push(value)
            }
            OpCode::Store => {
                let value = self.stack.pop()?;
                let slot = frame_slot(self.fp, operand.as_i32())?;
                self.stack.set(slot.payload() as usize, value)
            }
            OpCode::Addr => {
                let slot = frame_slot(self.fp, operand.as_i32())?;
                self.stack.push(StackEntry::Ref(slot))
            }
            OpCode::LoadAt => {
                let kind = slot_kind(op, operand)?;
                let offset = self.stack.pop()?;
                let base = self.stack.pop()?;
                let address = computed(op.name(), base, offset)?;
                let value = self.read_at(op, address, kind)?;
                self.stack.push(value)
            }
            OpCode::StoreAt => {
                let kind = slot_kind(op, operand)?;
                let value = self.stack.pop()?;
                if value.kind() != kind {
                    return Err(FaultKind::expected(op.name(), kind, value.kind()));
                }
                let offset = self.stack.pop()?;
                let base = self.stack.pop()?;
                let address = computed(op.name(), base, offset)?;
                self.write_at(address, value)
            }
            _ => unreachable!("handle_addressing called with {op}"),
        }
    }

    fn handle_heap(&mut self, op: OpCode) -> Result<(), FaultKind> {
        match op {
            OpCode::Alloc => {
                let size = pop_count(self.stack.pop()?, op)?;
                let address = self.heap.alloc(size)?;
                self.stack.push(StackEntry::Ref(address))
            }
            OpCode::Free => {
                let address = pop_ref(self.stack.pop()?, op)?;
                Ok(self.heap.free(address)?)
            }
            OpCode::Copy => {
                let count = pop_count(self.stack.pop()?, op)?;
                let dst = pop_ref(self.stack.pop()?, op)?;
                let src = pop_ref(self.stack.pop()?, op)?;
                self.heap.copy(src, dst, count)?;
                Ok(())
            }
            _ => unreachable!("handle_heap called with {op}"),
        }
    }

    fn read_at(&self, op: OpCode, address: Address, kind: SlotKind) -> Result<StackEntry, FaultKind> {
        match address.region() {
            Region::Stack => {
                let value = self.stack.get(address.payload() as usize)?;
                if value.kind() != kind {
                    return Err(FaultKind::expected(op.name(), kind, value.kind()));
                }
                Ok(value)
            }
            Region::Heap => Ok(self.heap.read(address, kind)?),
        }
    }

    fn write_at(&mut self, address: Address, value: StackEntry) -> Result<(), FaultKind> {
        match address.region() {
            Region::Stack => self.stack.set(address.payload() as usize, value),
            Region::Heap => Ok(self.heap.write(address, value)?),
        }
    }
}

fn slot_kind(op: OpCode, operand: Operand) -> Result<SlotKind, FaultKind> {
    let raw = operand.as_i32() as u8;
    SlotKind::from_u8(raw)
        .ok_or_else(|| FaultKind::type_mismatch(op.name(), format!("unknown slot kind {raw}")))
}

fn pop_ref(value: StackEntry, op: OpCode) -> Result<Address, FaultKind> {
    value
        .as_address()
        .ok_or_else(|| FaultKind::expected(op.name(), SlotKind::Ref, value.kind()))
}

/// Non-negative Int operand used as a byte count.
fn pop_count(value: StackEntry, op: OpCode) -> Result<usize, FaultKind> {
    let n = value
        .as_int()
        .ok_or_else(|| FaultKind::expected(op.name(), SlotKind::Int, value.kind()))?;
    usize::try_from(n).map_err(|_| FaultKind::OutOfBounds(format!("{} with negative size {}", op.name(), n)))
}

use memory::{SlotKind, StackEntry};

use crate::error::FaultKind;
use crate::opcode::OpCode;

use super::addressing::displace;

/// Arithmetic, comparison and conversion handlers.
///
/// Binary operators pop the right operand first: `a b SUB` computes `a - b`.
pub trait ArithmeticOps {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), FaultKind>;
    fn handle_comparison(&mut self, op: OpCode) -> Result<(), FaultKind>;
    fn handle_conversion(&mut self, op: OpCode) -> Result<(), FaultKind>;
}

impl ArithmeticOps for super::vm::VM {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), FaultKind> {
        if op == OpCode::Neg {
            let value = self.stack.pop()?;
            let result = match value {
                StackEntry::Int(n) => StackEntry::Int(n.wrapping_neg()),
                StackEntry::Byte(b) => StackEntry::Byte(b.wrapping_neg()),
                StackEntry::Ref(_) => {
                    return Err(FaultKind::type_mismatch(op.name(), "cannot negate a ref"))
                }
            };
            return self.stack.push(result);
        }

        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let result = binary(op, a, b)?;
        self.stack.push(result)
    }

    fn handle_comparison(&mut self, op: OpCode) -> Result<(), FaultKind> {
        if op == OpCode::Not {
            let value = self.stack.pop()?;
            let truth = value
                .truthy()
                .ok_or_else(|| FaultKind::type_mismatch(op.name(), "a ref has no truth value"))?;
            return self.stack.push(StackEntry::Byte(u8::from(!truth)));
        }

        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let result = compare(op, a, b)?;
        self.stack.push(StackEntry::Byte(u8::from(result)))
    }

    fn handle_conversion(&mut self, op: OpCode) -> Result<(), FaultKind> {
        let value = self.stack.pop()?;
        let result = match (op, value) {
            (OpCode::IntToByte, StackEntry::Int(n)) => StackEntry::narrow(n),
            (OpCode::ByteToInt, StackEntry::Byte(b)) => StackEntry::Int(i32::from(b)),
            (OpCode::IntToByte, other) => {
                return Err(FaultKind::expected(op.name(), SlotKind::Int, other.kind()))
            }
            (_, other) => return Err(FaultKind::expected(op.name(), SlotKind::Byte, other.kind())),
        };
        self.stack.push(result)
    }
}

fn mismatch(op: OpCode, a: StackEntry, b: StackEntry) -> FaultKind {
    FaultKind::type_mismatch(op.name(), format!("{} and {}", a.kind(), b.kind()))
}

/// Same-kind integer arithmetic wraps; ref arithmetic stays inside its region.
fn binary(op: OpCode, a: StackEntry, b: StackEntry) -> Result<StackEntry, FaultKind> {
    use StackEntry::{Byte, Int, Ref};

    let value = match (op, a, b) {
        (OpCode::Add, Int(x), Int(y)) => Int(x.wrapping_add(y)),
        (OpCode::Sub, Int(x), Int(y)) => Int(x.wrapping_sub(y)),
        (OpCode::Mul, Int(x), Int(y)) => Int(x.wrapping_mul(y)),
        (OpCode::Div | OpCode::Mod, Int(_), Int(0)) => return Err(FaultKind::DivisionByZero),
        (OpCode::Div, Int(x), Int(y)) => Int(x.wrapping_div(y)),
        (OpCode::Mod, Int(x), Int(y)) => Int(x.wrapping_rem(y)),

        (OpCode::Add, Byte(x), Byte(y)) => Byte(x.wrapping_add(y)),
        (OpCode::Sub, Byte(x), Byte(y)) => Byte(x.wrapping_sub(y)),
        (OpCode::Mul, Byte(x), Byte(y)) => Byte(x.wrapping_mul(y)),
        (OpCode::Div | OpCode::Mod, Byte(_), Byte(0)) => return Err(FaultKind::DivisionByZero),
        (OpCode::Div, Byte(x), Byte(y)) => Byte(x / y),
        (OpCode::Mod, Byte(x), Byte(y)) => Byte(x % y),

        (OpCode::Add, Ref(p), Int(n)) | (OpCode::Add, Int(n), Ref(p)) => Ref(displace(p, n)?),
        (OpCode::Sub, Ref(p), Int(n)) => {
            let n = n
                .checked_neg()
                .ok_or_else(|| FaultKind::OutOfBounds(format!("{}-{}", p, n)))?;
            Ref(displace(p, n)?)
        }

        _ => return Err(mismatch(op, a, b)),
    };
    Ok(value)
}

fn compare(op: OpCode, a: StackEntry, b: StackEntry) -> Result<bool, FaultKind> {
    use std::cmp::Ordering;
    use StackEntry::{Byte, Int, Ref};

    let ordering: Ordering = match (a, b) {
        (Int(x), Int(y)) => x.cmp(&y),
        (Byte(x), Byte(y)) => x.cmp(&y),
        // Refs compare only within one region.
        (Ref(p), Ref(q)) if p.region() == q.region() => p.payload().cmp(&q.payload()),
        _ => return Err(mismatch(op, a, b)),
    };

    Ok(match op {
        OpCode::Eq => ordering.is_eq(),
        OpCode::Ne => ordering.is_ne(),
        OpCode::Lt => ordering.is_lt(),
        OpCode::Le => ordering.is_le(),
        OpCode::Gt => ordering.is_gt(),
        OpCode::Ge => ordering.is_ge(),
        _ => return Err(mismatch(op, a, b)),
    })
}

//! Address computation for the two load/store modes.
//!
//! Immediate mode resolves `fp + offset` from an instruction operand.
//! Computed mode sums a `Ref` base and an `Int` offset popped from the stack.
//! Both go through `Address::offset_by`, which rejects negative results and
//! region crossings.

use memory::{Address, StackEntry};

use crate::error::FaultKind;

/// Slot address of `fp + offset`.
pub fn frame_slot(fp: usize, offset: i32) -> Result<Address, FaultKind> {
    let base = u32::try_from(fp)
        .ok()
        .filter(|fp| *fp <= memory::value::ADDRESS_PAYLOAD_MASK)
        .ok_or_else(|| FaultKind::OutOfBounds(format!("frame pointer {}", fp)))?;
    Address::stack(base)
        .offset_by(offset)
        .ok_or_else(|| FaultKind::OutOfBounds(format!("fp{:+} with fp = {}", offset, fp)))
}

/// `base + offset` for computed addressing.
pub fn computed(op: &'static str, base: StackEntry, offset: StackEntry) -> Result<Address, FaultKind> {
    let base = base
        .as_address()
        .ok_or_else(|| FaultKind::expected(op, memory::SlotKind::Ref, base.kind()))?;
    let offset = offset
        .as_int()
        .ok_or_else(|| FaultKind::expected(op, memory::SlotKind::Int, offset.kind()))?;
    displace(base, offset)
}

/// Moves `base` by `delta` units in its region.
pub fn displace(base: Address, delta: i32) -> Result<Address, FaultKind> {
    base.offset_by(delta)
        .ok_or_else(|| FaultKind::OutOfBounds(format!("{}{:+}", base, delta)))
}

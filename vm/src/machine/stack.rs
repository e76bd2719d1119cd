use memory::StackEntry;

use crate::error::FaultKind;

/// Typed operand stack shared by every frame of a run.
///
/// `floor` is the current frame pointer: pops never reach below it, so a
/// callee can address its arguments but not consume them.
#[derive(Debug, Clone)]
pub struct OperandStack {
    slots: Vec<StackEntry>,
    max: usize,
    floor: usize,
}

impl OperandStack {
    pub fn new(max: usize) -> Self {
        Self {
            slots: Vec::with_capacity(max.min(4096)),
            max,
            floor: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn set_floor(&mut self, floor: usize) {
        self.floor = floor;
    }

    #[inline]
    pub fn as_slice(&self) -> &[StackEntry] {
        &self.slots
    }

    #[inline]
    pub fn push(&mut self, value: StackEntry) -> Result<(), FaultKind> {
        if self.slots.len() >= self.max {
            return Err(FaultKind::StackOverflow);
        }
        self.slots.push(value);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Result<StackEntry, FaultKind> {
        if self.slots.len() <= self.floor {
            return Err(FaultKind::StackUnderflow);
        }
        self.slots.pop().ok_or(FaultKind::StackUnderflow)
    }

    #[inline]
    pub fn peek(&self) -> Result<StackEntry, FaultKind> {
        if self.slots.len() <= self.floor {
            return Err(FaultKind::StackUnderflow);
        }
        self.slots.last().copied().ok_or(FaultKind::StackUnderflow)
    }

    /// Values above the floor.
    #[inline]
    pub fn depth_in_frame(&self) -> usize {
        self.slots.len().saturating_sub(self.floor)
    }

    /// Pushes `count` zeroed slots.
    pub fn reserve(&mut self, count: usize) -> Result<(), FaultKind> {
        let new_len = self
            .slots
            .len()
            .checked_add(count)
            .filter(|n| *n <= self.max)
            .ok_or(FaultKind::StackOverflow)?;
        self.slots.resize(new_len, StackEntry::default());
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<StackEntry, FaultKind> {
        self.slots
            .get(index)
            .copied()
            .ok_or_else(|| FaultKind::OutOfBounds(format!("stack slot {} of {}", index, self.slots.len())))
    }

    pub fn set(&mut self, index: usize, value: StackEntry) -> Result<(), FaultKind> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| FaultKind::OutOfBounds(format!("stack slot {} of {}", index, len)))?;
        *slot = value;
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }
}

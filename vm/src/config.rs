//! Runtime limits for one VM instance.
//!
//! The configuration only states limits; the engine enforces them.

use memory::{HeapConfig, DEFAULT_CELL_SIZE, DEFAULT_HEAP_SIZE};
use serde::Deserialize;

use crate::specs::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STACK_SLOTS};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Maximum number of operand stack slots (arguments, locals, temporaries).
    pub max_stack_slots: usize,

    /// Maximum number of unreturned calls.
    pub max_call_depth: usize,

    /// Heap arena size in bytes, rounded up to whole cells.
    pub heap_size_bytes: usize,

    /// Bytes per allocator cell.
    pub heap_cell_size: usize,

    /// Optional instruction budget per run.
    pub max_steps: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_stack_slots: DEFAULT_MAX_STACK_SLOTS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            heap_size_bytes: DEFAULT_HEAP_SIZE,
            heap_cell_size: DEFAULT_CELL_SIZE,
            max_steps: None,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heap(&self) -> HeapConfig {
        HeapConfig {
            size_bytes: self.heap_size_bytes,
            cell_size: self.heap_cell_size,
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_stack_slots(mut self, slots: usize) -> Self {
        self.max_stack_slots = slots;
        self
    }

    pub fn with_heap_size(mut self, bytes: usize) -> Self {
        self.heap_size_bytes = bytes;
        self
    }

    pub fn with_max_steps(mut self, steps: Option<u64>) -> Self {
        self.max_steps = steps;
        self
    }
}

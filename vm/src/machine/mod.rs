//! Machine module - the execution engine
//!
//! The VM context lives in `vm.rs`; each family of opcodes is handled by a
//! trait implemented for it in its own submodule.

mod addressing;
mod arithmetic;
mod control;
mod data;
mod frame;
mod stack;
mod vm;

pub use addressing::{computed, frame_slot};
pub use frame::{CallRecord, CallStack};
pub use stack::OperandStack;
pub use vm::{StepOutcome, VM};

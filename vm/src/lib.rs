pub mod assembler;
pub mod config;
pub mod disasm;
pub mod error;
pub mod loader;
pub mod machine;
pub mod opcode;
pub mod program;
pub mod specs;

pub use assembler::{AssembleError, Assembler, FnId, Label};
pub use config::VmConfig;
pub use error::{Fault, FaultKind};
pub use loader::{load_bytes, load_image, to_bytes, write_image, LoaderError};
pub use machine::{CallRecord, StepOutcome, VM};
pub use opcode::OpCode;
pub use program::{FunctionInfo, ImageError, ProgramImage};

pub use memory::{Address, SlotKind, StackEntry};

use memory::{Address, MemoryError, SlotKind};
use thiserror::Error;

/// Why a run halted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultKind {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack overflow")]
    StackOverflow,

    #[error("out-of-bounds access: {0}")]
    OutOfBounds(String),

    #[error("invalid free of {0}")]
    InvalidFree(Address),

    #[error("out of memory (requested {requested} bytes)")]
    OutOfMemory { requested: usize },

    #[error("type mismatch in {op}: {detail}")]
    TypeMismatch { op: &'static str, detail: String },

    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("malformed jump target {0}")]
    MalformedJump(u32),

    #[error("truncated instruction")]
    TruncatedInstruction,

    #[error("invalid function index {0}")]
    InvalidFunction(u16),

    #[error("division by zero")]
    DivisionByZero,

    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    #[error("instruction pointer {0} outside the code section")]
    InvalidInstructionPointer(usize),

    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),
}

impl FaultKind {
    pub fn type_mismatch(op: &'static str, detail: impl Into<String>) -> Self {
        FaultKind::TypeMismatch {
            op,
            detail: detail.into(),
        }
    }

    pub fn expected(op: &'static str, kind: SlotKind, found: SlotKind) -> Self {
        FaultKind::type_mismatch(op, format!("expected {kind}, found {found}"))
    }
}

impl From<MemoryError> for FaultKind {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::InvalidFree(address) => FaultKind::InvalidFree(address),
            MemoryError::OutOfMemory { requested } => FaultKind::OutOfMemory { requested },
            other => FaultKind::OutOfBounds(other.to_string()),
        }
    }
}

/// A fatal runtime error together with the address of the faulting instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at ip {ip}")]
pub struct Fault {
    pub kind: FaultKind,
    pub ip: usize,
}

impl Fault {
    pub fn new(kind: FaultKind, ip: usize) -> Self {
        Self { kind, ip }
    }
}

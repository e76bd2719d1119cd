use thiserror::Error;

use crate::value::Address;

/// Failures raised by the bitmap and the heap.
///
/// All of them are fatal to the running program; the VM turns them into a
/// fault carrying the instruction pointer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("bit index {index} out of bounds for bitmap of {size} cells")]
    BitIndexOutOfBounds { index: usize, size: usize },

    #[error("access of {len} byte(s) at {address} is outside the heap arena")]
    OutOfBounds { address: Address, len: usize },

    #[error("free of {0}, which is not the start of a live allocation")]
    InvalidFree(Address),

    #[error("out of memory: no run of free cells for {requested} byte(s)")]
    OutOfMemory { requested: usize },

    #[error("{0} is not a heap address")]
    RegionMismatch(Address),
}

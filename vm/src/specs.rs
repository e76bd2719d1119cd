//! Fixed constants of the VM and its binary image format.

// --- Runtime defaults ---
pub const DEFAULT_MAX_STACK_SLOTS: usize = 65_536;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1_024;

// --- SERIALIZATION CONTRACT ---
pub const IMAGE_MAGIC: &[u8; 4] = b"TRN\x01";

/// Return-kind byte meaning "the function leaves no result".
pub const SER_VOID: u8 = 0xFF;

// Loader limits against allocation bombs in malformed images.
pub const MAX_FUNCTIONS: u32 = 65_535;
pub const MAX_NAME_LEN: u32 = 1024;
pub const MAX_CODE_LEN: u32 = 16 * 1024 * 1024;

const _: () = assert!(
    MAX_FUNCTIONS <= u16::MAX as u32,
    "CALL encodes the function index as u16"
);
const _: () = assert!(SER_VOID != memory::value::KIND_INT);
const _: () = assert!(SER_VOID != memory::value::KIND_BYTE);
const _: () = assert!(SER_VOID != memory::value::KIND_REF);

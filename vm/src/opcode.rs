//! OpCode definitions for the Tarn VM
//!
//! Instructions are variable width: one opcode byte followed by a fixed,
//! per-opcode operand, little-endian.
//!
//! Format N:   [op]
//! Format B:   [op][u8]
//! Format H:   [op][u16]
//! Format W:   [op][u32]      (jump targets, reserve counts)
//! Format S:   [op][i32]      (immediates, frame offsets)

use std::fmt;

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // ===== Special =====
    /// No operation
    Nop = 0x00,

    // ===== Stack =====
    /// Push Int(imm)
    PushInt = 0x01,
    /// Push Byte(imm)
    PushByte = 0x02,
    /// Discard top
    Pop = 0x03,
    /// Duplicate top
    Dup = 0x04,
    /// Swap the two topmost values
    Swap = 0x05,
    /// Grow the current frame by N zeroed local slots
    Reserve = 0x08,

    // ===== Addressing =====
    /// Push slot[fp + off]
    Load = 0x10,
    /// slot[fp + off] = pop
    Store = 0x11,
    /// Push Ref(stack fp + off)
    Addr = 0x12,
    /// base, off -> mem[base + off] as kind
    LoadAt = 0x13,
    /// base, off, value -> mem[base + off] = value
    StoreAt = 0x14,

    // ===== Arithmetic =====
    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Div = 0x23,
    Mod = 0x24,
    Neg = 0x25,

    // ===== Comparison =====
    Eq = 0x28,
    Ne = 0x29,
    Lt = 0x2A,
    Le = 0x2B,
    Gt = 0x2C,
    Ge = 0x2D,
    /// Logical not: Byte(!truthy)
    Not = 0x2E,

    // ===== Conversion =====
    /// Int -> Byte (low 8 bits)
    IntToByte = 0x30,
    /// Byte -> Int (zero extend)
    ByteToInt = 0x31,

    // ===== Flow Control =====
    /// IP = target
    Jmp = 0x40,
    /// If !pop then IP = target
    Jz = 0x41,
    /// If pop then IP = target
    Jnz = 0x42,

    // ===== Functions =====
    /// Call function table entry
    Call = 0x48,
    /// Return to caller (or end the run)
    Ret = 0x49,

    // ===== Heap =====
    /// size -> Ref
    Alloc = 0x50,
    /// Ref ->
    Free = 0x51,
    /// src, dst, count ->
    Copy = 0x52,
}

/// Shape of the operand that follows an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLayout {
    None,
    U8,
    U16,
    U32,
    I32,
}

impl OperandLayout {
    #[inline]
    pub fn width(self) -> usize {
        match self {
            OperandLayout::None => 0,
            OperandLayout::U8 => 1,
            OperandLayout::U16 => 2,
            OperandLayout::U32 | OperandLayout::I32 => 4,
        }
    }
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(OpCode::Nop),
            0x01 => Some(OpCode::PushInt),
            0x02 => Some(OpCode::PushByte),
            0x03 => Some(OpCode::Pop),
            0x04 => Some(OpCode::Dup),
            0x05 => Some(OpCode::Swap),
            0x08 => Some(OpCode::Reserve),
            0x10 => Some(OpCode::Load),
            0x11 => Some(OpCode::Store),
            0x12 => Some(OpCode::Addr),
            0x13 => Some(OpCode::LoadAt),
            0x14 => Some(OpCode::StoreAt),
            0x20 => Some(OpCode::Add),
            0x21 => Some(OpCode::Sub),
            0x22 => Some(OpCode::Mul),
            0x23 => Some(OpCode::Div),
            0x24 => Some(OpCode::Mod),
            0x25 => Some(OpCode::Neg),
            0x28 => Some(OpCode::Eq),
            0x29 => Some(OpCode::Ne),
            0x2A => Some(OpCode::Lt),
            0x2B => Some(OpCode::Le),
            0x2C => Some(OpCode::Gt),
            0x2D => Some(OpCode::Ge),
            0x2E => Some(OpCode::Not),
            0x30 => Some(OpCode::IntToByte),
            0x31 => Some(OpCode::ByteToInt),
            0x40 => Some(OpCode::Jmp),
            0x41 => Some(OpCode::Jz),
            0x42 => Some(OpCode::Jnz),
            0x48 => Some(OpCode::Call),
            0x49 => Some(OpCode::Ret),
            0x50 => Some(OpCode::Alloc),
            0x51 => Some(OpCode::Free),
            0x52 => Some(OpCode::Copy),
            _ => None,
        }
    }

    /// Convert opcode to byte value
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn layout(self) -> OperandLayout {
        use OpCode::*;
        match self {
            PushInt | Load | Store | Addr => OperandLayout::I32,
            PushByte | LoadAt | StoreAt => OperandLayout::U8,
            Reserve | Jmp | Jz | Jnz => OperandLayout::U32,
            Call => OperandLayout::U16,
            _ => OperandLayout::None,
        }
    }

    /// Encoded size in bytes, opcode included.
    #[inline]
    pub fn size(self) -> usize {
        1 + self.layout().width()
    }

    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jmp | OpCode::Jz | OpCode::Jnz)
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::PushInt => "PUSH_INT",
            OpCode::PushByte => "PUSH_BYTE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Swap => "SWAP",
            OpCode::Reserve => "RESERVE",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Addr => "ADDR",
            OpCode::LoadAt => "LOAD_AT",
            OpCode::StoreAt => "STORE_AT",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Neg => "NEG",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::Lt => "LT",
            OpCode::Le => "LE",
            OpCode::Gt => "GT",
            OpCode::Ge => "GE",
            OpCode::Not => "NOT",
            OpCode::IntToByte => "I2B",
            OpCode::ByteToInt => "B2I",
            OpCode::Jmp => "JMP",
            OpCode::Jz => "JZ",
            OpCode::Jnz => "JNZ",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::Alloc => "ALLOC",
            OpCode::Free => "FREE",
            OpCode::Copy => "COPY",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Instruction encoding/decoding utilities
pub mod instruction {
    use byteorder::{ByteOrder, LittleEndian};

    use super::{OpCode, OperandLayout};
    use crate::error::FaultKind;

    /// Decoded operand value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Operand {
        None,
        U8(u8),
        U16(u16),
        U32(u32),
        I32(i32),
    }

    impl Operand {
        #[inline]
        pub fn as_i32(self) -> i32 {
            match self {
                Operand::I32(v) => v,
                Operand::U32(v) => v as i32,
                Operand::U16(v) => v as i32,
                Operand::U8(v) => v as i32,
                Operand::None => 0,
            }
        }

        #[inline]
        pub fn as_u32(self) -> u32 {
            match self {
                Operand::U32(v) => v,
                Operand::I32(v) => v as u32,
                Operand::U16(v) => v as u32,
                Operand::U8(v) => v as u32,
                Operand::None => 0,
            }
        }
    }

    /// One decoded instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Instruction {
        pub op: OpCode,
        pub operand: Operand,
    }

    impl Instruction {
        #[inline]
        pub fn size(&self) -> usize {
            self.op.size()
        }
    }

    /// Decode the instruction starting at `ip`.
    pub fn decode(code: &[u8], ip: usize) -> Result<Instruction, FaultKind> {
        let byte = *code.get(ip).ok_or(FaultKind::InvalidInstructionPointer(ip))?;
        let op = OpCode::from_u8(byte).ok_or(FaultKind::UnknownOpcode(byte))?;
        let layout = op.layout();
        let start = ip + 1;
        let bytes = code
            .get(start..start + layout.width())
            .ok_or(FaultKind::TruncatedInstruction)?;

        let operand = match layout {
            OperandLayout::None => Operand::None,
            OperandLayout::U8 => Operand::U8(bytes[0]),
            OperandLayout::U16 => Operand::U16(LittleEndian::read_u16(bytes)),
            OperandLayout::U32 => Operand::U32(LittleEndian::read_u32(bytes)),
            OperandLayout::I32 => Operand::I32(LittleEndian::read_i32(bytes)),
        };
        Ok(Instruction { op, operand })
    }

    /// Append an operand-less instruction.
    #[inline]
    pub fn encode(code: &mut Vec<u8>, op: OpCode) {
        debug_assert_eq!(op.layout(), OperandLayout::None);
        code.push(op.as_u8());
    }

    #[inline]
    pub fn encode_u8(code: &mut Vec<u8>, op: OpCode, value: u8) {
        debug_assert_eq!(op.layout(), OperandLayout::U8);
        code.push(op.as_u8());
        code.push(value);
    }

    #[inline]
    pub fn encode_u16(code: &mut Vec<u8>, op: OpCode, value: u16) {
        debug_assert_eq!(op.layout(), OperandLayout::U16);
        code.push(op.as_u8());
        code.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn encode_u32(code: &mut Vec<u8>, op: OpCode, value: u32) {
        debug_assert_eq!(op.layout(), OperandLayout::U32);
        code.push(op.as_u8());
        code.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn encode_i32(code: &mut Vec<u8>, op: OpCode, value: i32) {
        debug_assert_eq!(op.layout(), OperandLayout::I32);
        code.push(op.as_u8());
        code.extend_from_slice(&value.to_le_bytes());
    }
}

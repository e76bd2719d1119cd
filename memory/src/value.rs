use std::fmt;

// --- Address layout ---
// Bit 31      = region (0 = operand stack, 1 = heap)
// Bits 30..0  = payload (stack slot index, or heap byte offset)

const REGION_SHIFT: u32 = 31;
pub const HEAP_REGION_BIT: u32 = 1 << REGION_SHIFT;
pub const ADDRESS_PAYLOAD_MASK: u32 = HEAP_REGION_BIT - 1; // 0x7FFF_FFFF

// Slot kind bytes, shared by the binary image format and the LOAD_AT/STORE_AT operand.
pub const KIND_INT: u8 = 0;
pub const KIND_BYTE: u8 = 1;
pub const KIND_REF: u8 = 2;

const _: () = assert!(HEAP_REGION_BIT == 0x8000_0000, "region bit must be the top bit");
const _: () = assert!(KIND_REF < 0xFF, "0xFF is reserved for 'void' in the image format");

/// Which half of the address space an [`Address`] points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Stack,
    Heap,
}

/// A 32-bit address into either the operand stack or the heap arena.
///
/// Stack addresses count slots, heap addresses count bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Address(u32);

impl Address {
    #[inline]
    pub fn stack(slot: u32) -> Self {
        Address(slot & ADDRESS_PAYLOAD_MASK)
    }

    #[inline]
    pub fn heap(offset: u32) -> Self {
        Address(HEAP_REGION_BIT | (offset & ADDRESS_PAYLOAD_MASK))
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Address(bits)
    }

    #[inline]
    pub fn to_bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn region(self) -> Region {
        if self.0 & HEAP_REGION_BIT != 0 {
            Region::Heap
        } else {
            Region::Stack
        }
    }

    #[inline]
    pub fn is_heap(self) -> bool {
        self.region() == Region::Heap
    }

    /// Slot index or byte offset, depending on the region.
    #[inline]
    pub fn payload(self) -> u32 {
        self.0 & ADDRESS_PAYLOAD_MASK
    }

    /// Moves the address by `delta` units inside its own region.
    ///
    /// Returns `None` when the result would be negative or would spill into
    /// the other region.
    pub fn offset_by(self, delta: i32) -> Option<Self> {
        let moved = (self.payload() as i64).checked_add(delta as i64)?;
        if moved < 0 || moved > ADDRESS_PAYLOAD_MASK as i64 {
            return None;
        }
        Some(match self.region() {
            Region::Stack => Address::stack(moved as u32),
            Region::Heap => Address::heap(moved as u32),
        })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.region() {
            Region::Stack => write!(f, "stack[{}]", self.payload()),
            Region::Heap => write!(f, "heap+{:#x}", self.payload()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static type of a slot, as assigned by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Int,
    Byte,
    Ref,
}

impl SlotKind {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            KIND_INT => Some(SlotKind::Int),
            KIND_BYTE => Some(SlotKind::Byte),
            KIND_REF => Some(SlotKind::Ref),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            SlotKind::Int => KIND_INT,
            SlotKind::Byte => KIND_BYTE,
            SlotKind::Ref => KIND_REF,
        }
    }

    /// Number of heap bytes one value of this kind occupies.
    #[inline]
    pub fn width(self) -> usize {
        match self {
            SlotKind::Int | SlotKind::Ref => 4,
            SlotKind::Byte => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SlotKind::Int => "int",
            SlotKind::Byte => "byte",
            SlotKind::Ref => "ref",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value on the operand stack or in a frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackEntry {
    Int(i32),
    Byte(u8),
    Ref(Address),
}

impl Default for StackEntry {
    fn default() -> Self {
        StackEntry::Int(0)
    }
}

impl StackEntry {
    #[inline]
    pub fn kind(&self) -> SlotKind {
        match self {
            StackEntry::Int(_) => SlotKind::Int,
            StackEntry::Byte(_) => SlotKind::Byte,
            StackEntry::Ref(_) => SlotKind::Ref,
        }
    }

    /// Zero value of a kind. `Ref` zeroes to the stack base address.
    pub fn zero(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Int => StackEntry::Int(0),
            SlotKind::Byte => StackEntry::Byte(0),
            SlotKind::Ref => StackEntry::Ref(Address::stack(0)),
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            StackEntry::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            StackEntry::Byte(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            StackEntry::Ref(a) => Some(*a),
            _ => None,
        }
    }

    /// Condition test used by JZ/JNZ/NOT. References are not conditions.
    #[inline]
    pub fn truthy(&self) -> Option<bool> {
        match self {
            StackEntry::Int(n) => Some(*n != 0),
            StackEntry::Byte(b) => Some(*b != 0),
            StackEntry::Ref(_) => None,
        }
    }

    /// Narrows an integer to its low 8 bits.
    #[inline]
    pub fn narrow(n: i32) -> Self {
        StackEntry::Byte(n as u8)
    }

    /// Little-endian encoding of the value at its heap width.
    pub fn to_le_bytes(&self) -> ([u8; 4], usize) {
        match self {
            StackEntry::Int(n) => (n.to_le_bytes(), 4),
            StackEntry::Byte(b) => ([*b, 0, 0, 0], 1),
            StackEntry::Ref(a) => (a.to_bits().to_le_bytes(), 4),
        }
    }

    /// Decodes a value of `kind` from the front of `bytes`.
    ///
    /// `bytes` must be at least `kind.width()` long.
    pub fn from_le_bytes(kind: SlotKind, bytes: &[u8]) -> Self {
        match kind {
            SlotKind::Int => {
                StackEntry::Int(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            SlotKind::Byte => StackEntry::Byte(bytes[0]),
            SlotKind::Ref => StackEntry::Ref(Address::from_bits(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
        }
    }
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEntry::Int(n) => write!(f, "Int({})", n),
            StackEntry::Byte(b) => write!(f, "Byte({})", b),
            StackEntry::Ref(a) => write!(f, "Ref({})", a),
        }
    }
}

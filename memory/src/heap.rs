use std::collections::BTreeMap;

use tracing::trace;

use crate::bitmap::Bitmap;
use crate::error::MemoryError;
use crate::value::{Address, Region, SlotKind, StackEntry, ADDRESS_PAYLOAD_MASK};

pub const DEFAULT_HEAP_SIZE: usize = 1024 * 1024; // 1MB
pub const DEFAULT_CELL_SIZE: usize = 8;

/// Geometry of a heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    pub size_bytes: usize,
    pub cell_size: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            size_bytes: DEFAULT_HEAP_SIZE,
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

/// Explicit alloc/free heap backed by a byte arena and a cell bitmap.
///
/// Addresses handed out are heap-region [`Address`]es whose payload is the
/// byte offset of the block's first cell. There is no collector: a block
/// lives until the program frees it.
#[derive(Debug, Clone)]
pub struct Heap {
    arena: Box<[u8]>,
    cells: Bitmap,
    cell_size: usize,
    /// start cell -> cell count, for every live block
    blocks: BTreeMap<usize, usize>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    /// Builds an arena of `size_bytes` rounded up to whole cells.
    ///
    /// The arena is clamped to the 31-bit heap address range.
    pub fn with_config(config: HeapConfig) -> Self {
        let cell_size = config.cell_size.max(1);
        let max_bytes = ADDRESS_PAYLOAD_MASK as usize + 1;
        let cell_count = config.size_bytes.min(max_bytes).div_ceil(cell_size);
        let cell_count = cell_count.min(max_bytes / cell_size);
        Self {
            arena: vec![0u8; cell_count * cell_size].into_boxed_slice(),
            cells: Bitmap::new(cell_count),
            cell_size,
            blocks: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> usize {
        self.cell_size
    }

    /// Arena size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Used/free state per cell.
    #[inline]
    pub fn cells(&self) -> &Bitmap {
        &self.cells
    }

    #[inline]
    pub fn used_cells(&self) -> usize {
        self.cells.cardinality()
    }

    /// Number of live blocks.
    #[inline]
    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Cell count of the live block starting at `address`, if any.
    pub fn block_len(&self, address: Address) -> Option<usize> {
        let cell = self.block_start(address)?;
        self.blocks.get(&cell).copied()
    }

    fn block_start(&self, address: Address) -> Option<usize> {
        if !address.is_heap() {
            return None;
        }
        let offset = address.payload() as usize;
        if offset % self.cell_size != 0 {
            return None;
        }
        Some(offset / self.cell_size)
    }

    /// Reserves the first run of free cells that holds `size` bytes.
    pub fn alloc(&mut self, size: usize) -> Result<Address, MemoryError> {
        let needed = size.div_ceil(self.cell_size).max(1);
        let start = self
            .cells
            .find_clear_run(needed)
            .ok_or(MemoryError::OutOfMemory { requested: size })?;
        self.cells.set_range(start, needed, true)?;
        self.blocks.insert(start, needed);

        let from = start * self.cell_size;
        let to = from + needed * self.cell_size;
        self.arena[from..to].fill(0);

        let address = Address::heap(from as u32);
        trace!(%address, size, cells = needed, "heap alloc");
        Ok(address)
    }

    /// Releases the block starting at `address`.
    ///
    /// Anything other than the exact start of a live block is rejected and
    /// the bitmap is left as it was.
    pub fn free(&mut self, address: Address) -> Result<(), MemoryError> {
        let start = self
            .block_start(address)
            .ok_or(MemoryError::InvalidFree(address))?;
        let len = self
            .blocks
            .remove(&start)
            .ok_or(MemoryError::InvalidFree(address))?;
        self.cells.set_range(start, len, false)?;
        trace!(%address, cells = len, "heap free");
        Ok(())
    }

    /// Copies `count` bytes from `src` to `dst`.
    ///
    /// Both ranges must lie inside the arena; they need not lie inside live
    /// blocks. Overlapping ranges behave like `memmove`.
    pub fn copy(&mut self, src: Address, dst: Address, count: usize) -> Result<(), MemoryError> {
        let from = self.range(src, count)?;
        let to = self.range(dst, count)?;
        self.arena.copy_within(from, to.start);
        Ok(())
    }

    fn range(&self, address: Address, len: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        if address.region() != Region::Heap {
            return Err(MemoryError::RegionMismatch(address));
        }
        let start = address.payload() as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.arena.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds { address, len }),
        }
    }

    pub fn read_bytes(&self, address: Address, len: usize) -> Result<&[u8], MemoryError> {
        let range = self.range(address, len)?;
        Ok(&self.arena[range])
    }

    pub fn write_bytes(&mut self, address: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = self.range(address, bytes.len())?;
        self.arena[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Reads a value of `kind` (little-endian, `kind.width()` bytes).
    pub fn read(&self, address: Address, kind: SlotKind) -> Result<StackEntry, MemoryError> {
        let bytes = self.read_bytes(address, kind.width())?;
        Ok(StackEntry::from_le_bytes(kind, bytes))
    }

    /// Writes `value` at its own width.
    pub fn write(&mut self, address: Address, value: StackEntry) -> Result<(), MemoryError> {
        let (bytes, width) = value.to_le_bytes();
        self.write_bytes(address, &bytes[..width])
    }
}

//! Cell bitmap - one bit of used/free state per heap cell.
//!
//! Bits are packed 32 per `u32` word, least-significant bit first.
//! The structure never allocates after construction.

use crate::error::MemoryError;

const WORD_BITS: usize = u32::BITS as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    words: Box<[u32]>,
    size: usize,
}

impl Bitmap {
    /// Creates a bitmap of `size` cells, all clear.
    pub fn new(size: usize) -> Self {
        let word_count = size.div_ceil(WORD_BITS);
        Self {
            words: vec![0u32; word_count].into_boxed_slice(),
            size,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    fn check(&self, index: usize) -> Result<(), MemoryError> {
        if index >= self.size {
            return Err(MemoryError::BitIndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    #[inline]
    fn locate(index: usize) -> (usize, u32) {
        (index / WORD_BITS, 1u32 << (index % WORD_BITS))
    }

    pub fn get(&self, index: usize) -> Result<bool, MemoryError> {
        self.check(index)?;
        let (word, mask) = Self::locate(index);
        Ok(self.words[word] & mask != 0)
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), MemoryError> {
        self.check(index)?;
        let (word, mask) = Self::locate(index);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
        Ok(())
    }

    /// Sets or clears `len` consecutive cells starting at `start`.
    ///
    /// Whole words inside the range are written in one store.
    pub fn set_range(&mut self, start: usize, len: usize, value: bool) -> Result<(), MemoryError> {
        if len == 0 {
            return Ok(());
        }
        let end = start
            .checked_add(len)
            .ok_or(MemoryError::BitIndexOutOfBounds {
                index: usize::MAX,
                size: self.size,
            })?;
        self.check(end - 1)?;

        let mut index = start;
        while index < end {
            let (word, _) = Self::locate(index);
            let bit = index % WORD_BITS;
            let span = (WORD_BITS - bit).min(end - index);
            let mask = if span == WORD_BITS {
                u32::MAX
            } else {
                ((1u32 << span) - 1) << bit
            };
            if value {
                self.words[word] |= mask;
            } else {
                self.words[word] &= !mask;
            }
            index += span;
        }
        Ok(())
    }

    /// Number of set cells, summed per word.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Lazy pass over every cell in index order. Call again to restart.
    pub fn iter(&self) -> Bits<'_> {
        Bits {
            bitmap: self,
            index: 0,
        }
    }

    /// First index of `len` consecutive clear cells (first fit).
    pub fn find_clear_run(&self, len: usize) -> Option<usize> {
        if len == 0 || len > self.size {
            return None;
        }
        let mut run_start = 0;
        let mut run_len = 0;
        for (index, used) in self.iter().enumerate() {
            if used {
                run_len = 0;
                run_start = index + 1;
                continue;
            }
            run_len += 1;
            if run_len == len {
                return Some(run_start);
            }
        }
        None
    }

    /// Raw words, for diagnostics and equality checks in tests.
    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl<'a> IntoIterator for &'a Bitmap {
    type Item = bool;
    type IntoIter = Bits<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the cells of a [`Bitmap`].
#[derive(Debug, Clone)]
pub struct Bits<'a> {
    bitmap: &'a Bitmap,
    index: usize,
}

impl Iterator for Bits<'_> {
    type Item = bool;

    #[inline]
    fn next(&mut self) -> Option<bool> {
        if self.index >= self.bitmap.size {
            return None;
        }
        let (word, mask) = Bitmap::locate(self.index);
        self.index += 1;
        Some(self.bitmap.words[word] & mask != 0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bitmap.size - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Bits<'_> {}

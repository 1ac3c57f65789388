//! Generation-tracked byte and word views over guest memory.

use super::{LinearMemory, RegionId};
use crate::error::{BridgeError, Result};
use crate::types::GuestPtr;

/// Cache of the typed views the bridge uses to access guest memory.
///
/// A view is rebuilt only when it is absent or the region it was built over
/// no longer matches the guest's current memory. Every observed change of
/// region bumps the generation; views carry the generation they belong to.
///
/// Views borrow the memory they were derived from, so the borrow checker
/// rejects any attempt to keep one alive across a guest call. Each access
/// path therefore goes through this cache and is checked before use.
#[derive(Debug, Default)]
pub struct MemoryViews {
    /// Region the byte view was last built over.
    byte: Option<RegionId>,
    /// Region the word view was last built over.
    word: Option<RegionId>,
    /// Most recent region observed through any view.
    current: Option<RegionId>,
    /// Number of region changes observed.
    generation: u64,
    byte_rebuilds: u64,
    word_rebuilds: u64,
}

impl MemoryViews {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the memory region was observed to move or grow.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of times the byte view was (re)built.
    pub fn byte_rebuilds(&self) -> u64 {
        self.byte_rebuilds
    }

    /// Number of times the word view was (re)built.
    pub fn word_rebuilds(&self) -> u64 {
        self.word_rebuilds
    }

    /// Byte view for reading.
    pub fn bytes<'m, M: LinearMemory + ?Sized>(&mut self, mem: &'m M) -> ByteView<'m> {
        self.refresh_byte(mem.region());
        ByteView {
            bytes: mem.bytes(),
            generation: self.generation,
        }
    }

    /// Byte view for writing.
    pub fn bytes_mut<'m, M: LinearMemory + ?Sized>(&mut self, mem: &'m mut M) -> ByteViewMut<'m> {
        self.refresh_byte(mem.region());
        ByteViewMut {
            bytes: mem.bytes_mut(),
            generation: self.generation,
        }
    }

    /// 32-bit word view for reading.
    pub fn words<'m, M: LinearMemory + ?Sized>(&mut self, mem: &'m M) -> WordView<'m> {
        let region = mem.region();
        self.observe(region);
        if self.word != Some(region) {
            self.word = Some(region);
            self.word_rebuilds += 1;
            tracing::trace!(
                generation = self.generation,
                size = region.len,
                "Rebuilt word view"
            );
        }
        WordView {
            bytes: mem.bytes(),
            generation: self.generation,
        }
    }

    fn refresh_byte(&mut self, region: RegionId) {
        self.observe(region);
        if self.byte != Some(region) {
            self.byte = Some(region);
            self.byte_rebuilds += 1;
            tracing::trace!(
                generation = self.generation,
                size = region.len,
                "Rebuilt byte view"
            );
        }
    }

    fn observe(&mut self, region: RegionId) {
        if let Some(previous) = self.current {
            if previous != region {
                self.generation += 1;
                tracing::debug!(
                    generation = self.generation,
                    old_size = previous.len,
                    new_size = region.len,
                    "Guest memory moved"
                );
            }
        }
        self.current = Some(region);
    }
}

/// Read-only 8-bit view over guest memory.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'m> {
    bytes: &'m [u8],
    generation: u64,
}

impl<'m> ByteView<'m> {
    /// Generation this view was derived at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size of the viewed memory in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the viewed memory is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the bytes addressed by `ptr`.
    pub fn read(&self, ptr: GuestPtr) -> Result<&'m [u8]> {
        let range = ptr.range(self.bytes.len())?;
        Ok(&self.bytes[range])
    }
}

/// Writable 8-bit view over guest memory.
#[derive(Debug)]
pub struct ByteViewMut<'m> {
    bytes: &'m mut [u8],
    generation: u64,
}

impl ByteViewMut<'_> {
    /// Generation this view was derived at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size of the viewed memory in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the viewed memory is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Mutable access to the bytes addressed by `ptr`.
    pub fn slice_mut(&mut self, ptr: GuestPtr) -> Result<&mut [u8]> {
        let range = ptr.range(self.bytes.len())?;
        Ok(&mut self.bytes[range])
    }

    /// Copy `data` into guest memory starting at `offset`.
    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| BridgeError::OutOfBounds {
            offset,
            len: u32::MAX,
            memory: self.bytes.len(),
        })?;
        self.slice_mut(GuestPtr::new(offset, len))?
            .copy_from_slice(data);
        Ok(())
    }
}

/// Read-only 32-bit word view over guest memory.
///
/// Word `i` covers bytes `4 * i .. 4 * i + 4`, little endian, matching the
/// guest's native layout.
#[derive(Debug, Clone, Copy)]
pub struct WordView<'m> {
    bytes: &'m [u8],
    generation: u64,
}

impl WordView<'_> {
    /// Generation this view was derived at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of whole words in the view.
    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    /// Check if the view holds no whole word.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read word `index`.
    pub fn get(&self, index: u32) -> Result<u32> {
        let offset = index.checked_mul(4).ok_or(BridgeError::OutOfBounds {
            offset: u32::MAX,
            len: 4,
            memory: self.bytes.len(),
        })?;
        let range = GuestPtr::new(offset, 4).range(self.bytes.len())?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[range]);
        Ok(u32::from_le_bytes(word))
    }

    /// Read the (pointer, length) pair stored in the two words at byte offset `at`.
    ///
    /// `at` must be 4-byte aligned.
    pub fn read_pair(&self, at: u32) -> Result<GuestPtr> {
        if at % 4 != 0 {
            return Err(BridgeError::contract(
                "scratch",
                format!("return slot 0x{:08x} is not word aligned", at),
            ));
        }
        let index = at / 4;
        let offset = self.get(index)?;
        let len = self.get(index + 1)?;
        Ok(GuestPtr::new(offset, len))
    }
}

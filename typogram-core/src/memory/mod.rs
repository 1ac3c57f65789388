//! Guest linear memory and the typed views the bridge reads it through.
//!
//! Guest memory is addressed purely by `u32` offsets. Any call into the guest
//! may grow (and therefore move) the region, so views are never held across
//! calls; [`MemoryViews`] re-derives them and records when the region moved.

mod views;

pub use views::{ByteView, ByteViewMut, MemoryViews, WordView};

/// Identity of a linear memory region.
///
/// Two identities compare equal only if both the base address and the byte
/// length match. Growing a memory changes its length even when the engine
/// keeps the base address stable, so growth is always observed as a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId {
    /// Host address of the first byte.
    pub base: usize,
    /// Size of the region in bytes.
    pub len: usize,
}

impl RegionId {
    /// Identity of the region backing `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            base: bytes.as_ptr() as usize,
            len: bytes.len(),
        }
    }
}

/// A contiguous, growable linear memory owned by a guest module.
pub trait LinearMemory {
    /// Current contents of the memory.
    fn bytes(&self) -> &[u8];

    /// Current contents of the memory, mutable.
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Identity of the current backing region.
    fn region(&self) -> RegionId {
        RegionId::of(self.bytes())
    }

    /// Current size in bytes.
    fn size(&self) -> usize {
        self.bytes().len()
    }
}

impl LinearMemory for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self
    }
}

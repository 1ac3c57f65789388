//! A guest module simulated in host memory.

use crate::error::{BridgeError, Result};
use crate::guest::GuestModule;
use crate::memory::LinearMemory;
use crate::types::GuestPtr;
use std::collections::HashMap;

/// Initial shadow stack cursor; the stack occupies `0..DEFAULT_STACK_TOP`.
pub const DEFAULT_STACK_TOP: u32 = 1024;

/// Initial heap size above the stack.
pub const DEFAULT_HEAP_SIZE: u32 = 4096;

/// Block alignment of the bump allocator.
const ALIGN: u32 = 8;

type Transform = Box<dyn FnMut(&str) -> Vec<u8> + Send>;

/// How the simulated allocator answers reallocation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReallocMode {
    /// Allocate a new block and copy the old contents, like a real allocator.
    Copying,
    /// No reallocation export at all.
    Missing,
    /// Allocate a new block without copying (breaks the allocator contract).
    Lossy,
}

/// Allocator call counters of a [`SimulatedGuest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocStats {
    /// Blocks allocated (host `malloc` calls plus the guest's own).
    pub mallocs: u64,
    /// Reallocation calls.
    pub reallocs: u64,
    /// Blocks released (host `free` calls plus the guest's own).
    pub frees: u64,
    /// Times the linear memory grew.
    pub growths: u64,
    /// Blocks currently allocated.
    pub live: usize,
}

/// In-process guest with a relocating `Vec<u8>` linear memory.
pub struct SimulatedGuest {
    memory: Vec<u8>,
    heap_top: u32,
    stack_pointer: u32,
    blocks: HashMap<u32, u32>,
    stats: AllocStats,
    realloc: ReallocMode,
    transform: Transform,
    grow_on_convert: bool,
    trap_on_convert: bool,
    trap_on_free: bool,
}

impl SimulatedGuest {
    /// Create a guest whose conversion applies `transform` to the input text.
    pub fn new<F>(transform: F) -> Self
    where
        F: FnMut(&str) -> Vec<u8> + Send + 'static,
    {
        Self {
            memory: vec![0; (DEFAULT_STACK_TOP + DEFAULT_HEAP_SIZE) as usize],
            heap_top: DEFAULT_STACK_TOP,
            stack_pointer: DEFAULT_STACK_TOP,
            blocks: HashMap::new(),
            stats: AllocStats::default(),
            realloc: ReallocMode::Copying,
            transform: Box::new(transform),
            grow_on_convert: false,
            trap_on_convert: false,
            trap_on_free: false,
        }
    }

    /// Create a guest that returns its input unchanged.
    pub fn echo() -> Self {
        Self::new(|input| input.as_bytes().to_vec())
    }

    /// Create a guest that always returns `output`, valid UTF-8 or not.
    pub fn with_output(output: Vec<u8>) -> Self {
        Self::new(move |_| output.clone())
    }

    /// Drop the reallocation export, forcing the fixed encoding strategy.
    pub fn without_realloc(mut self) -> Self {
        self.realloc = ReallocMode::Missing;
        self
    }

    /// Make reallocation forget the old contents.
    pub fn with_lossy_realloc(mut self) -> Self {
        self.realloc = ReallocMode::Lossy;
        self
    }

    /// Grow (and relocate) memory inside every conversion call.
    pub fn with_growth_on_convert(mut self) -> Self {
        self.grow_on_convert = true;
        self
    }

    /// Make every conversion call trap.
    pub fn with_trapping_convert(mut self) -> Self {
        self.trap_on_convert = true;
        self
    }

    /// Make every host `free` call trap.
    pub fn with_trapping_free(mut self) -> Self {
        self.trap_on_free = true;
        self
    }

    /// Set the initial heap size.
    pub fn with_heap_size(mut self, size: u32) -> Self {
        let len = self.heap_top as usize + size as usize;
        self.memory.resize(len, 0);
        self.memory.shrink_to_fit();
        self
    }

    /// Move the shadow stack cursor.
    pub fn with_stack_top(mut self, top: u32) -> Self {
        self.stack_pointer = top;
        self
    }

    /// Allocator counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            live: self.blocks.len(),
            ..self.stats
        }
    }

    /// Size of a live block, if `ptr` is one.
    pub fn block_size(&self, ptr: u32) -> Option<u32> {
        self.blocks.get(&ptr).copied()
    }

    /// Grow memory to at least `min_len` bytes, always relocating it.
    pub fn grow(&mut self, min_len: usize) {
        let new_len = min_len.max(self.memory.len() * 2).next_multiple_of(ALIGN as usize);
        // Build the new arena before dropping the old one so the base moves.
        let mut grown = Vec::with_capacity(new_len);
        grown.extend_from_slice(&self.memory);
        grown.resize(new_len, 0);
        self.memory = grown;
        self.stats.growths += 1;
    }

    fn allocate(&mut self, size: u32) -> Result<u32> {
        let ptr = self.heap_top;
        let end = ptr
            .checked_add(size.max(1))
            .map(|end| end.next_multiple_of(ALIGN))
            .ok_or_else(|| BridgeError::trap("malloc", "out of memory"))?;
        if end as usize > self.memory.len() {
            self.grow(end as usize);
        }
        self.heap_top = end;
        self.blocks.insert(ptr, size);
        self.stats.mallocs += 1;
        Ok(ptr)
    }

    fn release(&mut self, function: &str, ptr: u32) -> Result<u32> {
        let size = self.blocks.remove(&ptr).ok_or_else(|| {
            BridgeError::trap(function, format!("0x{:08x} is not a live block", ptr))
        })?;
        self.stats.frees += 1;
        Ok(size)
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let len = crate::types::guest_len(data.len(), "write")?;
        let range = GuestPtr::new(offset, len).range(self.memory.len())?;
        self.memory[range].copy_from_slice(data);
        Ok(())
    }
}

impl LinearMemory for SimulatedGuest {
    fn bytes(&self) -> &[u8] {
        &self.memory
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

impl GuestModule for SimulatedGuest {
    fn malloc(&mut self, size: u32) -> Result<u32> {
        self.allocate(size)
    }

    fn has_realloc(&self) -> bool {
        self.realloc != ReallocMode::Missing
    }

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32) -> Result<u32> {
        if self.realloc == ReallocMode::Missing {
            return Err(BridgeError::MissingExport {
                kind: "function",
                name: "realloc".to_string(),
                cause: "simulated guest has no realloc".to_string(),
            });
        }
        self.stats.reallocs += 1;

        let new_ptr = self.allocate(new_size)?;
        // A realloc is one block moving, not a new allocation.
        self.stats.mallocs -= 1;
        self.blocks.remove(&ptr).ok_or_else(|| {
            BridgeError::trap("realloc", format!("0x{:08x} is not a live block", ptr))
        })?;

        if self.realloc == ReallocMode::Copying {
            let keep = old_size.min(new_size) as usize;
            let src = ptr as usize;
            self.memory
                .copy_within(src..src + keep, new_ptr as usize);
        }
        Ok(new_ptr)
    }

    fn free(&mut self, ptr: u32, _size: u32) -> Result<()> {
        if self.trap_on_free {
            return Err(BridgeError::trap("free", "unreachable executed"));
        }
        self.release("free", ptr).map(|_| ())
    }

    fn convert(&mut self, ret_ptr: u32, ptr: u32, len: u32) -> Result<()> {
        if self.trap_on_convert {
            return Err(BridgeError::trap("convert", "unreachable executed"));
        }

        let range = GuestPtr::new(ptr, len).range(self.memory.len())?;
        let input = std::str::from_utf8(&self.memory[range])
            .map_err(|e| BridgeError::trap("convert", format!("input is not UTF-8: {}", e)))?
            .to_owned();
        // The guest owns its input from here on.
        self.release("convert", ptr)?;

        let output = (self.transform)(&input);
        if self.grow_on_convert {
            let min_len = self.memory.len() + 1;
            self.grow(min_len);
        }

        let out_len = crate::types::guest_len(output.len(), "convert")?;
        let out_ptr = self.allocate(out_len)?;
        self.write(out_ptr, &output)?;

        let mut pair = [0u8; 8];
        pair[..4].copy_from_slice(&out_ptr.to_le_bytes());
        pair[4..].copy_from_slice(&out_len.to_le_bytes());
        self.write(ret_ptr, &pair)
    }

    fn stack_pointer(&mut self) -> Result<u32> {
        Ok(self.stack_pointer)
    }

    fn set_stack_pointer(&mut self, value: u32) -> Result<()> {
        self.stack_pointer = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_distinct() {
        let mut guest = SimulatedGuest::echo();
        let a = guest.malloc(0).unwrap();
        let b = guest.malloc(3).unwrap();
        let c = guest.malloc(0).unwrap();
        assert_eq!(a % ALIGN, 0);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(guest.stats().live, 3);
    }

    #[test]
    fn growth_relocates_memory() {
        let mut guest = SimulatedGuest::echo().with_heap_size(16);
        let before = guest.region();
        guest.malloc(64).unwrap();
        let after = guest.region();
        assert_ne!(before.base, after.base);
        assert_eq!(guest.stats().growths, 1);
    }

    #[test]
    fn realloc_copies_prefix() {
        let mut guest = SimulatedGuest::echo();
        let ptr = guest.malloc(2).unwrap();
        guest.write(ptr, b"ok").unwrap();
        let moved = guest.realloc(ptr, 2, 6).unwrap();
        assert_eq!(&guest.bytes()[moved as usize..moved as usize + 2], b"ok");
        assert_eq!(guest.block_size(moved), Some(6));
        assert_eq!(guest.block_size(ptr), None);
        assert_eq!(guest.stats().mallocs, 1);
        assert_eq!(guest.stats().reallocs, 1);
    }

    #[test]
    fn double_free_is_detected() {
        let mut guest = SimulatedGuest::echo();
        let ptr = guest.malloc(4).unwrap();
        guest.free(ptr, 4).unwrap();
        assert!(guest.free(ptr, 4).is_err());
    }

    #[test]
    fn trapping_free_keeps_block() {
        let mut guest = SimulatedGuest::echo().with_trapping_free();
        let ptr = guest.malloc(4).unwrap();
        let err = guest.free(ptr, 4).unwrap_err();
        assert_eq!(err.code(), "E401");
        assert_eq!(guest.block_size(ptr), Some(4));
    }

    #[test]
    fn convert_takes_input_and_writes_pair() {
        let mut guest = SimulatedGuest::new(|s| format!("<{s}>").into_bytes());
        let ptr = guest.malloc(2).unwrap();
        guest.write(ptr, b"hi").unwrap();
        guest.convert(16, ptr, 2).unwrap();

        let out_ptr = u32::from_le_bytes(guest.bytes()[16..20].try_into().unwrap());
        let out_len = u32::from_le_bytes(guest.bytes()[20..24].try_into().unwrap());
        assert_eq!(out_len, 4);
        let start = out_ptr as usize;
        assert_eq!(&guest.bytes()[start..start + 4], b"<hi>");
        assert_eq!(guest.block_size(ptr), None);
        assert_eq!(guest.stats().live, 1);
    }
}

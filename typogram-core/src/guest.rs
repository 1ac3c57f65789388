//! The guest module ABI the bridge drives.
//!
//! A guest exposes a growable linear memory plus a small set of functions:
//!
//! ```text
//! malloc(size) -> ptr
//! realloc(ptr, old_size, new_size) -> ptr      // optional
//! free(ptr, size)
//! convert(ret_ptr, ptr, len)                   // writes (ptr, len) at ret_ptr
//! stack pointer: mutable i32 global
//! ```
//!
//! Any of the calls may grow the memory. Offsets stay valid across growth;
//! host views over the memory do not.

use crate::error::Result;
use crate::memory::LinearMemory;

/// A guest module the bridge can marshal strings into and out of.
pub trait GuestModule: LinearMemory {
    /// Allocate `size` bytes, returning the offset of the block.
    fn malloc(&mut self, size: u32) -> Result<u32>;

    /// Check if the guest exports a reallocation function.
    fn has_realloc(&self) -> bool;

    /// Grow (or shrink) a block, preserving its first `min(old_size, new_size)` bytes.
    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32) -> Result<u32>;

    /// Release a block previously returned by `malloc`/`realloc`.
    fn free(&mut self, ptr: u32, size: u32) -> Result<()>;

    /// Run the conversion. The guest takes ownership of the input block and
    /// stores the result pair in the two words at `ret_ptr`.
    fn convert(&mut self, ret_ptr: u32, ptr: u32, len: u32) -> Result<()>;

    /// Read the shadow stack cursor.
    fn stack_pointer(&mut self) -> Result<u32>;

    /// Overwrite the shadow stack cursor.
    fn set_stack_pointer(&mut self, value: u32) -> Result<()>;
}

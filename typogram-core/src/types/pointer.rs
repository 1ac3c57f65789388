//! Offset-based pointers into guest linear memory.

use crate::error::{BridgeError, Result};
use std::fmt;

/// Size of the scratch frame reserved on the guest stack for one call.
pub const SCRATCH_SIZE: u32 = 16;

/// A (pointer, length) pair addressing bytes inside guest linear memory.
///
/// Both fields are byte counts. The length is always explicit; guest strings
/// are never terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GuestPtr {
    /// Offset within guest linear memory.
    pub offset: u32,
    /// Length of the data in bytes.
    pub len: u32,
}

impl GuestPtr {
    /// Create a new guest pointer.
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Check if the range holds no bytes.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the end offset (offset + len), checking for overflow.
    pub fn end(&self) -> Result<u32> {
        self.offset
            .checked_add(self.len)
            .ok_or(BridgeError::OutOfBounds {
                offset: self.offset,
                len: self.len,
                memory: u32::MAX as usize,
            })
    }

    /// Resolve this pointer to a host index range within a memory of `size` bytes.
    pub fn range(&self, size: usize) -> Result<std::ops::Range<usize>> {
        let start = self.offset as usize;
        let end = start
            .checked_add(self.len as usize)
            .filter(|&end| end <= size);
        let Some(end) = end else {
            return Err(BridgeError::OutOfBounds {
                offset: self.offset,
                len: self.len,
                memory: size,
            });
        };
        Ok(start..end)
    }
}

impl fmt::Display for GuestPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}+{}", self.offset, self.len)
    }
}

/// Convert a host length to a guest `u32`, failing for inputs over 4 GiB.
pub fn guest_len(len: usize, function: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        BridgeError::contract(
            function,
            format!("length {} does not fit a 32-bit guest", len),
        )
    })
}

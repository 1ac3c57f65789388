//! Guest memory to host text.

use crate::error::{BridgeError, Result};
use crate::memory::{LinearMemory, MemoryViews};
use crate::types::GuestPtr;

/// Read `ptr.len` bytes at `ptr.offset` and decode them as strict UTF-8.
///
/// Invalid or truncated sequences fail with [`BridgeError::Decode`]; nothing
/// is ever replaced with U+FFFD. A leading byte order mark is kept as text.
pub fn decode<M: LinearMemory + ?Sized>(
    views: &mut MemoryViews,
    mem: &M,
    ptr: GuestPtr,
) -> Result<String> {
    let bytes = views.bytes(mem).read(ptr)?;
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(e) => Err(BridgeError::Decode {
            offset: ptr.offset,
            len: ptr.len,
            valid_up_to: e.valid_up_to(),
            cause: e.to_string(),
        }),
    }
}

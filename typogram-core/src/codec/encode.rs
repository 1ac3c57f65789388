//! Host text to guest memory.

use crate::error::{BridgeError, Result};
use crate::guest::GuestModule;
use crate::memory::MemoryViews;
use crate::types::{GuestPtr, guest_len};

/// Worst-case UTF-8 bytes per UTF-16 code unit.
const MAX_BYTES_PER_UNIT: u32 = 3;

/// How a string is laid out in guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStrategy {
    /// Encode everything up front and allocate the exact size once.
    ///
    /// Used when the guest exports no reallocation function.
    Fixed,

    /// Allocate one byte per code unit and copy ASCII straight in; on the
    /// first non-ASCII character, reallocate to an upper bound and encode
    /// the remainder into the grown block.
    Optimistic,
}

impl EncodeStrategy {
    /// Select the strategy a guest supports.
    #[inline]
    pub fn select<G: GuestModule + ?Sized>(guest: &G) -> Self {
        if guest.has_realloc() {
            Self::Optimistic
        } else {
            Self::Fixed
        }
    }
}

/// A string written into guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    /// Where the UTF-8 bytes live; `len` is the number of bytes written.
    pub ptr: GuestPtr,
    /// Size of the block reserved for the string (at least `ptr.len`).
    pub capacity: u32,
    /// Strategy used to write the string.
    pub strategy: EncodeStrategy,
    /// Whether the optimistic path had to reallocate.
    pub reallocated: bool,
}

/// Write `text` into guest memory as UTF-8.
///
/// The returned block is owned by whoever consumes it next; the bridge hands
/// it to the guest's conversion function.
pub fn encode<G: GuestModule + ?Sized>(
    guest: &mut G,
    views: &mut MemoryViews,
    text: &str,
) -> Result<Encoded> {
    match EncodeStrategy::select(guest) {
        EncodeStrategy::Fixed => encode_fixed(guest, views, text),
        EncodeStrategy::Optimistic => encode_optimistic(guest, views, text),
    }
}

fn encode_fixed<G: GuestModule + ?Sized>(
    guest: &mut G,
    views: &mut MemoryViews,
    text: &str,
) -> Result<Encoded> {
    let bytes = text.as_bytes();
    let len = guest_len(bytes.len(), "malloc")?;
    let ptr = guest.malloc(len)?;
    let block = checked_block(guest, "malloc", ptr, len)?;

    views.bytes_mut(guest).write(block.offset, bytes)?;

    Ok(Encoded {
        ptr: block,
        capacity: len,
        strategy: EncodeStrategy::Fixed,
        reallocated: false,
    })
}

fn encode_optimistic<G: GuestModule + ?Sized>(
    guest: &mut G,
    views: &mut MemoryViews,
    text: &str,
) -> Result<Encoded> {
    let capacity = guest_len(text.encode_utf16().count(), "malloc")?;
    let ptr = guest.malloc(capacity)?;
    let block = checked_block(guest, "malloc", ptr, capacity)?;

    // The allocation may have grown memory; derive the view afterwards.
    let written = {
        let mut view = views.bytes_mut(guest);
        let dest = view.slice_mut(block)?;
        let mut offset = 0usize;
        for (slot, byte) in dest.iter_mut().zip(text.bytes()) {
            if !byte.is_ascii() {
                break;
            }
            *slot = byte;
            offset += 1;
        }
        offset
    };

    if written == text.len() {
        return Ok(Encoded {
            ptr: GuestPtr::new(ptr, capacity),
            capacity,
            strategy: EncodeStrategy::Optimistic,
            reallocated: false,
        });
    }

    // `written` stops at the first non-ASCII byte, which is a char boundary.
    let rest = &text[written..];
    let prefix = guest_len(written, "realloc")?;
    let rest_units = guest_len(rest.encode_utf16().count(), "realloc")?;
    let new_capacity = rest_units
        .checked_mul(MAX_BYTES_PER_UNIT)
        .and_then(|bound| bound.checked_add(prefix))
        .ok_or_else(|| BridgeError::contract("realloc", "string too large for a 32-bit guest"))?;

    tracing::trace!(
        prefix = written,
        remaining_units = rest_units,
        old_capacity = capacity,
        new_capacity,
        "Non-ASCII input, growing string buffer"
    );

    let new_ptr = guest.realloc(ptr, capacity, new_capacity)?;
    let grown = checked_block(guest, "realloc", new_ptr, new_capacity)?;

    let mut view = views.bytes_mut(guest);
    let dest = view.slice_mut(grown)?;
    if dest[..written] != text.as_bytes()[..written] {
        return Err(BridgeError::contract(
            "realloc",
            format!(
                "block 0x{:08x} -> 0x{:08x} did not preserve its {}-byte prefix",
                ptr, new_ptr, written
            ),
        ));
    }
    dest[written..written + rest.len()].copy_from_slice(rest.as_bytes());

    let total = guest_len(written + rest.len(), "realloc")?;
    Ok(Encoded {
        ptr: GuestPtr::new(new_ptr, total),
        capacity: new_capacity,
        strategy: EncodeStrategy::Optimistic,
        reallocated: true,
    })
}

/// Validate that an allocator result lies inside guest memory.
fn checked_block<G: GuestModule + ?Sized>(
    guest: &G,
    function: &str,
    ptr: u32,
    len: u32,
) -> Result<GuestPtr> {
    let block = GuestPtr::new(ptr, len);
    let size = guest.size();
    block.range(size).map_err(|_| {
        BridgeError::contract(
            function,
            format!(
                "returned block {} outside linear memory of {} bytes",
                block, size
            ),
        )
    })?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use crate::testing::SimulatedGuest;

    #[test]
    fn ascii_uses_single_allocation() {
        let mut guest = SimulatedGuest::echo();
        let mut views = MemoryViews::new();

        let encoded = encode(&mut guest, &mut views, "A->B").unwrap();
        assert_eq!(encoded.strategy, EncodeStrategy::Optimistic);
        assert!(!encoded.reallocated);
        assert_eq!(encoded.ptr.len, 4);
        assert_eq!(guest.stats().mallocs, 1);
        assert_eq!(guest.stats().reallocs, 0);

        let decoded = decode(&mut views, &guest, encoded.ptr).unwrap();
        assert_eq!(decoded, "A->B");
    }

    #[test]
    fn two_byte_character_round_trips() {
        let mut guest = SimulatedGuest::echo();
        let mut views = MemoryViews::new();

        let encoded = encode(&mut guest, &mut views, "é").unwrap();
        assert!(encoded.reallocated);
        assert_eq!(encoded.ptr.len, 2);
        // 0 ASCII bytes + 1 unit * 3
        assert_eq!(encoded.capacity, 3);
        assert_eq!(guest.stats().reallocs, 1);

        let decoded = decode(&mut views, &guest, encoded.ptr).unwrap();
        assert_eq!(decoded, "é");
    }

    #[test]
    fn mixed_input_keeps_ascii_prefix() {
        let mut guest = SimulatedGuest::echo();
        let mut views = MemoryViews::new();

        let text = "+--> 日本語 <--+";
        let encoded = encode(&mut guest, &mut views, text).unwrap();
        assert!(encoded.reallocated);
        assert_eq!(encoded.ptr.len as usize, text.len());
        assert!(encoded.ptr.len as usize >= text.chars().count());

        let decoded = decode(&mut views, &guest, encoded.ptr).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn astral_characters_fit_the_bound() {
        let mut guest = SimulatedGuest::echo();
        let mut views = MemoryViews::new();

        // Each emoji is two UTF-16 units and four UTF-8 bytes.
        let text = "a🦀🦀";
        let encoded = encode(&mut guest, &mut views, text).unwrap();
        assert_eq!(encoded.capacity, 1 + 4 * 3);
        assert_eq!(encoded.ptr.len, 9);
        assert_eq!(decode(&mut views, &guest, encoded.ptr).unwrap(), text);
    }

    #[test]
    fn fixed_strategy_without_realloc() {
        let mut guest = SimulatedGuest::echo().without_realloc();
        let mut views = MemoryViews::new();

        let encoded = encode(&mut guest, &mut views, "日本語").unwrap();
        assert_eq!(encoded.strategy, EncodeStrategy::Fixed);
        assert_eq!(encoded.ptr.len, 9);
        assert_eq!(encoded.capacity, 9);
        assert_eq!(guest.stats().reallocs, 0);
        assert_eq!(decode(&mut views, &guest, encoded.ptr).unwrap(), "日本語");
    }

    #[test]
    fn empty_string_allocates_empty_block() {
        let mut guest = SimulatedGuest::echo();
        let mut views = MemoryViews::new();

        let encoded = encode(&mut guest, &mut views, "").unwrap();
        assert!(encoded.ptr.is_empty());
        assert!(!encoded.reallocated);
        assert_eq!(decode(&mut views, &guest, encoded.ptr).unwrap(), "");
    }

    #[test]
    fn realloc_losing_prefix_is_contract_violation() {
        let mut guest = SimulatedGuest::echo().with_lossy_realloc();
        let mut views = MemoryViews::new();

        let err = encode(&mut guest, &mut views, "ab→c").unwrap_err();
        assert_eq!(err.code(), "E201");
        assert!(err.is_fatal());
    }

    #[test]
    fn growth_during_encode_is_observed() {
        let mut guest = SimulatedGuest::echo().with_heap_size(64);
        let mut views = MemoryViews::new();

        let _ = views.bytes(&guest);
        let text = "x".repeat(200);
        let encoded = encode(&mut guest, &mut views, &text).unwrap();

        assert!(views.generation() >= 1);
        assert_eq!(decode(&mut views, &guest, encoded.ptr).unwrap(), text);
    }
}

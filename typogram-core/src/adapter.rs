//! Call adapter around the guest's conversion export.
//!
//! One call walks the states
//!
//! ```text
//! Idle -> ScratchReserved -> Called -> ResultRead -> Freed
//! ```
//!
//! and every state after `ScratchReserved` ends in `Freed`, including when
//! encoding, the call itself, or decoding fails. [`CallFrame`] owns the
//! scratch slot and the result block for the duration of the call and
//! releases both when finished or dropped.

use crate::codec::{Encoded, decode, encode};
use crate::error::{BridgeError, Result};
use crate::guest::GuestModule;
use crate::memory::MemoryViews;
use crate::types::{GuestPtr, SCRATCH_SIZE};

/// Lifecycle of a single conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Nothing reserved yet.
    Idle,
    /// The scratch slot has been pushed on the guest stack.
    ScratchReserved,
    /// The conversion export returned.
    Called,
    /// The result pair was read and decoded.
    ResultRead,
    /// Scratch slot popped and result block released.
    Freed,
}

/// Scoped ownership of the scratch slot and result block of one call.
///
/// Dropping a frame that was not [`finish`](CallFrame::finish)ed still
/// releases everything and logs any failure during that release.
/// [`CallAdapter::call`] always finishes its frame explicitly.
pub struct CallFrame<'g, G: GuestModule + ?Sized> {
    guest: &'g mut G,
    scratch: u32,
    result: Option<GuestPtr>,
    state: CallState,
}

impl<'g, G: GuestModule + ?Sized> CallFrame<'g, G> {
    /// Push a scratch slot of [`SCRATCH_SIZE`] bytes onto the guest stack.
    pub fn reserve(guest: &'g mut G) -> Result<Self> {
        let sp = guest.stack_pointer()?;
        let scratch = sp.checked_sub(SCRATCH_SIZE).ok_or_else(|| {
            BridgeError::contract(
                "stack pointer",
                format!("shadow stack exhausted at 0x{:08x}", sp),
            )
        })?;
        guest.set_stack_pointer(scratch)?;

        Ok(Self {
            guest,
            scratch,
            result: None,
            state: CallState::ScratchReserved,
        })
    }

    /// Offset of the scratch slot.
    pub fn scratch(&self) -> u32 {
        self.scratch
    }

    /// Current state of the call.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Shared access to the guest.
    pub fn guest(&self) -> &G {
        &*self.guest
    }

    /// Exclusive access to the guest.
    pub fn guest_mut(&mut self) -> &mut G {
        &mut *self.guest
    }

    /// Invoke the conversion export on an encoded input.
    pub fn invoke(&mut self, input: GuestPtr) -> Result<()> {
        self.guest.convert(self.scratch, input.offset, input.len)?;
        self.state = CallState::Called;
        Ok(())
    }

    /// Read the (pointer, length) pair the guest left in the scratch slot.
    ///
    /// From here on the frame owns the result block.
    pub fn take_result(&mut self, views: &mut MemoryViews) -> Result<GuestPtr> {
        // The call may have grown memory: the word view is derived fresh.
        let pair = views.words(&*self.guest).read_pair(self.scratch)?;
        self.result = Some(pair);
        Ok(pair)
    }

    /// Mark the result as consumed.
    pub fn mark_read(&mut self) {
        self.state = CallState::ResultRead;
    }

    /// Pop the scratch slot and release the result block.
    pub fn finish(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.state == CallState::Freed {
            return Ok(());
        }
        self.state = CallState::Freed;

        let restored = match self.guest.stack_pointer() {
            Ok(sp) => match sp.checked_add(SCRATCH_SIZE) {
                Some(sp) => self.guest.set_stack_pointer(sp),
                None => Err(BridgeError::contract(
                    "stack pointer",
                    format!("cannot pop scratch slot at 0x{:08x}", sp),
                )),
            },
            Err(e) => Err(e),
        };

        let freed = match self.result.take() {
            Some(ptr) => self.guest.free(ptr.offset, ptr.len),
            None => Ok(()),
        };

        restored.and(freed)
    }
}

impl<G: GuestModule + ?Sized> Drop for CallFrame<'_, G> {
    fn drop(&mut self) {
        if self.state == CallState::Freed {
            return;
        }
        let state = self.state;
        if let Err(e) = self.release() {
            tracing::warn!(
                error = %e,
                code = e.code(),
                ?state,
                "Failed to release call frame on error path"
            );
        }
    }
}

/// Outcome of one successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Decoded result text.
    pub output: String,
    /// How the input was laid out in guest memory.
    pub input: Encoded,
    /// Where the guest placed the result before it was released.
    pub result: GuestPtr,
}

/// Drives string conversions against a guest.
///
/// Owns the memory view cache, so one adapter belongs to one guest.
#[derive(Debug, Default)]
pub struct CallAdapter {
    views: MemoryViews,
}

impl CallAdapter {
    /// Create an adapter with an empty view cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The view cache used by this adapter.
    pub fn views(&self) -> &MemoryViews {
        &self.views
    }

    /// Convert `text` through the guest's conversion export.
    pub fn call<G: GuestModule + ?Sized>(
        &mut self,
        guest: &mut G,
        text: &str,
    ) -> Result<Conversion> {
        let mut frame = CallFrame::reserve(guest)?;
        let outcome = Self::run(&mut frame, &mut self.views, text);
        let released = frame.finish();

        let (input, result, output) = match (outcome, released) {
            (Ok(done), Ok(())) => done,
            (Ok(_), Err(e)) | (Err(e), Ok(())) => return Err(e),
            (Err(call), Err(release)) => return Err(Self::prevailing(call, release)),
        };

        tracing::debug!(
            input_bytes = input.ptr.len,
            output_bytes = result.len,
            strategy = ?input.strategy,
            reallocated = input.reallocated,
            "Converted string"
        );

        Ok(Conversion {
            output,
            input,
            result,
        })
    }

    fn run<G: GuestModule + ?Sized>(
        frame: &mut CallFrame<'_, G>,
        views: &mut MemoryViews,
        text: &str,
    ) -> Result<(Encoded, GuestPtr, String)> {
        let input = encode(frame.guest_mut(), views, text)?;
        frame.invoke(input.ptr)?;

        let result = frame.take_result(views)?;
        let output = decode(views, frame.guest(), result)?;
        frame.mark_read();
        Ok((input, result, output))
    }

    /// Pick the error to report when both the call and its release failed.
    ///
    /// A fatal release error outranks a recoverable call error so the caller
    /// stops using a guest whose allocator has broken.
    fn prevailing(call: BridgeError, release: BridgeError) -> BridgeError {
        if release.is_fatal() && !call.is_fatal() {
            tracing::warn!(
                error = %call,
                code = call.code(),
                "Call error superseded by failed release"
            );
            release
        } else {
            tracing::warn!(
                error = %release,
                code = release.code(),
                "Failed to release call frame on error path"
            );
            call
        }
    }
}

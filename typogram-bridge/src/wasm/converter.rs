//! Thread-safe handle for converting text through a loaded guest.

use super::guest::WasmGuest;
use parking_lot::Mutex;
use typogram_core::adapter::CallAdapter;
use typogram_core::codec::EncodeStrategy;
use typogram_core::error::{BridgeError, Result};
use typogram_core::guest::GuestModule;
use typogram_core::memory::LinearMemory;

/// Mutable state behind the converter lock.
struct ConverterState<G> {
    guest: G,
    adapter: CallAdapter,
    /// Set by the first fatal error; every later call fails fast.
    poisoned: Option<String>,
    calls: u64,
}

/// Snapshot of a guest's state between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestInfo {
    /// Linear memory size in bytes.
    pub memory_bytes: usize,
    /// Current shadow stack cursor.
    pub stack_pointer: u32,
    /// Strategy the encoder will pick for this guest.
    pub strategy: EncodeStrategy,
    /// Successful and failed conversions so far.
    pub calls: u64,
    /// Memory region changes observed by the view cache.
    pub generation: u64,
    /// Whether a fatal error has disabled the handle.
    pub poisoned: bool,
}

/// A loaded guest module, ready to convert text.
///
/// Calls are serialized: the guest is single-threaded and its scratch slot
/// can only serve one call at a time. `Converter` is `Send + Sync` for any
/// `Send` guest and can be shared behind an `Arc`.
pub struct Converter<G = WasmGuest> {
    name: String,
    state: Mutex<ConverterState<G>>,
}

impl<G: GuestModule> Converter<G> {
    /// Wrap a guest that has not been called yet.
    pub fn new(name: impl Into<String>, guest: G) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ConverterState {
                guest,
                adapter: CallAdapter::new(),
                poisoned: None,
                calls: 0,
            }),
        }
    }

    /// Name of the module behind this converter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Convert `text` with the guest's conversion function.
    ///
    /// A fatal error (trap, broken allocator contract, out-of-bounds result)
    /// disables the converter; later calls return [`BridgeError::Poisoned`].
    /// Decode failures leave it usable.
    pub fn convert(&self, text: &str) -> Result<String> {
        let mut state = self.state.lock();
        if let Some(cause) = &state.poisoned {
            return Err(BridgeError::Poisoned {
                cause: cause.clone(),
            });
        }

        state.calls += 1;
        let ConverterState { guest, adapter, .. } = &mut *state;
        match adapter.call(guest, text) {
            Ok(conversion) => Ok(conversion.output),
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!(
                        module = %self.name,
                        error = %e,
                        code = e.code(),
                        "Guest failed fatally, disabling converter"
                    );
                    state.poisoned = Some(e.to_string());
                } else {
                    tracing::warn!(module = %self.name, error = %e, "Conversion failed");
                }
                Err(e)
            }
        }
    }

    /// Whether a fatal error has disabled this converter.
    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned.is_some()
    }

    /// Current shadow stack cursor of the guest.
    pub fn stack_pointer(&self) -> Result<u32> {
        self.state.lock().guest.stack_pointer()
    }

    /// Snapshot of the guest's state.
    pub fn info(&self) -> Result<GuestInfo> {
        let mut state = self.state.lock();
        let stack_pointer = state.guest.stack_pointer()?;
        Ok(GuestInfo {
            memory_bytes: state.guest.size(),
            stack_pointer,
            strategy: EncodeStrategy::select(&state.guest),
            calls: state.calls,
            generation: state.adapter.views().generation(),
            poisoned: state.poisoned.is_some(),
        })
    }

    /// Run `f` with exclusive access to the guest.
    pub fn with_guest<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        f(&mut self.state.lock().guest)
    }
}

impl<G> std::fmt::Debug for Converter<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```
//! use typogram_core::prelude::*;
//! ```

// Core types
pub use crate::types::{GuestPtr, SCRATCH_SIZE};

// Error handling
pub use crate::error::{BridgeError, Result};

// Guest memory
pub use crate::guest::GuestModule;
pub use crate::memory::{ByteView, ByteViewMut, LinearMemory, MemoryViews, RegionId, WordView};

// Conversion
pub use crate::adapter::{CallAdapter, CallFrame, CallState, Conversion};
pub use crate::codec::{EncodeStrategy, Encoded, decode, encode};

//! Typogram Core Library
//!
//! This crate provides the host side of the string bridge between a host
//! program and a typogram guest module: the guest memory model, the UTF-8
//! codec and the call adapter that drives one conversion.
//!
//! # Overview
//!
//! A guest exposes a linear memory, an allocator and a conversion function
//! that returns its result through a 16-byte scratch slot on the guest's
//! shadow stack. Everything here is written against the [`GuestModule`]
//! trait; `typogram-bridge` implements it over wasmtime and
//! [`testing::SimulatedGuest`] implements it in-process.
//!
//! # Key Components
//!
//! - **Memory**: Generation-tracked byte and word views over guest memory
//! - **Codec**: Optimistic ASCII encoding with a single reallocation, strict decoding
//! - **Adapter**: Scratch slot reservation with guaranteed release
//!
//! # Example
//!
//! ```
//! use typogram_core::prelude::*;
//! use typogram_core::testing::SimulatedGuest;
//!
//! let mut guest = SimulatedGuest::echo();
//! let mut adapter = CallAdapter::new();
//!
//! let conversion = adapter.call(&mut guest, "+--+").unwrap();
//! assert_eq!(conversion.output, "+--+");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod codec;
pub mod error;
pub mod guest;
pub mod memory;
pub mod prelude;
pub mod testing;
pub mod types;

// Re-export key types at crate root for convenience
pub use adapter::{CallAdapter, CallFrame, CallState, Conversion};
pub use codec::{EncodeStrategy, Encoded, decode, encode};
pub use error::{BridgeError, Result};
pub use guest::GuestModule;
pub use memory::{LinearMemory, MemoryViews, RegionId};
pub use types::{GuestPtr, SCRATCH_SIZE};

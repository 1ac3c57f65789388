//! Core types shared by the codec, the call adapter and guest backends.

mod pointer;

pub use pointer::{GuestPtr, SCRATCH_SIZE, guest_len};

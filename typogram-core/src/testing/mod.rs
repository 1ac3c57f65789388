//! In-process test doubles for the bridge.
//!
//! [`SimulatedGuest`] implements [`GuestModule`](crate::guest::GuestModule)
//! over a plain `Vec<u8>` arena. It relocates that arena whenever it grows,
//! counts every allocator call, and can be told to misbehave so the bridge's
//! failure paths can be exercised without compiling a wasm module.
//!
//! # Example
//!
//! ```
//! use typogram_core::adapter::CallAdapter;
//! use typogram_core::testing::SimulatedGuest;
//!
//! let mut guest = SimulatedGuest::new(|input| input.to_uppercase().into_bytes());
//! let mut adapter = CallAdapter::new();
//!
//! let conversion = adapter.call(&mut guest, "a->b").unwrap();
//! assert_eq!(conversion.output, "A->B");
//! assert_eq!(guest.stats().live, 0);
//! ```

mod guest;

pub use guest::{AllocStats, DEFAULT_HEAP_SIZE, DEFAULT_STACK_TOP, ReallocMode, SimulatedGuest};

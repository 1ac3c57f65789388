//! Wasmtime host for typogram guest modules.
//!
//! # Architecture
//!
//! - **WasmRuntime**: Manages the Wasmtime engine and compiled modules
//! - **WasmGuest**: Binds one instance's exports and implements `GuestModule`
//! - **ModuleLoader**: Fetches, compiles and instantiates modules off the async runtime
//! - **Converter**: Serializes calls and disables itself after a fatal error
//!
//! # Guest Module ABI Contract
//!
//! Guest modules import nothing and must export (names configurable through
//! [`AbiConfig`]):
//!
//! ```text
//! memory: Memory
//! __wbindgen_malloc(size: i32) -> i32
//! __wbindgen_realloc(ptr: i32, old: i32, new: i32) -> i32   // optional
//! __wbindgen_free(ptr: i32, size: i32)
//! convert_string(ret_ptr: i32, ptr: i32, len: i32)
//! __wbindgen_export_0: mut i32                              // shadow stack cursor
//! ```
//!
//! `convert_string` takes ownership of the input buffer and writes the
//! result as two little-endian i32 words (pointer, length) at `ret_ptr`.
//! The host releases the result with `__wbindgen_free`.
//!
//! # Example
//!
//! ```no_run
//! use typogram_bridge::wasm::{ModuleLoader, ModuleSource};
//!
//! # async fn run() -> typogram_core::Result<()> {
//! let loader = ModuleLoader::with_defaults()?;
//! let converter = loader.load(ModuleSource::path("typogram_bg.wasm")).await?;
//!
//! let svg = converter.convert("+--+\n|  |\n+--+")?;
//! # let _ = svg;
//! # Ok(())
//! # }
//! ```

mod abi;
mod converter;
mod guest;
mod loader;
mod runtime;

// Re-export public types
pub use abi::AbiConfig;
pub use converter::{Converter, GuestInfo};
pub use guest::{GuestState, WasmGuest};
pub use loader::{ModuleLoader, ModuleSource};
pub use runtime::{CompiledModule, WASM_PAGE_SIZE, WasmRuntime, WasmRuntimeConfig};

//! Typogram Bridge - Wasmtime host for typogram guest modules.
//!
//! This crate runs the string bridge from `typogram-core` against real
//! WebAssembly modules:
//! - Engine configuration and compiled-module cache
//! - Asynchronous module loading from files, bytes or URLs (`http` feature)
//! - A thread-safe `Converter` handle with fatal-error poisoning
//! - YAML configuration for limits and export names
//! - HTML document rendering of embedded diagram blocks
//! - Logging setup for hosts

#![warn(missing_docs)]

pub mod config;
pub mod observability;
pub mod render;
pub mod wasm;

pub use config::BridgeConfig;
pub use render::{Rendered, render_document};
pub use wasm::{AbiConfig, Converter, ModuleLoader, ModuleSource, WasmRuntimeConfig};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::BridgeConfig;
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::render::{Rendered, render_document};
    pub use crate::wasm::{
        AbiConfig, Converter, GuestInfo, ModuleLoader, ModuleSource, WasmGuest, WasmRuntime,
        WasmRuntimeConfig,
    };
    pub use typogram_core::error::{BridgeError, Result};
}

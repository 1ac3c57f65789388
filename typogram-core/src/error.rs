//! Error types for the typogram bridge.
//!
//! Every error carries a stable code and enough context (export name, guest
//! offset, byte counts) to tell a broken module apart from bad input.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    // =========================================================================
    // Load Errors (E100-E199)
    // =========================================================================
    /// The module bytes could not be read, compiled or instantiated.
    #[error("E101: Failed to load module '{module}': {cause}")]
    Load {
        /// The module that failed to load.
        module: String,
        /// Reason for the load failure.
        cause: String,
    },

    /// A required export is missing or has the wrong type.
    #[error("E102: Module does not export {kind} '{name}': {cause}")]
    MissingExport {
        /// Export kind ("function", "memory", "global").
        kind: &'static str,
        /// The export name that was looked up.
        name: String,
        /// Reason the lookup failed.
        cause: String,
    },

    // =========================================================================
    // Guest Memory Contract Errors (E200-E299)
    // =========================================================================
    /// The guest allocator broke its contract.
    #[error("E201: Guest memory contract violated by '{function}': {cause}")]
    ContractViolation {
        /// The export whose behaviour violated the contract.
        function: String,
        /// Description of the violation.
        cause: String,
    },

    /// A guest range falls outside the current linear memory.
    #[error("E202: Guest memory access out of bounds: offset={offset}, len={len}, memory={memory}")]
    OutOfBounds {
        /// Start offset of the access.
        offset: u32,
        /// Length of the access in bytes.
        len: u32,
        /// Size of the linear memory at the time of access.
        memory: usize,
    },

    // =========================================================================
    // Decode Errors (E300-E399)
    // =========================================================================
    /// Result bytes are not valid UTF-8.
    #[error("E301: Guest returned invalid UTF-8 at offset {offset} (len {len}): {cause}")]
    Decode {
        /// Start offset of the result buffer.
        offset: u32,
        /// Length of the result buffer.
        len: u32,
        /// Number of leading bytes that were valid.
        valid_up_to: usize,
        /// Decoder message.
        cause: String,
    },

    // =========================================================================
    // Call Errors (E400-E499)
    // =========================================================================
    /// A call into the guest trapped.
    #[error("E401: Guest call '{function}' failed: {cause}")]
    Trap {
        /// The export that trapped.
        function: String,
        /// Trap message.
        cause: String,
    },

    /// The handle hit a fatal error earlier and refuses further calls.
    #[error("E402: Converter is unusable after a fatal error: {cause}")]
    Poisoned {
        /// The fatal error that poisoned the handle.
        cause: String,
    },

    // =========================================================================
    // Render Errors (E500-E599)
    // =========================================================================
    /// Converting an embedded diagram block failed.
    #[error("E501: Failed to render diagram block {block}: {source}")]
    Render {
        /// Zero-based index of the block in document order.
        block: usize,
        /// The underlying conversion failure.
        #[source]
        source: Box<BridgeError>,
    },

    // =========================================================================
    // Configuration Errors (E800-E899)
    // =========================================================================
    /// Invalid configuration value or file.
    #[error("E801: Invalid configuration '{field}': {cause}")]
    Config {
        /// The configuration field or file at fault.
        field: String,
        /// Description of why the value is invalid.
        cause: String,
    },

    // =========================================================================
    // I/O Errors (E900-E999)
    // =========================================================================
    /// File I/O error.
    #[error("E901: I/O error at {path}: {cause}")]
    Io {
        /// The path where the I/O error occurred.
        path: PathBuf,
        /// Description of the I/O error.
        cause: String,
    },
}

impl BridgeError {
    /// Get the error code (e.g., "E301").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "E101",
            Self::MissingExport { .. } => "E102",
            Self::ContractViolation { .. } => "E201",
            Self::OutOfBounds { .. } => "E202",
            Self::Decode { .. } => "E301",
            Self::Trap { .. } => "E401",
            Self::Poisoned { .. } => "E402",
            Self::Render { .. } => "E501",
            Self::Config { .. } => "E801",
            Self::Io { .. } => "E901",
        }
    }

    /// Check if this error leaves the guest in an unknown state.
    ///
    /// Fatal errors poison the converter that observed them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ContractViolation { .. }
            | Self::OutOfBounds { .. }
            | Self::Trap { .. }
            | Self::Poisoned { .. } => true,
            Self::Render { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Check if this error happened while loading a module.
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::MissingExport { .. })
    }

    /// Check if this error is a decoding failure of guest output.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        match self {
            Self::Decode { .. } => true,
            Self::Render { source, .. } => source.is_decode_error(),
            _ => false,
        }
    }

    /// Wrap a wasm engine failure for a named export.
    pub fn trap(function: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Trap {
            function: function.into(),
            cause: cause.to_string(),
        }
    }

    /// Build a contract violation for a named export.
    pub fn contract(function: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::ContractViolation {
            function: function.into(),
            cause: cause.into(),
        }
    }
}

/// Result type alias using `BridgeError`.
pub type Result<T> = std::result::Result<T, BridgeError>;

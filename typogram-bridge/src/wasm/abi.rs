//! Names of the guest exports the bridge binds to.

use serde::Deserialize;
use typogram_core::error::{BridgeError, Result};

/// Export names of a typogram guest module.
///
/// Defaults follow the wasm-bindgen naming convention:
///
/// ```text
/// memory: Memory
/// __wbindgen_malloc(size: i32) -> i32
/// __wbindgen_realloc(ptr: i32, old_size: i32, new_size: i32) -> i32   // optional
/// __wbindgen_free(ptr: i32, size: i32)
/// convert_string(ret_ptr: i32, ptr: i32, len: i32)
/// __wbindgen_export_0: mut i32                                        // stack cursor
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbiConfig {
    /// Linear memory.
    pub memory: String,
    /// Allocation function.
    pub malloc: String,
    /// Reallocation function; `None` forces the fixed encoding strategy.
    pub realloc: Option<String>,
    /// Deallocation function.
    pub free: String,
    /// Conversion function.
    pub convert: String,
    /// Mutable i32 global holding the shadow stack cursor.
    pub stack_pointer: String,
}

impl Default for AbiConfig {
    fn default() -> Self {
        Self {
            memory: "memory".to_string(),
            malloc: "__wbindgen_malloc".to_string(),
            realloc: Some("__wbindgen_realloc".to_string()),
            free: "__wbindgen_free".to_string(),
            convert: "convert_string".to_string(),
            stack_pointer: "__wbindgen_export_0".to_string(),
        }
    }
}

impl AbiConfig {
    /// Use a different conversion export.
    pub fn with_convert(mut self, name: impl Into<String>) -> Self {
        self.convert = name.into();
        self
    }

    /// Never bind a reallocation export.
    pub fn without_realloc(mut self) -> Self {
        self.realloc = None;
        self
    }

    /// Reject empty export names.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("abi.memory", &self.memory),
            ("abi.malloc", &self.malloc),
            ("abi.free", &self.free),
            ("abi.convert", &self.convert),
            ("abi.stack_pointer", &self.stack_pointer),
        ];
        let optional = self.realloc.as_ref().map(|name| ("abi.realloc", name));

        for (field, name) in required.into_iter().chain(optional) {
            if name.trim().is_empty() {
                return Err(BridgeError::Config {
                    field: field.to_string(),
                    cause: "export name must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_wasm_bindgen_names() {
        let abi = AbiConfig::default();
        assert_eq!(abi.malloc, "__wbindgen_malloc");
        assert_eq!(abi.realloc.as_deref(), Some("__wbindgen_realloc"));
        assert_eq!(abi.stack_pointer, "__wbindgen_export_0");
        assert!(abi.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let abi: AbiConfig = serde_yaml::from_str("convert: render\nrealloc: null\n").unwrap();
        assert_eq!(abi.convert, "render");
        assert_eq!(abi.realloc, None);
        assert_eq!(abi.free, "__wbindgen_free");
    }

    #[test]
    fn empty_name_is_rejected() {
        let abi = AbiConfig::default().with_convert("  ");
        let err = abi.validate().unwrap_err();
        assert!(err.to_string().contains("abi.convert"));
    }
}

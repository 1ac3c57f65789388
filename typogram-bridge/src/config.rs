//! Bridge configuration file.
//!
//! ```yaml
//! runtime:
//!   max_memory_pages: 256
//!   fuel_enabled: true
//!   fuel_amount: 5000000
//! abi:
//!   convert: convert_string
//!   realloc: null        # force the fixed encoding strategy
//! ```
//!
//! Every field is optional and falls back to its default.

use crate::wasm::{AbiConfig, WasmRuntimeConfig};
use serde::Deserialize;
use std::path::Path;
use typogram_core::error::{BridgeError, Result};

/// Complete configuration for loading guest modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Engine and store limits.
    pub runtime: WasmRuntimeConfig,
    /// Guest export names.
    pub abi: AbiConfig,
}

impl BridgeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| BridgeError::Config {
            field: "yaml".to_string(),
            cause: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            BridgeError::Config { field, cause } => BridgeError::Config {
                field: format!("{}: {}", path.display(), field),
                cause,
            },
            other => other,
        })
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.runtime.validate()?;
        self.abi.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_is_default() {
        let config = BridgeConfig::from_yaml("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let yaml = r#"
runtime:
  max_memory_pages: 32
abi:
  convert: render_svg
  realloc: null
"#;
        let config = BridgeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.runtime.max_memory_pages, 32);
        assert!(config.runtime.cache_modules);
        assert_eq!(config.abi.convert, "render_svg");
        assert_eq!(config.abi.realloc, None);
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = BridgeConfig::from_yaml("engine: {}").unwrap_err();
        assert_eq!(err.code(), "E801");
    }

    #[test]
    fn misspelled_nested_field_is_rejected() {
        let err = BridgeConfig::from_yaml("runtime:\n  max_memory_page: 1\n").unwrap_err();
        assert_eq!(err.code(), "E801");
        assert!(err.to_string().contains("max_memory_page"));

        let err = BridgeConfig::from_yaml("abi:\n  conver: render\n").unwrap_err();
        assert_eq!(err.code(), "E801");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = BridgeConfig::from_yaml("runtime:\n  max_memory_pages: 0\n").unwrap_err();
        assert!(err.to_string().contains("runtime.max_memory_pages"));
    }

    #[test]
    fn load_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "abi:\n  malloc: \"\"").unwrap();

        let err = BridgeConfig::load_file(file.path()).unwrap_err();
        assert_eq!(err.code(), "E801");
        assert!(err.to_string().contains("abi.malloc"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BridgeConfig::load_file(Path::new("/nonexistent/typogram.yaml")).unwrap_err();
        assert_eq!(err.code(), "E901");
    }
}

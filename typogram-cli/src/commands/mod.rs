//! CLI command implementations.

pub mod convert;
pub mod inspect;
pub mod render;
pub mod version;

use anyhow::{Context, Result};
use std::path::Path;
use typogram_bridge::BridgeConfig;
use typogram_bridge::wasm::{Converter, ModuleLoader, ModuleSource};

/// Read the `--config` file, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    match path {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading bridge configuration");
            BridgeConfig::load_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))
        }
        None => Ok(BridgeConfig::default()),
    }
}

/// Interpret a `--module` argument.
pub fn module_source(module: &str) -> Result<ModuleSource> {
    if module.starts_with("http://") || module.starts_with("https://") {
        #[cfg(feature = "http")]
        return Ok(ModuleSource::Url(module.to_string()));

        #[cfg(not(feature = "http"))]
        anyhow::bail!(
            "Loading modules from URLs requires the 'http' feature: {}",
            module
        );
    }

    let path = Path::new(module);
    if !path.exists() {
        anyhow::bail!("Module file not found: {}", module);
    }
    Ok(ModuleSource::path(path))
}

/// Load the module named on the command line.
pub async fn load_converter(config: BridgeConfig, module: &str) -> Result<Converter> {
    let source = module_source(module)?;
    let loader = ModuleLoader::new(config).context("Invalid bridge configuration")?;
    loader
        .load(source)
        .await
        .with_context(|| format!("Failed to load module {}", module))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        std::fs::write(&path, "runtime:\n  max_memory_pages: 16\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.runtime.max_memory_pages, 16);
    }

    #[test]
    fn missing_module_file_is_reported() {
        let err = module_source("/nonexistent/typogram.wasm").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn urls_need_http_feature() {
        let err = module_source("https://example.com/typogram.wasm").unwrap_err();
        assert!(err.to_string().contains("http"));
    }
}

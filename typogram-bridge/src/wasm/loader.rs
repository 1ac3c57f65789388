//! Asynchronous module loading.
//!
//! Loading is the only asynchronous step of the bridge: the module bytes are
//! fetched, then compiled and instantiated on a blocking worker so the async
//! runtime is never stalled by Cranelift.

use super::abi::AbiConfig;
use super::converter::Converter;
use super::guest::WasmGuest;
use super::runtime::WasmRuntime;
use crate::config::BridgeConfig;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use typogram_core::error::{BridgeError, Result};

/// Where module bytes come from.
#[derive(Clone)]
pub enum ModuleSource {
    /// A `.wasm` (or `.wat`) file on disk.
    Path(PathBuf),
    /// Bytes already in memory.
    Bytes {
        /// Name used in diagnostics.
        name: String,
        /// Module bytes.
        bytes: Vec<u8>,
    },
    /// An http(s) URL.
    #[cfg(feature = "http")]
    Url(String),
}

impl ModuleSource {
    /// Source for a file path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Source for in-memory bytes.
    pub fn bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string(),
            Self::Bytes { name, .. } => name.clone(),
            #[cfg(feature = "http")]
            Self::Url(url) => url.clone(),
        }
    }

    async fn read(self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| BridgeError::Io {
                    path,
                    cause: e.to_string(),
                }),
            Self::Bytes { bytes, .. } => Ok(bytes),
            #[cfg(feature = "http")]
            Self::Url(url) => fetch(&url).await,
        }
    }
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { name, bytes } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            #[cfg(feature = "http")]
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

#[cfg(feature = "http")]
async fn fetch(url: &str) -> Result<Vec<u8>> {
    let load_error = |e: reqwest::Error| BridgeError::Load {
        module: url.to_string(),
        cause: e.to_string(),
    };
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(load_error)?;
    let bytes = response.bytes().await.map_err(load_error)?;
    Ok(bytes.to_vec())
}

/// Loads guest modules into ready-to-use [`Converter`]s.
///
/// One loader can load many modules; they share the engine and its
/// compiled-module cache.
#[derive(Clone)]
pub struct ModuleLoader {
    runtime: Arc<WasmRuntime>,
    abi: AbiConfig,
}

impl ModuleLoader {
    /// Create a loader from a bridge configuration.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.abi.validate()?;
        let runtime = Arc::new(WasmRuntime::new(config.runtime)?);
        Ok(Self {
            runtime,
            abi: config.abi,
        })
    }

    /// Create a loader with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(BridgeConfig::default())
    }

    /// The shared runtime.
    pub fn runtime(&self) -> &Arc<WasmRuntime> {
        &self.runtime
    }

    /// Fetch, compile and instantiate a module.
    ///
    /// Fails with a load error if the bytes are not a module, instantiation
    /// fails or a required export is missing. A failed load is not retried.
    pub async fn load(&self, source: ModuleSource) -> Result<Converter> {
        let name = source.name();
        tracing::debug!(module = %name, source = ?source, "Loading module");

        let bytes = source.read().await?;
        let runtime = Arc::clone(&self.runtime);
        let abi = self.abi.clone();
        let task_name = name.clone();

        let guest = tokio::task::spawn_blocking(move || {
            let module = runtime.compile(&task_name, &bytes)?;
            WasmGuest::instantiate(&runtime, &module, abi)
        })
        .await
        .map_err(|e| BridgeError::Load {
            module: name.clone(),
            cause: format!("Task join error: {}", e),
        })??;

        tracing::info!(module = %name, "Module loaded");
        Ok(Converter::new(name, guest))
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("runtime", self.runtime.config())
            .field("abi", &self.abi)
            .finish()
    }
}

//! WASM runtime management using Wasmtime.
//!
//! Provides engine configuration, module compilation, and caching
//! so loading the same module bytes twice compiles them once.

use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use typogram_core::error::{BridgeError, Result};
use wasmtime::{Config, Engine, Module, StoreLimits, StoreLimitsBuilder};

/// Size of one wasm page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Upper bound on pages for a 32-bit memory.
const MAX_PAGES_32: u32 = 65536;

/// Default maximum memory pages (64 KB per page).
const DEFAULT_MAX_MEMORY_PAGES: u32 = 1024; // 64 MB

/// Default fuel amount for execution limiting.
const DEFAULT_FUEL: u64 = 10_000_000;

/// Configuration for the WASM runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WasmRuntimeConfig {
    /// Maximum memory pages allowed (64 KB per page).
    pub max_memory_pages: u32,
    /// Whether to enable fuel-based execution limiting.
    pub fuel_enabled: bool,
    /// Fuel granted to every call into the guest when fuel is enabled.
    pub fuel_amount: u64,
    /// Whether to cache compiled modules.
    pub cache_modules: bool,
    /// Enable debug info in compiled modules.
    pub debug_info: bool,
}

impl Default for WasmRuntimeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            fuel_enabled: false,
            fuel_amount: DEFAULT_FUEL,
            cache_modules: true,
            debug_info: false,
        }
    }
}

impl WasmRuntimeConfig {
    /// Create a configuration for long-running hosts.
    ///
    /// Fuel is on so a runaway conversion cannot hang the host.
    pub fn production() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            fuel_enabled: true,
            fuel_amount: DEFAULT_FUEL,
            cache_modules: true,
            debug_info: false,
        }
    }

    /// Create a configuration for testing with stricter limits.
    pub fn testing() -> Self {
        Self {
            max_memory_pages: 256, // 16 MB
            fuel_enabled: true,
            fuel_amount: 1_000_000,
            cache_modules: false,
            debug_info: true,
        }
    }

    /// Set maximum memory pages.
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    /// Enable or disable fuel-based limiting.
    pub fn with_fuel(mut self, enabled: bool, amount: u64) -> Self {
        self.fuel_enabled = enabled;
        self.fuel_amount = amount;
        self
    }

    /// Enable or disable module caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_modules = enabled;
        self
    }

    /// Check the configuration for values the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_pages == 0 || self.max_memory_pages > MAX_PAGES_32 {
            return Err(BridgeError::Config {
                field: "runtime.max_memory_pages".to_string(),
                cause: format!(
                    "must be between 1 and {}, got {}",
                    MAX_PAGES_32, self.max_memory_pages
                ),
            });
        }
        if self.fuel_enabled && self.fuel_amount == 0 {
            return Err(BridgeError::Config {
                field: "runtime.fuel_amount".to_string(),
                cause: "must be positive when fuel is enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Maximum linear memory size in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * WASM_PAGE_SIZE
    }

    /// Create a Wasmtime Config from this configuration.
    fn to_wasmtime_config(&self) -> Config {
        let mut config = Config::new();

        // Enable fuel consumption for execution limiting
        config.consume_fuel(self.fuel_enabled);

        // Enable debug info if requested
        config.debug_info(self.debug_info);

        // Use Cranelift for compilation
        config.strategy(wasmtime::Strategy::Cranelift);

        config
    }
}

/// A compiled WASM module ready for instantiation.
pub struct CompiledModule {
    /// Name used in diagnostics.
    name: String,
    /// The compiled Wasmtime module.
    module: Module,
    /// Hash of the original WASM bytes (for caching).
    hash: u64,
}

impl CompiledModule {
    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the underlying Wasmtime module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Get the hash of this module.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// WASM runtime managing Wasmtime engine and compiled modules.
pub struct WasmRuntime {
    /// The Wasmtime engine (thread-safe, can be shared).
    engine: Engine,
    /// Configuration for this runtime.
    config: WasmRuntimeConfig,
    /// Cache of compiled modules by their content hash.
    module_cache: DashMap<u64, Arc<CompiledModule>>,
}

impl WasmRuntime {
    /// Create a new WASM runtime with the given configuration.
    pub fn new(config: WasmRuntimeConfig) -> Result<Self> {
        config.validate()?;
        let wasmtime_config = config.to_wasmtime_config();
        let engine = Engine::new(&wasmtime_config).map_err(|e| BridgeError::Load {
            module: "engine".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self {
            engine,
            config,
            module_cache: DashMap::new(),
        })
    }

    /// Create a new runtime with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(WasmRuntimeConfig::default())
    }

    /// Get the Wasmtime engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &WasmRuntimeConfig {
        &self.config
    }

    /// Compile WASM bytes into a module.
    ///
    /// If caching is enabled and the module was previously compiled,
    /// returns the cached version.
    pub fn compile(&self, name: &str, wasm_bytes: &[u8]) -> Result<Arc<CompiledModule>> {
        let hash = hash_bytes(wasm_bytes);

        // Check cache first
        if self.config.cache_modules {
            if let Some(cached) = self.module_cache.get(&hash) {
                tracing::debug!(module = name, hash, "Using cached module");
                return Ok(Arc::clone(&cached));
            }
        }

        // Compile the module
        let module = Module::new(&self.engine, wasm_bytes).map_err(|e| BridgeError::Load {
            module: name.to_string(),
            cause: e.to_string(),
        })?;

        let compiled = Arc::new(CompiledModule {
            name: name.to_string(),
            module,
            hash,
        });

        // Cache if enabled
        if self.config.cache_modules {
            self.module_cache.insert(hash, Arc::clone(&compiled));
        }

        Ok(compiled)
    }

    /// Get the number of cached modules.
    pub fn cache_size(&self) -> usize {
        self.module_cache.len()
    }

    /// Fuel granted to each guest call, if fuel is enabled.
    pub fn call_fuel(&self) -> Option<u64> {
        if self.config.fuel_enabled {
            Some(self.config.fuel_amount)
        } else {
            None
        }
    }

    /// Resource limits for a new store.
    pub fn store_limits(&self) -> StoreLimits {
        StoreLimitsBuilder::new()
            .memory_size(self.config.max_memory_bytes())
            .instances(1)
            .build()
    }
}

/// Compute a hash of bytes (for cache key).
fn hash_bytes(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

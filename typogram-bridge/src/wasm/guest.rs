//! Instantiated guest module bound to the bridge ABI.
//!
//! [`WasmGuest`] resolves every export named by [`AbiConfig`] once, at
//! instantiation, and implements [`GuestModule`] over them. Memory is always
//! read through the store, never through a saved pointer, so growth inside
//! any export call is picked up by the next view.

use super::abi::AbiConfig;
use super::runtime::{CompiledModule, WasmRuntime};
use typogram_core::error::{BridgeError, Result};
use typogram_core::guest::GuestModule;
use typogram_core::memory::LinearMemory;
use wasmtime::{
    Global, Instance, Linker, Memory, Mutability, Store, StoreLimits, TypedFunc, Val, ValType,
};

/// Per-store host state.
pub struct GuestState {
    limits: StoreLimits,
}

/// Typed handles to the exports of one instance.
struct Exports {
    memory: Memory,
    malloc: TypedFunc<u32, u32>,
    realloc: Option<TypedFunc<(u32, u32, u32), u32>>,
    free: TypedFunc<(u32, u32), ()>,
    convert: TypedFunc<(u32, u32, u32), ()>,
    stack_pointer: Global,
}

/// A typogram guest running in Wasmtime.
pub struct WasmGuest {
    name: String,
    store: Store<GuestState>,
    instance: Instance,
    exports: Exports,
    abi: AbiConfig,
    call_fuel: Option<u64>,
}

impl WasmGuest {
    /// Instantiate a compiled module and bind its exports.
    pub fn instantiate(
        runtime: &WasmRuntime,
        module: &CompiledModule,
        abi: AbiConfig,
    ) -> Result<Self> {
        abi.validate()?;
        let name = module.name().to_string();

        let state = GuestState {
            limits: runtime.store_limits(),
        };
        let mut store = Store::new(runtime.engine(), state);
        store.limiter(|state| &mut state.limits);

        let call_fuel = runtime.call_fuel();
        if let Some(fuel) = call_fuel {
            store.set_fuel(fuel).map_err(|e| BridgeError::Load {
                module: name.clone(),
                cause: format!("Failed to set fuel: {}", e),
            })?;
        }

        // Typogram guests import nothing; anything they do import fails here.
        let linker: Linker<GuestState> = Linker::new(runtime.engine());
        let instance = linker
            .instantiate(&mut store, module.module())
            .map_err(|e| BridgeError::Load {
                module: name.clone(),
                cause: format!("Failed to instantiate module: {}", e),
            })?;

        let exports = Exports::resolve(&mut store, &instance, &abi)?;

        tracing::info!(
            module = %name,
            hash = format_args!("{:016x}", module.hash()),
            memory_bytes = exports.memory.data_size(&store),
            realloc = exports.realloc.is_some(),
            "Instantiated guest module"
        );

        Ok(Self {
            name,
            store,
            instance,
            exports,
            abi,
            call_fuel,
        })
    }

    /// Name of the module this guest was instantiated from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Export names this guest is bound to.
    pub fn abi(&self) -> &AbiConfig {
        &self.abi
    }

    /// Current linear memory size in wasm pages.
    pub fn memory_pages(&self) -> u64 {
        self.exports.memory.size(&self.store)
    }

    /// Read an exported i32 global by name.
    pub fn global_i32(&mut self, name: &str) -> Option<i32> {
        let global = self.instance.get_global(&mut self.store, name)?;
        match global.get(&mut self.store) {
            Val::I32(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the module exports a function under `name`.
    pub fn has_func(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    /// Top up fuel before a guest call.
    fn refuel(&mut self) -> Result<()> {
        if let Some(fuel) = self.call_fuel {
            self.store
                .set_fuel(fuel)
                .map_err(|e| BridgeError::trap("fuel", e))?;
        }
        Ok(())
    }
}

impl Exports {
    fn resolve(
        store: &mut Store<GuestState>,
        instance: &Instance,
        abi: &AbiConfig,
    ) -> Result<Self> {
        let memory = instance
            .get_memory(&mut *store, &abi.memory)
            .ok_or_else(|| BridgeError::MissingExport {
                kind: "memory",
                name: abi.memory.clone(),
                cause: "not exported".to_string(),
            })?;

        let malloc = typed_func(store, instance, &abi.malloc)?;
        let free = typed_func(store, instance, &abi.free)?;
        let convert = typed_func(store, instance, &abi.convert)?;

        // The reallocation export is optional; if it exists it must be well typed.
        let realloc = match &abi.realloc {
            Some(name) if instance.get_func(&mut *store, name).is_some() => {
                Some(typed_func(store, instance, name)?)
            }
            _ => None,
        };

        let stack_pointer = instance
            .get_global(&mut *store, &abi.stack_pointer)
            .ok_or_else(|| BridgeError::MissingExport {
                kind: "global",
                name: abi.stack_pointer.clone(),
                cause: "not exported".to_string(),
            })?;
        let ty = stack_pointer.ty(&*store);
        if !matches!(ty.mutability(), Mutability::Var) || !matches!(ty.content(), ValType::I32) {
            return Err(BridgeError::MissingExport {
                kind: "global",
                name: abi.stack_pointer.clone(),
                cause: "expected a mutable i32 global".to_string(),
            });
        }

        Ok(Self {
            memory,
            malloc,
            realloc,
            free,
            convert,
            stack_pointer,
        })
    }
}

fn typed_func<P, R>(
    store: &mut Store<GuestState>,
    instance: &Instance,
    name: &str,
) -> Result<TypedFunc<P, R>>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| BridgeError::MissingExport {
            kind: "function",
            name: name.to_string(),
            cause: e.to_string(),
        })
}

impl LinearMemory for WasmGuest {
    fn bytes(&self) -> &[u8] {
        self.exports.memory.data(&self.store)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.exports.memory.data_mut(&mut self.store)
    }
}

impl GuestModule for WasmGuest {
    fn malloc(&mut self, size: u32) -> Result<u32> {
        self.refuel()?;
        self.exports
            .malloc
            .call(&mut self.store, size)
            .map_err(|e| BridgeError::trap(&self.abi.malloc, e))
    }

    fn has_realloc(&self) -> bool {
        self.exports.realloc.is_some()
    }

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32) -> Result<u32> {
        let name = self.abi.realloc.clone().unwrap_or_default();
        let Some(realloc) = self.exports.realloc.clone() else {
            return Err(BridgeError::MissingExport {
                kind: "function",
                name,
                cause: "module has no reallocation export".to_string(),
            });
        };
        self.refuel()?;
        realloc
            .call(&mut self.store, (ptr, old_size, new_size))
            .map_err(|e| BridgeError::trap(&name, e))
    }

    fn free(&mut self, ptr: u32, size: u32) -> Result<()> {
        self.refuel()?;
        self.exports
            .free
            .call(&mut self.store, (ptr, size))
            .map_err(|e| BridgeError::trap(&self.abi.free, e))
    }

    fn convert(&mut self, ret_ptr: u32, ptr: u32, len: u32) -> Result<()> {
        self.refuel()?;
        self.exports
            .convert
            .call(&mut self.store, (ret_ptr, ptr, len))
            .map_err(|e| BridgeError::trap(&self.abi.convert, e))
    }

    fn stack_pointer(&mut self) -> Result<u32> {
        match self.exports.stack_pointer.get(&mut self.store) {
            Val::I32(value) => Ok(value as u32),
            other => Err(BridgeError::contract(
                &self.abi.stack_pointer,
                format!("expected i32, found {:?}", other),
            )),
        }
    }

    fn set_stack_pointer(&mut self, value: u32) -> Result<()> {
        self.exports
            .stack_pointer
            .set(&mut self.store, Val::I32(value as i32))
            .map_err(|e| BridgeError::contract(&self.abi.stack_pointer, e.to_string()))
    }
}

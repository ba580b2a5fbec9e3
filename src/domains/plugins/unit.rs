//! WebAssembly loading units.
//!
//! Every bundle is compiled into its own module and instantiated in its own
//! store, with an empty linker. Bundles therefore share no memory, globals
//! or export namespace with the host or with each other.
//!
//! A bundle declares provider types through exports named after the type:
//!
//! | Export | Signature |
//! |---|---|
//! | `memory` | linear memory |
//! | `alloc` | `(len: i32) -> i32` |
//! | `<Type>.capabilities` | `() -> i64` |
//! | `<Type>.new` | `() -> i32` |
//! | `<Type>.invoke` | `(handle, op_ptr, op_len, args_ptr, args_len) -> i64` |
//!
//! An `i64` result packs a pointer into memory and a length as
//! `(ptr << 32) | len`. Negative results are failure codes.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use wasmtime::{Engine, ExternType, Instance, Linker, Memory, Module, Store, Trap, TypedFunc};

use super::error::PluginError;
use super::provider::{Capability, CapabilityProvider};

const CAPABILITIES_SUFFIX: &str = ".capabilities";

/// A candidate provider type that could not be instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedType {
    pub type_name: String,
    pub reason: String,
}

/// A provider type whose constructor succeeded.
#[derive(Debug, Clone)]
pub struct ProviderType {
    pub type_name: String,
    pub handle: i32,
    pub capabilities: Vec<Capability>,
}

/// What a scan of a freshly opened unit found.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub types: Vec<ProviderType>,
    pub skipped: Vec<SkippedType>,
}

impl ScanReport {
    fn skip(&mut self, plugin_id: &str, type_name: String, reason: String) {
        warn!("Skipping type '{}' in plugin '{}': {}", type_name, plugin_id, reason);
        self.skipped.push(SkippedType { type_name, reason });
    }
}

struct Live {
    store: Store<()>,
    instance: Instance,
    memory: Memory,
    alloc: Option<TypedFunc<i32, i32>>,
}

/// The isolated execution context of one loaded bundle.
///
/// All calls into the unit are serialised by its lock, and every call gets
/// a fresh fuel budget so plugin code cannot run unbounded. Disposal takes
/// the same lock: it waits for an in-flight call, and every later call
/// fails with [`PluginError::Disposed`].
pub struct LoadingUnit {
    plugin_id: String,
    fuel_per_call: u64,
    live: Mutex<Option<Live>>,
}

impl LoadingUnit {
    /// Compile and instantiate `bytes`, then scan the instance for provider
    /// types and construct one instance of each.
    ///
    /// Blocking; run it off the async executor.
    pub fn open(
        engine: &Engine,
        plugin_id: &str,
        path: &Path,
        bytes: &[u8],
        fuel_per_call: u64,
    ) -> Result<(Self, ScanReport), PluginError> {
        let module = Module::new(engine, bytes)
            .map_err(|e| PluginError::load(path, format!("not a valid WebAssembly module: {e}")))?;

        let mut store = Store::new(engine, ());
        store
            .set_fuel(fuel_per_call)
            .map_err(|e| PluginError::internal(e.to_string()))?;
        let instance = Linker::<()>::new(engine)
            .instantiate(&mut store, &module)
            .map_err(|e| PluginError::load(path, format!("instantiation failed: {e}")))?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| PluginError::load(path, "bundle does not export 'memory'"))?;
        let alloc = instance.get_typed_func::<i32, i32>(&mut store, "alloc").ok();

        let mut live = Live {
            store,
            instance,
            memory,
            alloc,
        };

        let type_names: Vec<String> = module
            .exports()
            .filter(|e| matches!(e.ty(), ExternType::Func(_)))
            .filter_map(|e| e.name().strip_suffix(CAPABILITIES_SUFFIX).map(str::to_string))
            .filter(|name| !name.is_empty())
            .collect();

        let mut report = ScanReport::default();
        for type_name in type_names {
            let capabilities = match live.capabilities(&type_name, fuel_per_call) {
                Ok(capabilities) => capabilities,
                Err(reason) => {
                    report.skip(plugin_id, type_name, format!("capability list unreadable: {reason}"));
                    continue;
                }
            };
            if capabilities.is_empty() {
                debug!("Type '{}' declares no capabilities", type_name);
                continue;
            }
            if !live.has_function(&format!("{type_name}.invoke")) {
                let reason = format!("no '{type_name}.invoke' export");
                report.skip(plugin_id, type_name, reason);
                continue;
            }
            if live.alloc.is_none() {
                report.skip(plugin_id, type_name, "bundle exports no 'alloc' function".to_string());
                continue;
            }
            match live.construct(&type_name, fuel_per_call) {
                Ok(handle) => report.types.push(ProviderType {
                    type_name,
                    handle,
                    capabilities,
                }),
                Err(reason) => report.skip(plugin_id, type_name, reason),
            }
        }

        let unit = Self {
            plugin_id: plugin_id.to_string(),
            fuel_per_call,
            live: Mutex::new(Some(live)),
        };
        Ok((unit, report))
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Whether the unit has not been disposed yet.
    pub fn is_live(&self) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Call `<type_name>.invoke` and return the raw result bytes.
    ///
    /// Blocking; run it off the async executor.
    pub fn invoke(
        &self,
        type_name: &str,
        handle: i32,
        operation: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, PluginError> {
        let declaring_type = format!("{}::{}", self.plugin_id, type_name);
        let fail = |reason: String| PluginError::invocation(&declaring_type, operation, reason);

        let mut guard = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        let live = guard
            .as_mut()
            .ok_or_else(|| PluginError::Disposed(self.plugin_id.clone()))?;

        live.store
            .set_fuel(self.fuel_per_call)
            .map_err(|e| PluginError::internal(e.to_string()))?;
        let func = live
            .instance
            .get_typed_func::<(i32, i32, i32, i32, i32), i64>(
                &mut live.store,
                &format!("{type_name}.invoke"),
            )
            .map_err(|e| fail(e.to_string()))?;

        let (op_ptr, op_len) = live.write(operation.as_bytes()).map_err(&fail)?;
        let (args_ptr, args_len) = if args.is_empty() {
            (0, 0)
        } else {
            live.write(args).map_err(&fail)?
        };

        let packed = func
            .call(&mut live.store, (handle, op_ptr, op_len, args_ptr, args_len))
            .map_err(|e| fail(describe_trap(&e)))?;
        if packed < 0 {
            return Err(fail(format!("returned failure code {packed}")));
        }
        live.read(packed).map_err(fail)
    }

    /// Release the store and instance. Returns false if the unit was
    /// already disposed.
    pub fn dispose(&self) -> bool {
        let disposed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if disposed {
            debug!("Disposed loading unit of plugin '{}'", self.plugin_id);
        }
        disposed
    }
}

impl Live {
    fn has_function(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    fn capabilities(&mut self, type_name: &str, fuel: u64) -> Result<Vec<Capability>, String> {
        self.store.set_fuel(fuel).map_err(|e| e.to_string())?;
        let func = self
            .instance
            .get_typed_func::<(), i64>(&mut self.store, &format!("{type_name}{CAPABILITIES_SUFFIX}"))
            .map_err(|e| e.to_string())?;
        let packed = func
            .call(&mut self.store, ())
            .map_err(|e| describe_trap(&e))?;
        if packed < 0 {
            return Err(format!("returned failure code {packed}"));
        }

        let declared: Vec<Capability> =
            serde_json::from_slice(&self.read(packed)?).map_err(|e| e.to_string())?;

        let mut capabilities: Vec<Capability> = Vec::with_capacity(declared.len());
        for capability in declared {
            if capabilities.iter().any(|c| c.name == capability.name) {
                warn!(
                    "Type '{}' declares capability '{}' twice; keeping the first",
                    type_name, capability.name
                );
                continue;
            }
            capabilities.push(capability);
        }
        Ok(capabilities)
    }

    fn construct(&mut self, type_name: &str, fuel: u64) -> Result<i32, String> {
        self.store.set_fuel(fuel).map_err(|e| e.to_string())?;
        let constructor = self
            .instance
            .get_typed_func::<(), i32>(&mut self.store, &format!("{type_name}.new"))
            .map_err(|_| format!("no zero-argument constructor ('{type_name}.new')"))?;
        match constructor.call(&mut self.store, ()) {
            Ok(handle) if handle >= 0 => Ok(handle),
            Ok(code) => Err(format!("constructor returned failure code {code}")),
            Err(e) => Err(format!("constructor failed: {}", describe_trap(&e))),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(i32, i32), String> {
        let len = i32::try_from(bytes.len()).map_err(|_| "payload too large".to_string())?;
        let alloc = self
            .alloc
            .clone()
            .ok_or("bundle exports no 'alloc' function")?;
        let ptr = alloc
            .call(&mut self.store, len)
            .map_err(|e| format!("alloc failed: {}", describe_trap(&e)))?;
        let offset = usize::try_from(ptr).map_err(|_| format!("alloc returned {ptr}"))?;
        self.memory
            .write(&mut self.store, offset, bytes)
            .map_err(|e| format!("cannot write {len} bytes at {ptr}: {e}"))?;
        Ok((ptr, len))
    }

    fn read(&self, packed: i64) -> Result<Vec<u8>, String> {
        let ptr = (packed >> 32) as u32 as usize;
        let len = (packed & 0xffff_ffff) as u32 as usize;
        self.memory
            .data(&self.store)
            .get(ptr..ptr + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| format!("result slice {ptr}+{len} is outside linear memory"))
    }
}

fn describe_trap(error: &wasmtime::Error) -> String {
    match error.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => "ran out of fuel".to_string(),
        Some(trap) => format!("trapped: {trap}"),
        None => error.to_string(),
    }
}

/// A provider type living inside a loading unit.
pub struct WasmProvider {
    unit: Arc<LoadingUnit>,
    declaring_type: String,
    type_name: String,
    handle: i32,
    capabilities: Vec<Capability>,
}

impl WasmProvider {
    pub fn new(unit: Arc<LoadingUnit>, provider: ProviderType) -> Self {
        Self {
            declaring_type: format!("{}::{}", unit.plugin_id(), provider.type_name),
            unit,
            type_name: provider.type_name,
            handle: provider.handle,
            capabilities: provider.capabilities,
        }
    }
}

#[async_trait]
impl CapabilityProvider for WasmProvider {
    fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.clone()
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, PluginError> {
        if !self.capabilities.iter().any(|c| c.operation == operation) {
            return Err(PluginError::unknown_operation(&self.declaring_type, operation));
        }

        let args = match arguments {
            Value::Null => Vec::new(),
            other => serde_json::to_vec(&other).map_err(|e| PluginError::internal(e.to_string()))?,
        };
        let unit = self.unit.clone();
        let type_name = self.type_name.clone();
        let handle = self.handle;
        let op = operation.to_string();

        let raw = tokio::task::spawn_blocking(move || unit.invoke(&type_name, handle, &op, &args))
            .await
            .map_err(|e| PluginError::internal(format!("invocation task failed: {e}")))??;

        if raw.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&raw).map_err(|e| {
            PluginError::invocation(
                &self.declaring_type,
                operation,
                format!("result is not valid JSON: {e}"),
            )
        })
    }
}

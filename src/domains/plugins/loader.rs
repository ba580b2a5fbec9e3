//! Bundle loader - turns uploaded bundles into registered providers.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use wasmtime::Engine;

use super::error::PluginError;
use super::provider::RegisteredObject;
use super::registry::CapabilityRegistry;
use super::unit::{LoadingUnit, SkippedType, WasmProvider};
use crate::core::config::{PluginsConfig, SecurityConfig};
use crate::core::security::validate_bundle_path;

/// File extension of stored bundles.
pub const BUNDLE_EXTENSION: &str = "wasm";

/// Longest name stem kept in a generated plugin id, before the suffix.
pub const MAX_ID_STEM_LEN: usize = 64;

/// Public view of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    pub id: String,
    pub bundle_name: String,
    pub object_count: usize,
    pub loaded_at: DateTime<Utc>,
    /// Candidate types that could not be instantiated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedType>,
}

/// The live record of one successfully loaded bundle.
struct PluginHandle {
    id: String,
    bundle_path: PathBuf,
    unit: Arc<LoadingUnit>,
    objects: Vec<RegisteredObject>,
    skipped: Vec<SkippedType>,
    loaded_at: DateTime<Utc>,
}

impl PluginHandle {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            id: self.id.clone(),
            bundle_name: self
                .bundle_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            object_count: self.objects.len(),
            loaded_at: self.loaded_at,
            skipped: self.skipped.clone(),
        }
    }
}

/// Ids that are being loaded right now, and ids whose plugin was unloaded
/// and may not be reused.
#[derive(Default)]
struct IdLedger {
    pending: HashSet<String>,
    retired: HashSet<String>,
}

/// Releases a pending id when the load finishes, whatever the outcome.
struct Reservation<'a> {
    ledger: &'a Mutex<IdLedger>,
    id: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .remove(&self.id);
    }
}

/// Create the WebAssembly engine used for every loading unit.
pub(crate) fn new_engine() -> Result<Engine, PluginError> {
    let mut config = wasmtime::Config::new();
    config.consume_fuel(true);
    Engine::new(&config)
        .map_err(|e| PluginError::internal(format!("cannot create WebAssembly engine: {e}")))
}

/// Loads bundles into isolated loading units and registers what they
/// provide.
///
/// Bundle I/O and compilation never run under a lock shared with the
/// registry; the registry is only touched once the bundle has been fully
/// scanned.
pub struct BundleLoader {
    engine: Engine,
    registry: Arc<CapabilityRegistry>,
    plugins: PluginsConfig,
    security: SecurityConfig,
    loaded: RwLock<HashMap<String, PluginHandle>>,
    ids: Mutex<IdLedger>,
}

impl BundleLoader {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        plugins: PluginsConfig,
        security: SecurityConfig,
    ) -> Result<Self, PluginError> {
        Ok(Self {
            engine: new_engine()?,
            registry,
            plugins,
            security,
            loaded: RwLock::new(HashMap::new()),
            ids: Mutex::new(IdLedger::default()),
        })
    }

    /// Directory uploaded bundles are written to.
    pub fn storage_root(&self) -> &Path {
        &self.plugins.storage_dir
    }

    /// Load the bundle at `bundle_path` under `plugin_id`.
    ///
    /// Candidate types whose constructor is missing or fails are skipped and
    /// reported in the descriptor; a load that yields no providers at all
    /// still succeeds.
    #[instrument(skip(self, bundle_path), fields(plugin = %plugin_id))]
    pub async fn load(
        &self,
        plugin_id: &str,
        bundle_path: &Path,
    ) -> Result<PluginDescriptor, PluginError> {
        if plugin_id.trim().is_empty() {
            return Err(PluginError::invalid_input("plugin id is blank"));
        }

        let storage_root = self
            .security
            .restrict_bundles_to_storage
            .then_some(self.plugins.storage_dir.as_path());
        let path = validate_bundle_path(bundle_path, storage_root, self.security.allow_symlinks)
            .map_err(|e| PluginError::load(bundle_path, e.to_string()))?;

        let _reservation = self.reserve(plugin_id)?;
        if self.loaded.read().await.contains_key(plugin_id) {
            return Err(PluginError::conflict(plugin_id));
        }

        let size = self
            .bounded("inspecting", &path, tokio::fs::metadata(&path))
            .await?
            .len();
        if size > self.plugins.max_bundle_bytes {
            return Err(PluginError::load(
                &path,
                format!(
                    "bundle is {size} bytes, the limit is {}",
                    self.plugins.max_bundle_bytes
                ),
            ));
        }
        let bytes = self.bounded("reading", &path, tokio::fs::read(&path)).await?;

        let engine = self.engine.clone();
        let id = plugin_id.to_string();
        let unit_path = path.clone();
        let fuel = self.plugins.fuel_per_call;
        let (unit, report) = tokio::task::spawn_blocking(move || {
            LoadingUnit::open(&engine, &id, &unit_path, &bytes, fuel)
        })
        .await
        .map_err(|e| PluginError::internal(format!("bundle scan task failed: {e}")))??;

        let unit = Arc::new(unit);
        let objects: Vec<RegisteredObject> = report
            .types
            .into_iter()
            .map(|t| Arc::new(WasmProvider::new(unit.clone(), t)) as RegisteredObject)
            .collect();

        let handle = PluginHandle {
            id: plugin_id.to_string(),
            bundle_path: path,
            unit,
            objects,
            skipped: report.skipped,
            loaded_at: Utc::now(),
        };
        let descriptor = handle.descriptor();

        {
            let mut loaded = self.loaded.write().await;
            self.registry
                .register_plugin_objects(plugin_id, handle.objects.clone())?;
            loaded.insert(plugin_id.to_string(), handle);
        }

        info!(
            "Loaded plugin '{}' from '{}' ({} object(s), {} skipped)",
            descriptor.id,
            descriptor.bundle_name,
            descriptor.object_count,
            descriptor.skipped.len()
        );
        Ok(descriptor)
    }

    /// Store an incoming bundle under a fresh plugin id and load it.
    ///
    /// The id is derived from `original_name` plus a random suffix, so two
    /// uploads of the same bundle never collide. If loading fails the
    /// stored file is removed again.
    #[instrument(skip(self, reader))]
    pub async fn upload_and_load<R>(
        &self,
        reader: R,
        original_name: &str,
    ) -> Result<PluginDescriptor, PluginError>
    where
        R: AsyncRead + Unpin,
    {
        if original_name.trim().is_empty() {
            return Err(PluginError::invalid_input("bundle name is blank"));
        }

        let root = self.plugins.storage_dir.clone();
        self.bounded("creating", &root, tokio::fs::create_dir_all(&root))
            .await?;

        let plugin_id = generate_plugin_id(original_name);
        let path = root.join(format!("{plugin_id}.{BUNDLE_EXTENSION}"));
        let limit = self.plugins.max_bundle_bytes;

        let written = match self
            .bounded("writing", &path, write_limited(&path, reader, limit))
            .await
        {
            Ok(written) => written,
            Err(e) => {
                remove_quietly(&path).await;
                return Err(e);
            }
        };
        if written > limit {
            remove_quietly(&path).await;
            return Err(PluginError::load(
                &path,
                format!("bundle exceeds the limit of {limit} bytes"),
            ));
        }
        debug!("Stored {} bytes at '{}'", written, path.display());

        match self.load(&plugin_id, &path).await {
            Ok(descriptor) => Ok(descriptor),
            Err(e) => {
                remove_quietly(&path).await;
                Err(e)
            }
        }
    }

    /// Unload a plugin. Returns false if no plugin has this id.
    ///
    /// The plugin's providers leave the registry before its loading unit is
    /// disposed. Disposal and bundle deletion failures are logged and do
    /// not undo the unload.
    #[instrument(skip(self))]
    pub async fn unload(&self, plugin_id: &str, delete_bundle: bool) -> bool {
        let handle = {
            let mut loaded = self.loaded.write().await;
            let Some(handle) = loaded.remove(plugin_id) else {
                debug!("Unload requested for unknown plugin '{}'", plugin_id);
                return false;
            };
            self.registry.unregister_plugin(plugin_id);
            self.ids
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retired
                .insert(plugin_id.to_string());
            handle
        };

        let PluginHandle {
            unit, bundle_path, ..
        } = handle;

        let disposal = tokio::task::spawn_blocking(move || unit.dispose());
        match tokio::time::timeout(self.plugins.io_timeout(), disposal).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Disposing plugin '{}' failed: {}", plugin_id, e),
            Err(_) => warn!("Disposing plugin '{}' timed out", plugin_id),
        }

        if delete_bundle {
            match self
                .bounded("deleting", &bundle_path, tokio::fs::remove_file(&bundle_path))
                .await
            {
                Ok(()) => debug!("Deleted bundle '{}'", bundle_path.display()),
                Err(PluginError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    debug!("Bundle '{}' was already gone", bundle_path.display())
                }
                Err(e) => warn!("Failed to delete bundle of plugin '{}': {}", plugin_id, e),
            }
        }

        info!("Unloaded plugin '{}'", plugin_id);
        true
    }

    /// Every loaded plugin, oldest first.
    pub async fn list(&self) -> Vec<PluginDescriptor> {
        let mut plugins: Vec<_> = self
            .loaded
            .read()
            .await
            .values()
            .map(PluginHandle::descriptor)
            .collect();
        plugins.sort_by(|a, b| a.loaded_at.cmp(&b.loaded_at).then_with(|| a.id.cmp(&b.id)));
        plugins
    }

    pub async fn get(&self, plugin_id: &str) -> Option<PluginDescriptor> {
        self.loaded
            .read()
            .await
            .get(plugin_id)
            .map(PluginHandle::descriptor)
    }

    /// Load every bundle already present in the storage directory, using
    /// the file stem as plugin id. Failures are logged and skipped.
    pub async fn load_existing(&self) -> Vec<PluginDescriptor> {
        let root = self.plugins.storage_dir.clone();
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot scan plugin directory '{}': {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut paths = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == BUNDLE_EXTENSION) {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while scanning '{}': {}", root.display(), e);
                    break;
                }
            }
        }
        paths.sort();

        let mut descriptors = Vec::new();
        for path in paths {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.load(&sanitize_id(&stem), &path).await {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => warn!("Skipping bundle '{}': {}", path.display(), e),
            }
        }
        descriptors
    }

    /// Unload every plugin, keeping the bundle files.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.loaded.read().await.keys().cloned().collect();
        if !ids.is_empty() {
            info!("Unloading {} plugin(s)", ids.len());
        }
        for id in ids {
            self.unload(&id, false).await;
        }
    }

    fn reserve(&self, plugin_id: &str) -> Result<Reservation<'_>, PluginError> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.retired.contains(plugin_id) || !ids.pending.insert(plugin_id.to_string()) {
            return Err(PluginError::conflict(plugin_id));
        }
        Ok(Reservation {
            ledger: &self.ids,
            id: plugin_id.to_string(),
        })
    }

    /// Run a storage operation under the configured I/O timeout.
    async fn bounded<T>(
        &self,
        action: &'static str,
        path: &Path,
        operation: impl Future<Output = io::Result<T>>,
    ) -> Result<T, PluginError> {
        match tokio::time::timeout(self.plugins.io_timeout(), operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PluginError::io(path, e)),
            Err(_) => Err(PluginError::Timeout {
                action,
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Derive a collision-resistant plugin id from an uploaded file name.
pub fn generate_plugin_id(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let stem = base
        .strip_suffix(&format!(".{BUNDLE_EXTENSION}"))
        .unwrap_or(base);
    let mut id = sanitize_id(stem);
    id.truncate(MAX_ID_STEM_LEN);
    if id.is_empty() {
        id = "plugin".to_string();
    }
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{id}-{}", &suffix[..8])
}

/// Replace everything outside `[A-Za-z0-9_-]` with `-`.
fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

async fn write_limited<R>(path: &Path, reader: R, limit: u64) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut limited = reader.take(limit.saturating_add(1));
    let written = tokio::io::copy(&mut limited, &mut file).await?;
    file.flush().await?;
    Ok(written)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!("Failed to remove '{}': {}", path.display(), e);
    }
}

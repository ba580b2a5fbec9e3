//! Capability registry - the merge point of core and plugin providers.

use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use super::error::PluginError;
use super::provider::RegisteredObject;

/// The providers owned by one loaded plugin.
#[derive(Clone)]
pub struct PluginBucket {
    pub id: String,
    pub objects: Vec<RegisteredObject>,
}

/// A consistent view of the registry taken under a single read lock.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    pub core: Vec<RegisteredObject>,
    pub plugins: Vec<PluginBucket>,
}

impl RegistrySnapshot {
    /// Core objects followed by every plugin's objects, in load order.
    pub fn all_objects(&self) -> Vec<RegisteredObject> {
        self.core
            .iter()
            .chain(self.plugins.iter().flat_map(|b| b.objects.iter()))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct RegistryState {
    core: Vec<RegisteredObject>,
    plugins: Vec<PluginBucket>,
}

/// Process-wide registry of capability providers.
///
/// Core providers are registered once at startup and live for the whole
/// process. Plugin providers are added and removed in groups keyed by
/// plugin id.
#[derive(Default)]
pub struct CapabilityRegistry {
    state: RwLock<RegistryState>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a core provider. A second provider with the same declaring
    /// type is ignored; returns whether `object` was added.
    pub fn register_core(&self, object: RegisteredObject) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let declaring_type = object.declaring_type();
        if state
            .core
            .iter()
            .any(|o| o.declaring_type() == declaring_type)
        {
            debug!("Core provider '{}' already registered", declaring_type);
            return false;
        }
        info!("Registered core provider '{}'", declaring_type);
        state.core.push(object);
        true
    }

    /// Register several core providers; returns how many were added.
    pub fn register_cores(&self, objects: impl IntoIterator<Item = RegisteredObject>) -> usize {
        objects
            .into_iter()
            .filter(|o| self.register_core(o.clone()))
            .count()
    }

    /// Append `objects` to the bucket of `plugin_id`, creating it if needed.
    /// An empty list changes nothing.
    pub fn register_plugin_objects(
        &self,
        plugin_id: &str,
        objects: Vec<RegisteredObject>,
    ) -> Result<(), PluginError> {
        if plugin_id.trim().is_empty() {
            return Err(PluginError::invalid_input("plugin id is blank"));
        }
        if objects.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let count = objects.len();
        match state.plugins.iter_mut().find(|b| b.id == plugin_id) {
            Some(bucket) => bucket.objects.extend(objects),
            None => state.plugins.push(PluginBucket {
                id: plugin_id.to_string(),
                objects,
            }),
        }
        info!("Registered {} object(s) for plugin '{}'", count, plugin_id);
        Ok(())
    }

    /// Drop the whole bucket of `plugin_id`; returns how many objects it
    /// held (0 when the id is unknown).
    pub fn unregister_plugin(&self, plugin_id: &str) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = state.plugins.iter().position(|b| b.id == plugin_id) else {
            return 0;
        };
        let bucket = state.plugins.remove(index);
        info!(
            "Unregistered {} object(s) of plugin '{}'",
            bucket.objects.len(),
            plugin_id
        );
        bucket.objects.len()
    }

    /// Core objects followed by all plugin objects.
    pub fn list_all_objects(&self) -> Vec<RegisteredObject> {
        self.snapshot().all_objects()
    }

    pub fn list_plugins(&self) -> Vec<PluginBucket> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .plugins
            .clone()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            core: state.core.clone(),
            plugins: state.plugins.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::plugins::provider::{Capability, CapabilityProvider, same_object};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct Fixed(&'static str);

    #[async_trait]
    impl CapabilityProvider for Fixed {
        fn declaring_type(&self) -> &str {
            self.0
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::new("ping", "", "ping")]
        }

        async fn invoke(&self, _operation: &str, _arguments: Value) -> Result<Value, PluginError> {
            Ok(Value::Null)
        }
    }

    fn object(declaring_type: &'static str) -> RegisteredObject {
        Arc::new(Fixed(declaring_type))
    }

    #[test]
    fn test_register_core_is_idempotent_by_type() {
        let registry = CapabilityRegistry::new();
        let first = object("core::Clock");

        assert!(registry.register_core(first.clone()));
        assert!(!registry.register_core(object("core::Clock")));
        assert_eq!(registry.register_cores([object("core::Clock"), object("core::Math")]), 1);

        let all = registry.list_all_objects();
        assert_eq!(all.len(), 2);
        assert!(same_object(&all[0], &first));
    }

    #[test]
    fn test_plugin_buckets() {
        let registry = CapabilityRegistry::new();
        registry.register_core(object("core::Clock"));
        registry
            .register_plugin_objects("a", vec![object("a::T")])
            .unwrap();
        registry
            .register_plugin_objects("b", vec![object("b::T"), object("b::U")])
            .unwrap();
        registry
            .register_plugin_objects("a", vec![object("a::U")])
            .unwrap();

        let plugins = registry.list_plugins();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[0].objects.len(), 2);
        assert_eq!(registry.list_all_objects().len(), 5);
    }

    #[test]
    fn test_empty_registration_is_noop() {
        let registry = CapabilityRegistry::new();
        registry.register_plugin_objects("empty", Vec::new()).unwrap();
        assert!(registry.list_plugins().is_empty());
    }

    #[test]
    fn test_blank_plugin_id_is_invalid() {
        let registry = CapabilityRegistry::new();
        let err = registry
            .register_plugin_objects(" ", vec![object("x::T")])
            .unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_unregister_removes_only_that_plugin() {
        let registry = CapabilityRegistry::new();
        registry.register_core(object("core::Clock"));
        let kept = object("b::T");
        registry
            .register_plugin_objects("a", vec![object("a::T"), object("a::U")])
            .unwrap();
        registry
            .register_plugin_objects("b", vec![kept.clone()])
            .unwrap();

        assert_eq!(registry.unregister_plugin("a"), 2);
        assert_eq!(registry.unregister_plugin("a"), 0);
        assert_eq!(registry.unregister_plugin("unknown"), 0);

        let all = registry.list_all_objects();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].declaring_type(), "core::Clock");
        assert!(same_object(&all[1], &kept));
    }
}

//! Read-only catalog of every registered capability, re-derived from the
//! registry on each call.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;

use crate::domains::plugins::{Capability, CapabilityRegistry, RegisteredObject, same_object};

/// Source reported for capabilities that ship with the server.
pub const CORE_SOURCE: &str = "core";

/// One invocable capability as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub declaring_type: String,
    pub operation: String,
    /// `"core"` or the id of the plugin that owns the provider.
    pub source: String,
}

/// Read-only projection of the [`CapabilityRegistry`].
#[derive(Clone)]
pub struct CatalogView {
    registry: Arc<CapabilityRegistry>,
}

impl CatalogView {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Every capability of every registered object: core objects first,
    /// then plugins in load order.
    pub fn list_direct(&self) -> Vec<CapabilityDescriptor> {
        self.entries()
            .into_iter()
            .map(|(object, capability, source)| CapabilityDescriptor {
                name: capability.name,
                description: capability.description,
                declaring_type: object.declaring_type().to_string(),
                operation: capability.operation,
                source,
            })
            .collect()
    }

    /// Find the provider behind the capability called `name`. The first
    /// match in catalog order wins.
    pub fn resolve(&self, name: &str) -> Option<(RegisteredObject, Capability)> {
        self.entries()
            .into_iter()
            .find(|(_, capability, _)| capability.name == name)
            .map(|(object, capability, _)| (object, capability))
    }

    fn entries(&self) -> Vec<(RegisteredObject, Capability, String)> {
        let snapshot = self.registry.snapshot();
        let mut entries = Vec::new();

        for object in snapshot.all_objects() {
            let source = snapshot
                .plugins
                .iter()
                .find(|bucket| bucket.objects.iter().any(|owned| same_object(owned, &object)))
                .map_or_else(|| CORE_SOURCE.to_string(), |bucket| bucket.id.clone());

            for capability in object.capabilities() {
                entries.push((object.clone(), capability, source.clone()));
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PluginsConfig, SecurityConfig};
    use crate::domains::plugins::test_bundles::{constructorless_bundle, greeter_bundle};
    use crate::domains::plugins::{BundleLoader, CapabilityProvider, PluginError};
    use async_trait::async_trait;
    use serde_json::Value;
    use tempfile::TempDir;

    struct Clock;

    #[async_trait]
    impl CapabilityProvider for Clock {
        fn declaring_type(&self) -> &str {
            "core::Clock"
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![
                Capability::new("now", "Current time", "now"),
                Capability::new("helloWorld", "Shadows plugin greeting", "hello"),
            ]
        }

        async fn invoke(&self, _operation: &str, _arguments: Value) -> Result<Value, PluginError> {
            Ok(Value::Null)
        }
    }

    fn setup(dir: &TempDir) -> (CatalogView, BundleLoader) {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.register_core(Arc::new(Clock));
        let plugins = PluginsConfig {
            storage_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let loader = BundleLoader::new(registry.clone(), plugins, SecurityConfig::default()).unwrap();
        (CatalogView::new(registry), loader)
    }

    fn from_source<'a>(catalog: &'a [CapabilityDescriptor], source: &str) -> Vec<&'a CapabilityDescriptor> {
        catalog.iter().filter(|d| d.source == source).collect()
    }

    #[test]
    fn test_core_only_catalog() {
        let dir = TempDir::new().unwrap();
        let (view, _) = setup(&dir);

        let catalog = view.list_direct();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().all(|d| d.source == CORE_SOURCE));
        assert_eq!(catalog[0].declaring_type, "core::Clock");
        assert_eq!(catalog[0].operation, "now");
    }

    #[test]
    fn test_registering_core_twice_adds_no_duplicates() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.register_core(Arc::new(Clock));
        registry.register_core(Arc::new(Clock));

        let catalog = CatalogView::new(registry).list_direct();
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_plugin_entries_follow_load_and_unload() {
        let dir = TempDir::new().unwrap();
        let (view, loader) = setup(&dir);

        let descriptor = loader
            .upload_and_load(greeter_bundle().as_slice(), "greeter.wasm")
            .await
            .unwrap();
        assert_eq!(descriptor.object_count, 1);

        let catalog = view.list_direct();
        let plugin_entries = from_source(&catalog, &descriptor.id);
        assert_eq!(plugin_entries.len(), 2);
        assert_eq!(
            plugin_entries[0].declaring_type,
            format!("{}::Greeter", descriptor.id)
        );
        assert_eq!(from_source(&catalog, CORE_SOURCE).len(), 2);

        assert!(loader.unload(&descriptor.id, false).await);
        let catalog = view.list_direct();
        assert!(from_source(&catalog, &descriptor.id).is_empty());
        assert_eq!(from_source(&catalog, CORE_SOURCE).len(), 2);
        assert!(dir.path().join(&descriptor.bundle_name).exists());
    }

    #[tokio::test]
    async fn test_constructorless_type_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        let (view, loader) = setup(&dir);

        let descriptor = loader
            .upload_and_load(constructorless_bundle().as_slice(), "stateful.wasm")
            .await
            .unwrap();
        assert_eq!(descriptor.object_count, 0);
        assert!(from_source(&view.list_direct(), &descriptor.id).is_empty());
    }

    #[tokio::test]
    async fn test_resolve_prefers_catalog_order() {
        let dir = TempDir::new().unwrap();
        let (view, loader) = setup(&dir);
        loader
            .upload_and_load(greeter_bundle().as_slice(), "greeter.wasm")
            .await
            .unwrap();

        let (object, capability) = view.resolve("helloWorld").unwrap();
        assert_eq!(object.declaring_type(), "core::Clock");
        assert_eq!(capability.operation, "hello");

        let (object, _) = view.resolve("greetUser").unwrap();
        assert!(object.declaring_type().ends_with("::Greeter"));
        assert!(view.resolve("missing").is_none());
    }
}

//! The capability-provider abstraction.
//!
//! Anything that exposes callable operations to the registry implements
//! [`CapabilityProvider`]: built-in services as well as the provider types
//! found inside loaded bundles.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::PluginError;

/// One callable operation offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Name callers address the capability by.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Provider-local operation id passed to [`CapabilityProvider::invoke`].
    pub operation: String,
}

impl Capability {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            operation: operation.into(),
        }
    }
}

#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Identity of the provider's type. Core registration is de-duplicated
    /// on this value.
    fn declaring_type(&self) -> &str;

    /// The operations this provider exposes.
    fn capabilities(&self) -> Vec<Capability>;

    /// Run `operation` with JSON arguments.
    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, PluginError>;
}

/// A provider instance held by the registry.
///
/// Identity is the allocation the `Arc` points to, never the declaring type:
/// two plugins may each own a provider of the same type.
pub type RegisteredObject = Arc<dyn CapabilityProvider>;

/// Whether two registered objects are the same instance.
pub fn same_object(a: &RegisteredObject, b: &RegisteredObject) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

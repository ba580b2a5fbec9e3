//! Plugins domain.
//!
//! Bundles are WebAssembly modules loaded at runtime by [`BundleLoader`].
//! Each one gets its own [`LoadingUnit`]; the provider types it declares are
//! registered in the [`CapabilityRegistry`] next to the core providers the
//! server ships with.

mod error;
pub mod loader;
mod provider;
mod registry;
mod unit;

#[cfg(test)]
pub(crate) mod test_bundles;

pub use error::PluginError;
pub use loader::{BundleLoader, PluginDescriptor};
pub use provider::{Capability, CapabilityProvider, RegisteredObject, same_object};
pub use registry::{CapabilityRegistry, PluginBucket, RegistrySnapshot};
pub use unit::{LoadingUnit, SkippedType, WasmProvider};

//! Shared services handed to every tool.

use std::sync::Arc;

use tracing::info;

use super::builtin::BuiltinToolsProvider;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::domains::catalog::CatalogView;
use crate::domains::expressions::{ExpressionExecutor, ExpressionToolStore};
use crate::domains::plugins::{BundleLoader, CapabilityRegistry, RegisteredObject};

/// The process-wide services, passed explicitly to tools and transports.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
    pub expressions: Arc<ExpressionToolStore>,
    pub executor: Arc<ExpressionExecutor>,
    pub registry: Arc<CapabilityRegistry>,
    pub loader: Arc<BundleLoader>,
    pub catalog: CatalogView,
}

impl ToolContext {
    /// Build every service and register the core providers.
    ///
    /// Creates the plugin storage directory if it does not exist yet.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let storage_dir = &config.plugins.storage_dir;
        std::fs::create_dir_all(storage_dir).map_err(|e| {
            Error::config(format!(
                "cannot create plugin storage directory '{}': {}",
                storage_dir.display(),
                e
            ))
        })?;

        let expressions = Arc::new(ExpressionToolStore::new());
        let executor = Arc::new(ExpressionExecutor::new(
            expressions.clone(),
            config.expressions.max_expression_len,
        ));
        let registry = Arc::new(CapabilityRegistry::new());
        let loader = Arc::new(BundleLoader::new(
            registry.clone(),
            config.plugins.clone(),
            config.security.clone(),
        )?);
        let catalog = CatalogView::new(registry.clone());

        let registered = registry.register_cores([
            Arc::new(BuiltinToolsProvider) as RegisteredObject,
            executor.clone() as RegisteredObject,
        ]);
        info!("Registered {} core provider(s)", registered);

        Ok(Self {
            config,
            expressions,
            executor,
            registry,
            loader,
            catalog,
        })
    }
}

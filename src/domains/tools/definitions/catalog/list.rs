//! Lists every registered capability.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::common::success;
use crate::domains::catalog::CapabilityDescriptor;
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CatalogListParams {}

/// The merged catalog.
#[derive(Debug, Serialize, JsonSchema)]
struct CatalogListResult {
    /// Core capabilities first, then plugins in load order.
    capabilities: Vec<CapabilityDescriptor>,
}

pub struct CatalogListTool;

impl CatalogListTool {
    pub const NAME: &'static str = "catalog_list";

    pub const DESCRIPTION: &'static str = "List every capability currently offered by core providers and loaded plugins. Each entry names its source: \"core\" or a plugin id.";

    pub fn execute(services: &ToolContext) -> CallToolResult {
        let capabilities = services.catalog.list_direct();
        success(
            format!("{} capabilities", capabilities.len()),
            &CatalogListResult { capabilities },
        )
    }

    #[cfg(feature = "http")]
    pub fn http_handler(
        _arguments: serde_json::Value,
        services: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        super::super::common::to_http_value(&Self::execute(services))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<CatalogListParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<CatalogListResult>().into()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>(services: ToolContext) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |_ctx: ToolCallContext<'_, S>| {
            let services = services.clone();
            async move { Ok::<_, McpError>(Self::execute(&services)) }.boxed()
        })
    }
}

//! Tool Registry - tool names, metadata and HTTP dispatch.

#[cfg(feature = "http")]
use tracing::warn;

use rmcp::model::Tool;

use super::definitions::{
    CatalogListTool, DynamicToolsAddTool, DynamicToolsExecuteTool, DynamicToolsListTool,
    DynamicToolsRemoveTool, PluginsListTool, PluginsUnloadTool, PluginsUploadTool,
};
#[cfg(feature = "http")]
use super::{ToolContext, ToolError};

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - the administrative tools and their dispatch.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
pub struct ToolRegistry {
    #[cfg(feature = "http")]
    services: ToolContext,
}

impl ToolRegistry {
    /// Create a new tool registry.
    #[cfg(feature = "http")]
    pub fn new(services: ToolContext) -> Self {
        Self { services }
    }

    /// Names of every administrative tool.
    pub fn tool_names() -> Vec<&'static str> {
        vec![
            DynamicToolsListTool::NAME,
            DynamicToolsAddTool::NAME,
            DynamicToolsRemoveTool::NAME,
            DynamicToolsExecuteTool::NAME,
            PluginsUploadTool::NAME,
            PluginsListTool::NAME,
            PluginsUnloadTool::NAME,
            CatalogListTool::NAME,
        ]
    }

    /// Whether `name` is an administrative tool.
    pub fn contains(name: &str) -> bool {
        Self::tool_names().contains(&name)
    }

    /// Metadata for every administrative tool.
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            DynamicToolsListTool::to_tool(),
            DynamicToolsAddTool::to_tool(),
            DynamicToolsRemoveTool::to_tool(),
            DynamicToolsExecuteTool::to_tool(),
            PluginsUploadTool::to_tool(),
            PluginsListTool::to_tool(),
            PluginsUnloadTool::to_tool(),
            CatalogListTool::to_tool(),
        ]
    }

    /// Dispatch an HTTP tool call to the appropriate handler.
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let services = &self.services;
        match name {
            DynamicToolsListTool::NAME => DynamicToolsListTool::http_handler(arguments, services),
            DynamicToolsAddTool::NAME => DynamicToolsAddTool::http_handler(arguments, services),
            DynamicToolsRemoveTool::NAME => {
                DynamicToolsRemoveTool::http_handler(arguments, services)
            }
            DynamicToolsExecuteTool::NAME => {
                DynamicToolsExecuteTool::http_handler(arguments, services)
            }
            PluginsUploadTool::NAME => PluginsUploadTool::http_handler(arguments, services).await,
            PluginsListTool::NAME => PluginsListTool::http_handler(arguments, services).await,
            PluginsUnloadTool::NAME => PluginsUnloadTool::http_handler(arguments, services).await,
            CatalogListTool::NAME => CatalogListTool::http_handler(arguments, services),
            _ => {
                warn!("Unknown tool requested: {}", name);
                Err(ToolError::not_found(name))
            }
        }
    }
}

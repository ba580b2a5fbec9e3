//! Tool Router - builds the rmcp ToolRouter for the administrative tools.
//!
//! Each tool knows how to create its own route. Capabilities offered by
//! registered providers are not routed here; the server resolves them
//! through the catalog on every call.

use rmcp::handler::server::tool::ToolRouter;

use super::ToolContext;
use super::definitions::{
    CatalogListTool, DynamicToolsAddTool, DynamicToolsExecuteTool, DynamicToolsListTool,
    DynamicToolsRemoveTool, PluginsListTool, PluginsUnloadTool, PluginsUploadTool,
};

/// Build the tool router with all administrative tools.
pub fn build_tool_router<S>(services: ToolContext) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(DynamicToolsListTool::create_route(services.clone()))
        .with_route(DynamicToolsAddTool::create_route(services.clone()))
        .with_route(DynamicToolsRemoveTool::create_route(services.clone()))
        .with_route(DynamicToolsExecuteTool::create_route(services.clone()))
        .with_route(PluginsUploadTool::create_route(services.clone()))
        .with_route(PluginsListTool::create_route(services.clone()))
        .with_route(PluginsUnloadTool::create_route(services.clone()))
        .with_route(CatalogListTool::create_route(services))
}

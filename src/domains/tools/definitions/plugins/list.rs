//! Lists loaded plugins.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::super::common::success;
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PluginsListParams {}

pub struct PluginsListTool;

impl PluginsListTool {
    pub const NAME: &'static str = "plugins_list";

    pub const DESCRIPTION: &'static str = "List loaded plugins in load order with their provider counts.";

    pub async fn execute(services: &ToolContext) -> CallToolResult {
        let plugins = services.loader.list().await;
        success(
            format!("{} plugin(s) loaded", plugins.len()),
            &json!({ "plugins": plugins }),
        )
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        _arguments: serde_json::Value,
        services: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        super::super::common::to_http_value(&Self::execute(services).await)
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<PluginsListParams>().into(),
            annotations: None,
            output_schema: None,
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
            async move { Ok::<_, McpError>(Self::execute(&services).await) }.boxed()
        })
    }
}

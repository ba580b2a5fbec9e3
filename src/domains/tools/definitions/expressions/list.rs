//! Lists the stored expression tools.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::super::common::success;
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DynamicToolsListParams {}

pub struct DynamicToolsListTool;

impl DynamicToolsListTool {
    pub const NAME: &'static str = "dynamic_tools_list";

    pub const DESCRIPTION: &'static str =
        "List every expression tool, sorted by name, with its expression and timestamps.";

    #[instrument(skip_all)]
    pub fn execute(services: &ToolContext) -> CallToolResult {
        let tools = services.expressions.list();
        success(
            format!("{} expression tool(s)", tools.len()),
            &json!({ "tools": tools }),
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
            input_schema: schema_for_type::<DynamicToolsListParams>().into(),
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
            async move { Ok::<_, McpError>(Self::execute(&services)) }.boxed()
        })
    }
}

//! Removes an expression tool.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::super::common::{parse_params, success};
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DynamicToolsRemoveParams {
    /// Name of the expression tool to remove.
    pub name: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RemoveResult {
    name: String,
    /// False when no tool had this name.
    removed: bool,
}

pub struct DynamicToolsRemoveTool;

impl DynamicToolsRemoveTool {
    pub const NAME: &'static str = "dynamic_tools_remove";

    pub const DESCRIPTION: &'static str =
        "Remove an expression tool by name. Removing an unknown name is not an error.";

    #[instrument(skip_all, fields(tool = %params.name))]
    pub fn execute(params: DynamicToolsRemoveParams, services: &ToolContext) -> CallToolResult {
        let removed = services.expressions.remove(&params.name).is_some();
        let summary = if removed {
            format!("Removed expression tool '{}'", params.name)
        } else {
            format!("No expression tool named '{}'", params.name)
        };
        success(
            summary,
            &RemoveResult {
                name: params.name,
                removed,
            },
        )
    }

    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        services: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let params = super::super::common::parse_http_params(arguments)?;
        super::super::common::to_http_value(&Self::execute(params, services))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<DynamicToolsRemoveParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<RemoveResult>().into()),
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>(services: ToolContext) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let services = services.clone();
            async move {
                let params: DynamicToolsRemoveParams = parse_params(args)?;
                Ok(Self::execute(params, &services))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::expressions::ExpressionTool;
    use crate::domains::tools::context::test_support::context_in;
    use tempfile::TempDir;

    #[test]
    fn test_remove_present_and_absent() {
        let dir = TempDir::new().unwrap();
        let services = context_in(&dir);
        services.expressions.add(ExpressionTool::new("gone", "1")).unwrap();

        let result = DynamicToolsRemoveTool::execute(
            DynamicToolsRemoveParams { name: "gone".into() },
            &services,
        );
        assert_eq!(result.structured_content.unwrap()["removed"], true);
        assert!(!services.expressions.exists("gone"));

        let result = DynamicToolsRemoveTool::execute(
            DynamicToolsRemoveParams { name: "gone".into() },
            &services,
        );
        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.structured_content.unwrap()["removed"], false);
    }
}

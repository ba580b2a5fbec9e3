//! Adds or replaces an expression tool.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::super::common::{failure, parse_params, success};
use crate::domains::expressions::ExpressionTool;
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

// ============================================================================
// Tool Parameters
// ============================================================================

/// How an incoming tool is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AddMode {
    /// Fail if a tool with this name already exists.
    #[default]
    Add,
    /// Replace an existing tool, keeping its creation time.
    Upsert,
}

/// An expression tool as submitted by a caller.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionToolDraft {
    /// Unique tool name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Expression over the named arguments, e.g. `a * b`.
    #[serde(default)]
    pub expression: Option<String>,
    /// Names of the arguments the expression expects.
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
}

impl From<ExpressionToolDraft> for ExpressionTool {
    fn from(draft: ExpressionToolDraft) -> Self {
        Self {
            name: draft.name,
            description: draft.description,
            expression: draft.expression,
            parameters: draft.parameters,
            plugin_id: draft.plugin_id,
            class_name: draft.class_name,
            method_name: draft.method_name,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DynamicToolsAddParams {
    pub tool: ExpressionToolDraft,
    #[serde(default)]
    pub mode: AddMode,
}

// ============================================================================
// Tool Definition
// ============================================================================

pub struct DynamicToolsAddTool;

impl DynamicToolsAddTool {
    pub const NAME: &'static str = "dynamic_tools_add";

    pub const DESCRIPTION: &'static str = "Declare an expression tool. mode=add (default) fails if the name is taken; mode=upsert replaces the existing tool.";

    #[instrument(skip_all, fields(tool = %params.tool.name, mode = ?params.mode))]
    pub fn execute(params: DynamicToolsAddParams, services: &ToolContext) -> CallToolResult {
        let tool = ExpressionTool::from(params.tool);
        let stored = match params.mode {
            AddMode::Add => services.expressions.add(tool),
            AddMode::Upsert => services.expressions.upsert(tool),
        };

        match stored {
            Ok(tool) => {
                info!("Stored expression tool '{}'", tool.name);
                success(format!("Stored expression tool '{}'", tool.name), &tool)
            }
            Err(e) => failure(e.kind(), e),
        }
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
            input_schema: schema_for_type::<DynamicToolsAddParams>().into(),
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
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let services = services.clone();
            async move {
                let params: DynamicToolsAddParams = parse_params(args)?;
                Ok(Self::execute(params, &services))
            }
            .boxed()
        })
    }
}

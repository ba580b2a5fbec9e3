//! Runs an expression tool.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use super::super::common::{failure, parse_params, success};
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DynamicToolsExecuteParams {
    /// Name of the expression tool to run.
    pub name: String,

    /// Named values bound as variables, e.g. `{"a": 3, "b": 7}`.
    #[serde(default)]
    pub args: Map<String, Value>,
}

pub struct DynamicToolsExecuteTool;

impl DynamicToolsExecuteTool {
    pub const NAME: &'static str = "dynamic_tools_execute";

    pub const DESCRIPTION: &'static str = "Run an expression tool with named arguments and return the evaluated value.";

    #[instrument(skip_all, fields(tool = %params.name))]
    pub fn execute(params: DynamicToolsExecuteParams, services: &ToolContext) -> CallToolResult {
        match services.executor.execute(&params.name, &params.args) {
            Ok(result) => success(
                format!("{} = {}", params.name, result),
                &json!({ "name": params.name, "result": result }),
            ),
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
            input_schema: schema_for_type::<DynamicToolsExecuteParams>().into(),
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
                let params: DynamicToolsExecuteParams = parse_params(args)?;
                Ok(Self::execute(params, &services))
            }
            .boxed()
        })
    }
}

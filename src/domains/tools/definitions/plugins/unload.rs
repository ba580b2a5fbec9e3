//! Unloads a plugin.

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
pub struct PluginsUnloadParams {
    /// Plugin id as returned by `plugins_upload`.
    pub id: String,

    /// Also delete the stored bundle file.
    #[serde(default)]
    pub delete_bundle: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct UnloadResult {
    id: String,
    /// False when no plugin had this id.
    unloaded: bool,
}

pub struct PluginsUnloadTool;

impl PluginsUnloadTool {
    pub const NAME: &'static str = "plugins_unload";

    pub const DESCRIPTION: &'static str = "Unload a plugin and remove its capabilities. Set delete_bundle=true to also delete the bundle file.";

    #[instrument(skip_all, fields(plugin = %params.id))]
    pub async fn execute(params: PluginsUnloadParams, services: &ToolContext) -> CallToolResult {
        let unloaded = services
            .loader
            .unload(&params.id, params.delete_bundle)
            .await;
        let summary = if unloaded {
            format!("Unloaded plugin '{}'", params.id)
        } else {
            format!("No plugin with id '{}'", params.id)
        };
        success(
            summary,
            &UnloadResult {
                id: params.id,
                unloaded,
            },
        )
    }

    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        services: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let params = super::super::common::parse_http_params(arguments)?;
        super::super::common::to_http_value(&Self::execute(params, services).await)
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<PluginsUnloadParams>().into(),
            annotations: None,
            output_schema: Some(schema_for_type::<UnloadResult>().into()),
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
                let params: PluginsUnloadParams = parse_params(args)?;
                Ok(Self::execute(params, &services).await)
            }
            .boxed()
        })
    }
}

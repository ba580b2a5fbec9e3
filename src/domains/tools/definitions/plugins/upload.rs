//! Uploads and loads a plugin bundle.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::super::common::{failure, parse_params, success};
use crate::core::error::ErrorKind;
use crate::domains::tools::ToolContext;
#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PluginsUploadParams {
    /// Original file name of the bundle, e.g. `greeter.wasm`.
    pub filename: String,

    /// The bundle bytes, base64-encoded.
    pub content_base64: String,
}

pub struct PluginsUploadTool;

impl PluginsUploadTool {
    pub const NAME: &'static str = "plugins_upload";

    pub const DESCRIPTION: &'static str = "Upload a WebAssembly bundle and load it. Returns the new plugin id and how many providers it registered.";

    #[instrument(skip_all, fields(filename = %params.filename))]
    pub async fn execute(params: PluginsUploadParams, services: &ToolContext) -> CallToolResult {
        let bytes = match STANDARD.decode(params.content_base64.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                return failure(
                    ErrorKind::InvalidInput,
                    format!("content_base64 is not valid base64: {e}"),
                );
            }
        };
        info!("Received bundle '{}' ({} bytes)", params.filename, bytes.len());

        match services
            .loader
            .upload_and_load(bytes.as_slice(), &params.filename)
            .await
        {
            Ok(descriptor) => success(
                format!(
                    "Loaded plugin '{}' with {} provider(s)",
                    descriptor.id, descriptor.object_count
                ),
                &descriptor,
            ),
            Err(e) => failure(e.kind(), e),
        }
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
            input_schema: schema_for_type::<PluginsUploadParams>().into(),
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
                let params: PluginsUploadParams = parse_params(args)?;
                Ok(Self::execute(params, &services).await)
            }
            .boxed()
        })
    }
}

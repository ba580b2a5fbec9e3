//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to domain-specific services.
//!
//! ## Tool Architecture
//!
//! Two kinds of tools share the `tools/list` and `tools/call` surface:
//!
//! - Administrative tools, defined in `domains/tools/definitions/` and
//!   routed statically by the ToolRouter built in `domains/tools/router.rs`.
//! - Capabilities offered by registered providers (core and plugins). They
//!   are resolved through the catalog on every request, so plugins can come
//!   and go without restarting the server.
//!
//! An administrative tool wins a name clash; among capabilities the first
//! in catalog order wins.

use std::collections::HashSet;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    model::*,
    service::RequestContext,
};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use super::config::Config;
use super::error::Result;
use crate::domains::catalog::CapabilityDescriptor;
use crate::domains::tools::definitions::common::{failure, success};
use crate::domains::tools::{ToolContext, ToolRegistry, build_tool_router};

#[cfg(feature = "http")]
use crate::domains::tools::ToolError;

/// The main MCP server handler.
///
/// Cloning is cheap: every service is held by `Arc`.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Expression store, registry, loader and catalog.
    services: ToolContext,

    /// Tool router for the administrative tools.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Creates the plugin storage directory and registers the core
    /// providers. Call [`McpServer::startup`] afterwards to load bundles
    /// that are already stored.
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let services = ToolContext::new(config.clone())?;

        Ok(Self {
            tool_router: build_tool_router::<Self>(services.clone()),
            config,
            services,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The services shared by every transport.
    pub fn services(&self) -> &ToolContext {
        &self.services
    }

    /// Load stored bundles if autoload is enabled.
    pub async fn startup(&self) {
        if !self.config.plugins.autoload {
            return;
        }
        let loaded = self.services.loader.load_existing().await;
        info!(
            "Autoloaded {} plugin(s) from '{}'",
            loaded.len(),
            self.config.plugins.storage_dir.display()
        );
    }

    /// Dispose every plugin that is still loaded. Bundles stay on disk.
    pub async fn shutdown(&self) {
        self.services.loader.shutdown().await;
    }

    /// Administrative tools followed by every callable capability.
    pub fn tool_list(&self) -> Vec<Tool> {
        let mut tools = self.tool_router.list_all();
        let mut seen: HashSet<String> = tools.iter().map(|t| t.name.to_string()).collect();

        for descriptor in self.services.catalog.list_direct() {
            if seen.insert(descriptor.name.clone()) {
                tools.push(capability_tool(&descriptor));
            }
        }
        tools
    }

    /// Invoke the capability called `name`, or `None` if no provider
    /// offers it.
    #[instrument(skip(self, arguments))]
    pub async fn invoke_capability(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Option<CallToolResult> {
        let (object, capability) = self.services.catalog.resolve(name)?;
        debug!(
            "Dispatching '{}' to {}.{}",
            name,
            object.declaring_type(),
            capability.operation
        );

        let arguments = arguments.map(Value::Object).unwrap_or(Value::Null);
        let result = match object.invoke(&capability.operation, arguments).await {
            Ok(value) => success(
                value.to_string(),
                &json!({ "capability": name, "result": value }),
            ),
            Err(e) => failure(e.kind(), e),
        };
        Some(result)
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<Value> {
        self.tool_list()
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> std::result::Result<Value, ToolError> {
        if ToolRegistry::contains(name) {
            let registry = ToolRegistry::new(self.services.clone());
            return registry.call_tool(name, arguments).await;
        }

        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            _ => return Err(ToolError::invalid_arguments("arguments must be an object")),
        };
        let result = self
            .invoke_capability(name, arguments)
            .await
            .ok_or_else(|| ToolError::not_found(name))?;
        serde_json::to_value(&result).map_err(|e| ToolError::internal(e.to_string()))
    }
}

/// Tool metadata for a capability. Providers do not describe their
/// arguments, so any object is accepted.
fn capability_tool(descriptor: &CapabilityDescriptor) -> Tool {
    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("additionalProperties".to_string(), json!(true));

    Tool {
        name: descriptor.name.clone().into(),
        description: Some(format!("{} (source: {})", descriptor.description, descriptor.source).into()),
        input_schema: Arc::new(schema),
        annotations: None,
        output_schema: None,
        icons: None,
        meta: None,
        title: None,
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        let tools = self.tool_list();
        info!("Listing {} tools", tools.len());
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if ToolRegistry::contains(&request.name) {
            let call = ToolCallContext::new(self, request, context);
            return self.tool_router.call(call).await;
        }

        let name = request.name.to_string();
        self.invoke_capability(&name, request.arguments)
            .await
            .ok_or_else(|| McpError::invalid_params(format!("Unknown tool: {name}"), None))
    }
}

/// Instructions sent to clients on initialize.
pub const INSTRUCTIONS: &str = "Tools grow at runtime. Declare expression tools with dynamic_tools_add and run them with dynamic_tools_execute or executeDynamic. Upload WebAssembly bundles with plugins_upload; their capabilities appear in tools/list and catalog_list.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::plugins::test_bundles::greeter_bundle;
    use tempfile::TempDir;

    fn server_in(dir: &TempDir) -> McpServer {
        let mut config = Config::default();
        config.plugins.storage_dir = dir.path().to_path_buf();
        McpServer::new(config).unwrap()
    }

    fn names(server: &McpServer) -> Vec<String> {
        server.tool_list().into_iter().map(|t| t.name.to_string()).collect()
    }

    #[test]
    fn test_tool_list_merges_admin_tools_and_capabilities() {
        let dir = TempDir::new().unwrap();
        let server = server_in(&dir);

        let names = names(&server);
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "dynamic_tools_list");
        assert!(names.contains(&"addNumbers".to_string()));
        assert!(names.contains(&"executeDynamic".to_string()));
    }

    #[tokio::test]
    async fn test_plugin_capabilities_appear_and_disappear() {
        let dir = TempDir::new().unwrap();
        let server = server_in(&dir);

        let descriptor = server
            .services()
            .loader
            .upload_and_load(greeter_bundle().as_slice(), "greeter.wasm")
            .await
            .unwrap();
        assert!(names(&server).contains(&"helloWorld".to_string()));

        let result = server.invoke_capability("helloWorld", None).await.unwrap();
        assert_eq!(result.structured_content.unwrap()["result"], "Hello, World!");

        server.services().loader.unload(&descriptor.id, false).await;
        assert!(!names(&server).contains(&"helloWorld".to_string()));
        assert!(server.invoke_capability("helloWorld", None).await.is_none());
    }

    #[tokio::test]
    async fn test_capability_errors_become_error_results() {
        let dir = TempDir::new().unwrap();
        let server = server_in(&dir);

        let mut args = JsonObject::new();
        args.insert("toolName".into(), json!("missing"));
        let result = server
            .invoke_capability("executeDynamic", Some(args))
            .await
            .unwrap();
        assert!(result.is_error.unwrap());
        assert_eq!(result.structured_content.unwrap()["error"], "not_found");
    }

    #[tokio::test]
    async fn test_shutdown_unloads_plugins() {
        let dir = TempDir::new().unwrap();
        let server = server_in(&dir);
        server
            .services()
            .loader
            .upload_and_load(greeter_bundle().as_slice(), "greeter.wasm")
            .await
            .unwrap();

        server.shutdown().await;
        assert!(server.services().loader.list().await.is_empty());
        assert!(server.services().registry.list_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_startup_autoloads_when_enabled() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stored.wasm"), greeter_bundle()).unwrap();

        let mut config = Config::default();
        config.plugins.storage_dir = dir.path().to_path_buf();
        config.plugins.autoload = true;
        let server = McpServer::new(config).unwrap();
        server.startup().await;

        let plugins = server.services().loader.list().await;
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].id, "stored");
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_call_dispatches_both_kinds() {
        let dir = TempDir::new().unwrap();
        let server = server_in(&dir);

        let result = server
            .call_tool("addNumbers", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        assert_eq!(result["structuredContent"]["result"], 3);

        let result = server.call_tool("catalog_list", Value::Null).await.unwrap();
        assert_eq!(result["isError"], false);

        let err = server.call_tool("nope", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::NotFound);
    }
}

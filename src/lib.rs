//! Dynamic MCP Server Library
//!
//! An MCP server whose tool surface grows at runtime. Callers declare small
//! expression tools, upload WebAssembly bundles that contribute capability
//! providers, and browse everything through a merged catalog.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, path security, the server
//!   handler and the transports
//! - **domains**: business logic organized by bounded contexts
//!   - **expressions**: expression tool store, executor and language
//!   - **plugins**: bundle loader, loading units and capability registry
//!   - **catalog**: read-only projection of the registry
//!   - **tools**: administrative MCP tools and core capabilities
//!
//! # Example
//!
//! ```rust,no_run
//! use dynamic_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     server.startup().await;
//!     TransportService::new(config.transport).run(server.clone()).await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};

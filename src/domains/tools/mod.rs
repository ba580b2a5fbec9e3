//! Tools domain module.
//!
//! This module exposes the server's functionality as MCP tools.
//!
//! ## Architecture
//!
//! - `definitions/` - Administrative tool implementations (one file per tool)
//! - `builtin.rs` - Core capabilities registered at startup
//! - `context.rs` - The services every tool works against
//! - `router.rs` - ToolRouter builder for STDIO/TCP transport
//! - `registry.rs` - Tool metadata and HTTP dispatch
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Administrative Tool
//!
//! 1. Create a new file in `definitions/<domain>/`
//! 2. Define params, execute(), and http_handler()
//! 3. Export in the domain's `mod.rs` and in `definitions/mod.rs`
//! 4. Add route in `router.rs` using `with_route()`
//! 5. Register in `registry.rs` for HTTP support

pub mod builtin;
pub mod context;
pub mod definitions;
mod error;
mod registry;
pub mod router;

pub use builtin::BuiltinToolsProvider;
pub use context::ToolContext;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use router::build_tool_router;

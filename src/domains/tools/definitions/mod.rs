//! Tool definitions module.
//!
//! This module exports the administrative tool definitions, one file per
//! tool, grouped by the domain they drive.

pub mod catalog;
pub mod common;
pub mod expressions;
pub mod plugins;

pub use catalog::CatalogListTool;
pub use expressions::{
    AddMode, DynamicToolsAddTool, DynamicToolsExecuteTool, DynamicToolsListTool,
    DynamicToolsRemoveTool, ExpressionToolDraft,
};
pub use plugins::{PluginsListTool, PluginsUnloadTool, PluginsUploadTool};

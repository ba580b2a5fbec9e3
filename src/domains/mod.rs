//! Domains module containing business logic organized by bounded contexts.
//!
//! - **expressions**: user-declared expression tools and their evaluator
//! - **plugins**: WebAssembly bundles, loading units and the capability registry
//! - **catalog**: the merged listing of every registered capability
//! - **tools**: the MCP tool surface over the other domains

pub mod catalog;
pub mod expressions;
pub mod plugins;
pub mod tools;

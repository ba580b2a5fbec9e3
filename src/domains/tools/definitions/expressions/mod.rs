pub mod add;
pub mod execute;
pub mod list;
pub mod remove;

pub use add::{AddMode, DynamicToolsAddTool, ExpressionToolDraft};
pub use execute::DynamicToolsExecuteTool;
pub use list::DynamicToolsListTool;
pub use remove::DynamicToolsRemoveTool;

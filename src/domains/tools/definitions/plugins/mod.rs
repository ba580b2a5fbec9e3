pub mod list;
pub mod unload;
pub mod upload;

pub use list::PluginsListTool;
pub use unload::PluginsUnloadTool;
pub use upload::PluginsUploadTool;

pub mod list;

pub use list::CatalogListTool;

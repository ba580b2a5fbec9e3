//! Catalog domain.
//!
//! The catalog is the merged listing of every capability currently offered
//! by the registry, core and plugins alike. It is derived on demand and
//! never cached.

mod view;

pub use view::{CORE_SOURCE, CapabilityDescriptor, CatalogView};

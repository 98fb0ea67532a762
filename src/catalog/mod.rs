// ABOUTME: Catalog module - server registry, tool descriptors, and the loader
// ABOUTME: that discovers and merges tool catalogs from every registered server.

mod descriptor;
mod loader;
mod registry;

pub use descriptor::{ToolCatalog, ToolDescriptor};
pub use loader::{CatalogLoader, Connections, Discovery, FailurePolicy, ToolNaming, merge_catalog};
pub use registry::{DEFAULT_TIMEOUT, ServerDescriptor, ServerRegistry, ServerTransport};

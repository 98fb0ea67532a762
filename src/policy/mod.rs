// ABOUTME: Policy module - the deny-list safety boundary applied to every
// ABOUTME: catalog before the agent loop can see it.

mod filter;

pub use filter::{DEFAULT_DENYLIST, DenyList, FilteredCatalog, apply};

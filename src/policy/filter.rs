// ABOUTME: Deny-list filtering of tool catalogs.
// ABOUTME: FilteredCatalog can only be produced by apply(), so nothing unfiltered reaches the loop.

use std::collections::BTreeSet;
use std::ops::Deref;

use crate::catalog::{ToolCatalog, ToolDescriptor};

/// Orchestration primitives an agent must never call.
pub const DEFAULT_DENYLIST: &[&str] = &["task", "plan", "subagent"];

/// Set of operation names removed from every catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyList {
    names: BTreeSet<String>,
}

impl DenyList {
    /// A deny-list that removes nothing.
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Parse a comma separated list, ignoring blanks.
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True if the descriptor's exposed or server-side name is denied.
    pub fn denies(&self, descriptor: &ToolDescriptor) -> bool {
        self.contains(&descriptor.name) || self.contains(&descriptor.remote_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for DenyList {
    fn default() -> Self {
        DEFAULT_DENYLIST.iter().copied().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for DenyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A catalog that has passed through [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredCatalog {
    catalog: ToolCatalog,
    denylist: DenyList,
}

impl FilteredCatalog {
    /// The deny-list this catalog was filtered with.
    pub fn denylist(&self) -> &DenyList {
        &self.denylist
    }

    pub fn into_inner(self) -> ToolCatalog {
        self.catalog
    }
}

impl Deref for FilteredCatalog {
    type Target = ToolCatalog;

    fn deref(&self) -> &ToolCatalog {
        &self.catalog
    }
}

/// Return a new catalog without denied descriptors, in the original order.
pub fn apply(catalog: &ToolCatalog, denylist: &DenyList) -> FilteredCatalog {
    let kept: ToolCatalog = catalog
        .iter()
        .filter(|descriptor| {
            let denied = denylist.denies(descriptor);
            if denied {
                tracing::info!(
                    tool = %descriptor.name,
                    server = %descriptor.server,
                    "removing denied tool from catalog"
                );
            }
            !denied
        })
        .cloned()
        .collect();

    FilteredCatalog {
        catalog: kept,
        denylist: denylist.clone(),
    }
}

// ABOUTME: CatalogLoader - fans out to every registered server, lists its tools,
// ABOUTME: and merges them into one catalog under a deterministic collision rule.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;

use super::{ServerDescriptor, ServerRegistry, ToolCatalog, ToolDescriptor};
use crate::error::{DiscoveryError, McpError};
use crate::mcp::{McpClient, McpProxyTool, McpToolInfo};
use crate::policy::FilteredCatalog;
use crate::tool::{Tool, ToolSource, Toolbox};

/// What to do when a server cannot be discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Any failing server fails the whole discovery pass.
    #[default]
    Abort,
    /// Skip failing servers and report them in [`Discovery::degraded`].
    Degrade,
}

/// How exposed tool names are derived from server-side names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolNaming {
    /// Use the server's own name; collisions are qualified.
    #[default]
    Bare,
    /// Always expose `<server>_<name>`.
    Prefixed,
}

/// Live connections opened by one discovery pass, keyed by server name.
#[derive(Clone, Default)]
pub struct Connections {
    clients: Arc<HashMap<String, Arc<McpClient>>>,
}

impl Connections {
    pub fn get(&self, server: &str) -> Option<Arc<McpClient>> {
        self.clients.get(server).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Bind each filtered catalog entry to a proxy for its owning server.
    pub fn materialize_callables(&self, catalog: &FilteredCatalog) -> Result<Toolbox, DiscoveryError> {
        Toolbox::materialize(catalog, self)
    }

    /// Close every connection. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        for (name, client) in self.clients.iter() {
            if let Err(e) = client.shutdown().await {
                tracing::warn!(server = %name, error = %e, "error shutting down server connection");
            }
        }
    }
}

impl ToolSource for Connections {
    fn bind(&self, descriptor: &ToolDescriptor) -> Result<Arc<dyn Tool>, DiscoveryError> {
        let client = self
            .get(&descriptor.server)
            .ok_or_else(|| DiscoveryError::UnknownServer(descriptor.server.clone()))?;
        Ok(Arc::new(McpProxyTool::new(client, descriptor.clone())))
    }
}

/// Result of one discovery pass.
pub struct Discovery {
    pub catalog: ToolCatalog,
    pub connections: Connections,
    /// Servers skipped under [`FailurePolicy::Degrade`].
    pub degraded: Vec<DiscoveryError>,
}

/// Discovers and merges the tool catalogs of a [`ServerRegistry`].
pub struct CatalogLoader {
    registry: ServerRegistry,
    failure_policy: FailurePolicy,
    naming: ToolNaming,
}

impl CatalogLoader {
    pub fn new(registry: ServerRegistry) -> Self {
        Self {
            registry,
            failure_policy: FailurePolicy::default(),
            naming: ToolNaming::default(),
        }
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn naming(mut self, naming: ToolNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    /// Connect to every server concurrently and merge their tool lists.
    ///
    /// Each call opens fresh connections and builds a new catalog.
    pub async fn discover(&self) -> Result<Discovery, DiscoveryError> {
        let attempts = join_all(self.registry.iter().map(discover_server)).await;

        let mut listings = Vec::new();
        let mut clients = HashMap::new();
        let mut failures = Vec::new();

        for attempt in attempts {
            match attempt {
                Ok((client, tools)) => {
                    listings.push((client.name().to_string(), tools));
                    clients.insert(client.name().to_string(), client);
                }
                Err(e) => failures.push(e),
            }
        }

        let connections = Connections {
            clients: Arc::new(clients),
        };

        if self.failure_policy == FailurePolicy::Abort && !failures.is_empty() {
            connections.shutdown().await;
            let first = failures.swap_remove(0);
            tracing::error!(server = %first.server(), error = %first, "discovery aborted");
            return Err(first);
        }

        for failure in &failures {
            tracing::warn!(server = %failure.server(), error = %failure, "server unavailable, continuing degraded");
        }

        let catalog = merge_catalog(listings, self.naming);
        tracing::info!(
            servers = connections.len(),
            degraded = failures.len(),
            tools = catalog.len(),
            "tool discovery complete"
        );

        Ok(Discovery {
            catalog,
            connections,
            degraded: failures,
        })
    }
}

async fn discover_server(
    descriptor: &ServerDescriptor,
) -> Result<(Arc<McpClient>, Vec<McpToolInfo>), DiscoveryError> {
    let unreachable = |source: McpError| DiscoveryError::Unreachable {
        server: descriptor.name.clone(),
        source,
    };

    tracing::debug!(server = %descriptor.name, address = %descriptor.address(), "connecting");
    let mut client = McpClient::connect(descriptor).await.map_err(unreachable)?;

    let listed = async {
        client.initialize().await?;
        client.list_tools().await
    }
    .await;

    let tools = match listed {
        Ok(tools) => tools,
        Err(e) => {
            let _ = client.shutdown().await;
            return Err(match e {
                McpError::Json(e) => DiscoveryError::Malformed {
                    server: descriptor.name.clone(),
                    reason: e.to_string(),
                },
                other => unreachable(other),
            });
        }
    };

    if let Err(e) = check_listing(&descriptor.name, &tools) {
        let _ = client.shutdown().await;
        return Err(e);
    }

    tracing::info!(server = %descriptor.name, tools = tools.len(), "listed tools");
    Ok((Arc::new(client), tools))
}

/// Reject listings a catalog cannot be built from.
pub(super) fn check_listing(server: &str, tools: &[McpToolInfo]) -> Result<(), DiscoveryError> {
    let malformed = |reason: String| DiscoveryError::Malformed {
        server: server.to_string(),
        reason,
    };

    let mut seen = HashSet::new();
    for tool in tools {
        if tool.name.trim().is_empty() {
            return Err(malformed("tool with empty name".into()));
        }
        if !tool.input_schema.is_object() {
            return Err(malformed(format!("input schema of '{}' is not an object", tool.name)));
        }
        if !seen.insert(tool.name.as_str()) {
            return Err(malformed(format!("tool '{}' advertised twice", tool.name)));
        }
    }
    Ok(())
}

/// Merge per-server listings, in the given order, into one catalog.
///
/// The first server to claim a name keeps it. A later server's tool with the
/// same name is exposed as `<server>_<name>`, with `_2`, `_3`, ... appended
/// while that is still taken. No definition replaces another.
pub fn merge_catalog(listings: Vec<(String, Vec<McpToolInfo>)>, naming: ToolNaming) -> ToolCatalog {
    let mut catalog = ToolCatalog::new();
    let mut taken: HashSet<String> = HashSet::new();

    for (server, tools) in listings {
        for info in tools {
            let qualified = format!("{}_{}", server, info.name);
            let preferred = match naming {
                ToolNaming::Bare => info.name.clone(),
                ToolNaming::Prefixed => qualified.clone(),
            };

            let name = if taken.contains(&preferred) {
                let mut candidate = qualified.clone();
                let mut suffix = 2;
                while taken.contains(&candidate) {
                    candidate = format!("{}_{}", qualified, suffix);
                    suffix += 1;
                }
                tracing::warn!(
                    server = %server,
                    tool = %info.name,
                    exposed_as = %candidate,
                    "tool name already taken, qualifying"
                );
                candidate
            } else {
                preferred
            };

            taken.insert(name.clone());
            catalog.push(ToolDescriptor {
                name,
                description: info.description,
                input_schema: info.input_schema,
                server: server.clone(),
                remote_name: info.name,
            });
        }
    }

    catalog
}

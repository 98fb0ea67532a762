// ABOUTME: ServerRegistry - the ordered, immutable set of tool servers to discover.
// ABOUTME: Each ServerDescriptor names a server and how to reach it.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::error::ConfigError;

/// Per-request timeout used when a descriptor does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to reach a tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTransport {
    /// Streamable HTTP endpoint, e.g. `http://127.0.0.1:8000/mcp/math`.
    Http {
        url: String,
        headers: BTreeMap<String, String>,
        timeout: Duration,
    },
    /// Subprocess speaking JSON-RPC over stdin/stdout.
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        timeout: Duration,
    },
}

/// A named tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub name: String,
    pub transport: ServerTransport,
}

impl ServerDescriptor {
    /// An HTTP server with no extra headers and the default timeout.
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: ServerTransport::Http {
                url: url.into(),
                headers: BTreeMap::new(),
                timeout: DEFAULT_TIMEOUT,
            },
        }
    }

    /// A stdio server with no extra environment and the default timeout.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: ServerTransport::Stdio {
                command: command.into(),
                args,
                env: BTreeMap::new(),
                timeout: DEFAULT_TIMEOUT,
            },
        }
    }

    /// Human-readable address for logs.
    pub fn address(&self) -> String {
        match &self.transport {
            ServerTransport::Http { url, .. } => url.clone(),
            ServerTransport::Stdio { command, args, .. } => {
                std::iter::once(command.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        }
    }
}

/// Ordered, immutable collection of server descriptors.
///
/// Registration order decides catalog order and which server keeps a
/// contested tool name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRegistry {
    servers: Vec<ServerDescriptor>,
}

impl ServerRegistry {
    /// Build a registry, rejecting duplicate server names.
    pub fn new(servers: impl IntoIterator<Item = ServerDescriptor>) -> Result<Self, ConfigError> {
        let servers: Vec<_> = servers.into_iter().collect();
        let mut seen = HashSet::new();
        for server in &servers {
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::DuplicateServer(server.name.clone()));
            }
        }
        Ok(Self { servers })
    }

    pub fn get(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.servers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

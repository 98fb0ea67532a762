// ABOUTME: MCP module - Model Context Protocol client implementation.
// ABOUTME: Connects to tool servers over HTTP or stdio and proxies their tools.

mod client;
mod proxy;
mod transport;
mod types;

pub use client::McpClient;
pub use proxy::McpProxyTool;
pub use transport::{HttpTransport, StdioTransport, Transport};
pub use types::*;

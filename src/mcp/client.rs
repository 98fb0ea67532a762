// ABOUTME: MCP client for one tool server - handshake, tool listing, tool calls.
// ABOUTME: Builds the right transport from a ServerDescriptor.

use std::sync::Arc;

use super::transport::{HttpTransport, StdioTransport, Transport};
use super::{
    MCP_PROTOCOL_VERSION, McpClientInfo, McpInitializeParams, McpInitializeResult,
    McpNotification, McpRequest, McpServerCapabilities, McpToolCallParams, McpToolInfo,
    McpToolResult, McpToolsListResult,
};
use crate::catalog::{ServerDescriptor, ServerTransport};
use crate::error::McpError;

/// Upper bound on `tools/list` pages, guarding against a server that
/// keeps returning a cursor.
const MAX_LIST_PAGES: usize = 64;

/// Client for communicating with an MCP server.
pub struct McpClient {
    name: String,
    transport: Arc<dyn Transport>,
    capabilities: McpServerCapabilities,
}

impl McpClient {
    /// Open a transport to the server described by `descriptor`.
    pub async fn connect(descriptor: &ServerDescriptor) -> Result<Self, McpError> {
        let transport: Arc<dyn Transport> = match &descriptor.transport {
            ServerTransport::Http {
                url,
                headers,
                timeout,
            } => Arc::new(HttpTransport::connect(url, headers, *timeout).await?),
            ServerTransport::Stdio {
                command,
                args,
                env,
                timeout,
            } => Arc::new(StdioTransport::connect(command, args, env, *timeout).await?),
        };

        Ok(Self::with_transport(descriptor.name.clone(), transport))
    }

    /// Wrap an already open transport.
    pub fn with_transport(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
            capabilities: McpServerCapabilities::default(),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server capabilities (populated by `initialize`).
    pub fn capabilities(&self) -> &McpServerCapabilities {
        &self.capabilities
    }

    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let request = McpRequest::new(method, params);
        let response = self.transport.send(request).await?;

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .result
            .ok_or_else(|| McpError::Protocol("No result in response".into()))
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<(), McpError> {
        self.transport
            .notify(McpNotification::new(method, params))
            .await
    }

    /// Perform the initialize handshake.
    pub async fn initialize(&mut self) -> Result<McpInitializeResult, McpError> {
        let params = McpInitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({}),
            client_info: McpClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result = self
            .request("initialize", Some(serde_json::to_value(&params)?))
            .await?;
        let init_result: McpInitializeResult = serde_json::from_value(result)?;
        self.capabilities = init_result.capabilities.clone();

        self.notify("notifications/initialized", None).await?;

        tracing::debug!(
            server = %self.name,
            protocol = %init_result.protocol_version,
            "MCP session initialized"
        );

        Ok(init_result)
    }

    /// Shutdown the server connection.
    pub async fn shutdown(&self) -> Result<(), McpError> {
        self.transport.shutdown().await
    }

    /// List every tool the server advertises, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: McpToolsListResult = serde_json::from_value(result)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Err(McpError::Protocol(format!(
            "tools/list did not finish within {} pages",
            MAX_LIST_PAGES
        )))
    }

    /// Call a tool on the server by its server-side name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        let params = McpToolCallParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };

        let result = self
            .request("tools/call", Some(serde_json::to_value(&params)?))
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

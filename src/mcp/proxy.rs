// ABOUTME: McpProxyTool binds a catalog entry to the server that advertised it.
// ABOUTME: Forwards calls over the owning server's transport as tools/call.

use std::sync::Arc;

use async_trait::async_trait;

use super::McpClient;
use crate::catalog::ToolDescriptor;
use crate::tool::{Tool, ToolResult};

/// A tool that proxies calls to an MCP server.
///
/// The exposed name may differ from the server-side name when the catalog
/// prefixed or qualified it; calls always go out under the server-side name.
pub struct McpProxyTool {
    client: Arc<McpClient>,
    descriptor: ToolDescriptor,
}

impl McpProxyTool {
    pub fn new(client: Arc<McpClient>, descriptor: ToolDescriptor) -> Self {
        Self { client, descriptor }
    }
}

#[async_trait]
impl Tool for McpProxyTool {
    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error> {
        let result = self
            .client
            .call_tool(&self.descriptor.remote_name, params)
            .await?;

        let content = result.text();
        if result.is_error {
            Ok(ToolResult::error(content))
        } else {
            Ok(ToolResult::text(content))
        }
    }
}

// ABOUTME: Defines the Tool trait - one invocable operation behind a single interface.
// ABOUTME: Name, description and schema live on the catalog entry the tool is bound to.

use async_trait::async_trait;

use super::ToolResult;

/// An invocable operation the agent can call.
///
/// Identity and input schema come from the
/// [`ToolDescriptor`](crate::catalog::ToolDescriptor) it was bound from.
///
/// Returning `Err` means the call could not be carried out (transport
/// failure, server crash). A tool that ran but reported a failure returns
/// `Ok(ToolResult::error(..))`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with the given arguments.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolResult, anyhow::Error>;
}

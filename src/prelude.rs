// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use deepmux::prelude::*;` to get started quickly.

pub use crate::agent::{AgentRun, AgentRuntime, RunControl, RunOutcome, RuntimeConfig};
pub use crate::builder::{Agent, build_agent, build_from_config};
pub use crate::catalog::{
    CatalogLoader, Connections, Discovery, FailurePolicy, ServerDescriptor, ServerRegistry,
    ServerTransport, ToolCatalog, ToolDescriptor, ToolNaming,
};
pub use crate::config::AgentConfig;
pub use crate::error::{
    ConfigError, DeepMuxError, DiscoveryError, LlmError, McpError, RunError, ToolError,
};
pub use crate::llm::{AssistantTurn, InferenceRequest, LlmClient, Message, OllamaClient, ToolCall};
pub use crate::mcp::{McpClient, McpProxyTool};
pub use crate::policy::{DenyList, FilteredCatalog};
pub use crate::prompt::{DEFAULT_SYSTEM_PROMPT, UNIVERSAL_SYSTEM_PROMPT};
pub use crate::tool::{Tool, ToolResult, ToolSource, Toolbox};
pub use crate::trace::{DisplayEvent, render};

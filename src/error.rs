// ABOUTME: Defines all error types for deepmux using thiserror.
// ABOUTME: Each concern has its own error enum, unified under DeepMuxError.

/// Top-level error type for the deepmux library.
#[derive(Debug, thiserror::Error)]
pub enum DeepMuxError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from language model calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors from a single tool dispatch.
///
/// None of these end a run: the runtime records them as error tool results
/// so the model can recover or explain the failure.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' is not available")]
    NotFound(String),

    #[error("Tool '{0}' is denied by policy")]
    Denied(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    Validation { tool: String, reason: String },

    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    /// True when the model asked for a name outside the filtered catalog.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Denied(_))
    }
}

/// Errors from MCP transport and protocol handling.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from discovering and binding server tool catalogs.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Server '{server}' is unreachable: {source}")]
    Unreachable {
        server: String,
        #[source]
        source: McpError,
    },

    #[error("Server '{server}' returned a malformed tool list: {reason}")]
    Malformed { server: String, reason: String },

    #[error("No connection for server '{0}'")]
    UnknownServer(String),
}

impl DiscoveryError {
    /// Name of the server this error is about.
    pub fn server(&self) -> &str {
        match self {
            Self::Unreachable { server, .. } | Self::Malformed { server, .. } => server,
            Self::UnknownServer(server) => server,
        }
    }
}

/// Terminal failures of an agent run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Agent exceeded max iterations ({max_iterations})")]
    Exhausted { max_iterations: usize },

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Run deadline exceeded")]
    DeadlineExceeded,
}

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Server '{0}' is registered more than once")]
    DuplicateServer(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

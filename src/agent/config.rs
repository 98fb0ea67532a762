// ABOUTME: RuntimeConfig - per-runtime settings for the agent loop.
// ABOUTME: Instructions, model, deny-list, and iteration limits are plain values here.

use crate::policy::DenyList;
use crate::prompt::DEFAULT_SYSTEM_PROMPT;

/// Default cap on reasoning steps per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Configuration for an [`AgentRuntime`](super::AgentRuntime).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Instruction preamble sent with every model call.
    pub instructions: String,

    /// Model name. Empty means the client's default model.
    pub model: String,

    /// Names removed from the catalog before the loop sees it.
    pub denylist: DenyList,

    /// Maximum number of reasoning steps in one run.
    pub max_iterations: usize,

    /// Issue the tool calls of one step concurrently.
    pub parallel_tool_calls: bool,

    pub temperature: Option<f64>,

    pub max_tokens: Option<u32>,
}

impl RuntimeConfig {
    /// Create a config with the given instructions and defaults elsewhere.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            model: String::new(),
            denylist: DenyList::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel_tool_calls: false,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn denylist(mut self, denylist: DenyList) -> Self {
        self.denylist = denylist;
        self
    }

    /// Set maximum iterations.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_builder() {
        let config = RuntimeConfig::new("Use tools.")
            .model("llama3.1:8b")
            .denylist(DenyList::parse("plan,drop_table"))
            .max_iterations(4)
            .parallel_tool_calls(true)
            .temperature(0.2)
            .max_tokens(512);

        assert_eq!(config.instructions, "Use tools.");
        assert_eq!(config.model, "llama3.1:8b");
        assert!(config.denylist.contains("drop_table"));
        assert!(!config.denylist.contains("task"));
        assert_eq!(config.max_iterations, 4);
        assert!(config.parallel_tool_calls);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(512));
    }

    #[test]
    fn test_runtime_config_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.instructions, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.denylist, DenyList::default());
        assert!(!config.parallel_tool_calls);
        assert!(config.model.is_empty());
    }
}

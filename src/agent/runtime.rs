// ABOUTME: AgentRuntime - binds a model client to a policy-filtered toolbox.
// ABOUTME: Starts runs; every run sees only the tools that survived the deny-list.

use std::sync::Arc;

use super::{AgentRun, RunControl, RunOutcome, RuntimeConfig};
use crate::catalog::ToolCatalog;
use crate::error::{DiscoveryError, RunError};
use crate::llm::{LlmClient, ToolDefinition};
use crate::policy;
use crate::tool::{ToolSource, Toolbox};

/// Drives queries through the think-act loop.
pub struct AgentRuntime {
    client: Arc<dyn LlmClient>,
    config: Arc<RuntimeConfig>,
    toolbox: Arc<Toolbox>,
    definitions: Arc<[ToolDefinition]>,
}

impl AgentRuntime {
    /// Filter `catalog` with the configured deny-list, then bind the
    /// survivors through `source`.
    pub fn new(
        client: Arc<dyn LlmClient>,
        config: RuntimeConfig,
        catalog: &ToolCatalog,
        source: &dyn ToolSource,
    ) -> Result<Self, DiscoveryError> {
        let filtered = policy::apply(catalog, &config.denylist);
        let toolbox = Toolbox::materialize(&filtered, source)?;
        Ok(Self::from_toolbox(client, config, toolbox))
    }

    /// Use a toolbox that was already materialized from a filtered catalog.
    pub fn from_toolbox(client: Arc<dyn LlmClient>, config: RuntimeConfig, toolbox: Toolbox) -> Self {
        let definitions: Arc<[ToolDefinition]> = toolbox.to_definitions().into();
        tracing::debug!(tools = definitions.len(), "agent runtime ready");
        Self {
            client,
            config: Arc::new(config),
            toolbox: Arc::new(toolbox),
            definitions,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Tool definitions the model is offered, in catalog order.
    pub fn catalog(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Create a run for `query` without executing it.
    pub fn start(&self, query: impl Into<String>) -> AgentRun {
        AgentRun::new(
            query.into(),
            self.client.clone(),
            self.config.clone(),
            self.toolbox.clone(),
            self.definitions.clone(),
        )
    }

    /// Start and execute a run with no cancellation or deadline.
    ///
    /// The run is returned either way so its transcript can be rendered.
    pub async fn run(&self, query: impl Into<String>) -> (AgentRun, Result<RunOutcome, RunError>) {
        let mut run = self.start(query);
        let outcome = run.execute(&RunControl::default()).await;
        (run, outcome)
    }
}

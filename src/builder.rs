// ABOUTME: One-call wiring of the pipeline: discover every server, filter the
// ABOUTME: catalog, bind the survivors to live connections, build the runtime.

use std::sync::Arc;

use crate::agent::{AgentRuntime, RuntimeConfig};
use crate::catalog::{CatalogLoader, Connections, ToolCatalog};
use crate::config::AgentConfig;
use crate::error::{DeepMuxError, DiscoveryError};
use crate::llm::LlmClient;

/// A ready agent and the discovery it was built from.
pub struct Agent {
    pub runtime: AgentRuntime,
    /// The unfiltered catalog, as discovered.
    pub catalog: ToolCatalog,
    pub connections: Connections,
    /// Servers skipped during a degraded discovery.
    pub degraded: Vec<DiscoveryError>,
}

impl Agent {
    /// Close every server connection.
    pub async fn shutdown(&self) {
        self.connections.shutdown().await;
    }
}

/// Discover tools with `loader` and build a runtime over them.
///
/// The deny-list in `config` is applied before anything is bound.
pub async fn build_agent(
    loader: &CatalogLoader,
    client: Arc<dyn LlmClient>,
    config: RuntimeConfig,
) -> Result<Agent, DeepMuxError> {
    let discovery = loader.discover().await?;

    let runtime = match AgentRuntime::new(client, config, &discovery.catalog, &discovery.connections) {
        Ok(runtime) => runtime,
        Err(e) => {
            discovery.connections.shutdown().await;
            return Err(e.into());
        }
    };

    tracing::info!(
        discovered = discovery.catalog.len(),
        exposed = runtime.catalog().len(),
        "agent ready"
    );

    Ok(Agent {
        runtime,
        catalog: discovery.catalog,
        connections: discovery.connections,
        degraded: discovery.degraded,
    })
}

/// Build an agent from a loaded configuration, talking to its Ollama endpoint.
pub async fn build_from_config(config: &AgentConfig) -> Result<Agent, DeepMuxError> {
    let client: Arc<dyn LlmClient> = Arc::new(config.llm_client());
    build_agent(&config.loader(), client, config.runtime.clone()).await
}

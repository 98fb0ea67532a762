// ABOUTME: Configuration loading - a JSON file with an mcpServers object plus
// ABOUTME: agent settings, with environment overrides applied on top.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};

use crate::agent::RuntimeConfig;
use crate::catalog::{
    CatalogLoader, DEFAULT_TIMEOUT, FailurePolicy, ServerDescriptor, ServerRegistry,
    ServerTransport, ToolNaming,
};
use crate::error::ConfigError;
use crate::llm::{OLLAMA_BASE_URL, OLLAMA_DEFAULT_MODEL, OllamaClient};
use crate::policy::DenyList;
use crate::prompt;

/// File name looked up in the working directory, then as a dotfile in home.
pub const CONFIG_FILE_NAME: &str = "deepmux.json";

pub const ENV_DENYLIST: &str = "DEEPMUX_DENYLIST";
pub const ENV_OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
pub const ENV_MODEL: &str = "DEEPMUX_MODEL";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default, deserialize_with = "server_entries")]
    mcp_servers: Vec<(String, serde_json::Value)>,
    #[serde(default)]
    denylist: Option<DenyListEntry>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    max_iterations: Option<usize>,
    #[serde(default)]
    parallel_tool_calls: Option<bool>,
    #[serde(default)]
    discovery: Option<FailurePolicy>,
    #[serde(default)]
    tool_naming: Option<ToolNaming>,
    #[serde(default)]
    model: Option<ModelEntry>,
}

/// Keeps every `mcpServers` entry in file order, repeated keys included,
/// so the registry can reject duplicates instead of the parser merging them.
fn server_entries<'de, D>(deserializer: D) -> Result<Vec<(String, serde_json::Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, serde_json::Value)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an object of server entries")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or_default());
            while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DenyListEntry {
    List(Vec<String>),
    Csv(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    #[serde(rename_all = "camelCase")]
    Http {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    base_url: Option<String>,
    name: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

/// Where and which language model to talk to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub base_url: String,
    pub name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_BASE_URL.to_string(),
            name: OLLAMA_DEFAULT_MODEL.to_string(),
        }
    }
}

/// Everything needed to wire servers, discovery and the runtime.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub registry: ServerRegistry,
    pub runtime: RuntimeConfig,
    pub failure_policy: FailurePolicy,
    pub naming: ToolNaming,
    pub model: ModelConfig,
    /// File the config was read from, if any.
    pub source: Option<PathBuf>,
}

impl AgentConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json)?;

        let mut servers = Vec::with_capacity(file.mcp_servers.len());
        for (name, value) in file.mcp_servers {
            servers.push(server_descriptor(name, value)?);
        }
        let registry = ServerRegistry::new(servers)?;

        let instructions = match (file.instructions, file.prompt) {
            (Some(instructions), _) => instructions,
            (None, Some(name)) => prompt::named(&name)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown prompt '{}'", name)))?
                .to_string(),
            (None, None) => prompt::DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        let model_entry = file.model.unwrap_or_default();
        let model = ModelConfig {
            base_url: model_entry.base_url.unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            name: model_entry.name.unwrap_or_else(|| OLLAMA_DEFAULT_MODEL.to_string()),
        };

        let mut runtime = RuntimeConfig::new(instructions).model(model.name.clone());
        runtime.temperature = model_entry.temperature;
        runtime.max_tokens = model_entry.max_tokens;
        if let Some(denylist) = file.denylist {
            runtime.denylist = match denylist {
                DenyListEntry::List(names) => names.into_iter().collect(),
                DenyListEntry::Csv(list) => DenyList::parse(&list),
            };
        }
        if let Some(max) = file.max_iterations {
            if max == 0 {
                return Err(ConfigError::Invalid("maxIterations must be at least 1".into()));
            }
            runtime.max_iterations = max;
        }
        if let Some(parallel) = file.parallel_tool_calls {
            runtime.parallel_tool_calls = parallel;
        }

        Ok(Self {
            registry,
            runtime,
            failure_policy: file.discovery.unwrap_or_default(),
            naming: file.tool_naming.unwrap_or_default(),
            model,
            source: None,
        })
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_json(&content)?;
        config.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), servers = config.registry.len(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, otherwise the first config file found,
    /// otherwise the built-in example setup.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match find_config() {
            Some(path) => Self::load(&path),
            None => {
                tracing::info!("no config file found, using built-in servers");
                Ok(Self::builtin())
            }
        }
    }

    /// The example setup: a math server on :8000 and an SQL server on :8001,
    /// llama3.1:8b on a local Ollama, and the universal instructions.
    pub fn builtin() -> Self {
        let servers = [
            ServerDescriptor::http("math", "http://127.0.0.1:8000/mcp/math"),
            ServerDescriptor::http("sql", "http://127.0.0.1:8001/mcp/sql"),
        ];
        let model = ModelConfig::default();

        Self {
            registry: ServerRegistry::new(servers).unwrap_or_default(),
            runtime: RuntimeConfig::new(prompt::UNIVERSAL_SYSTEM_PROMPT)
                .model(model.name.clone())
                .temperature(0.2),
            failure_policy: FailurePolicy::Abort,
            naming: ToolNaming::Prefixed,
            model,
            source: None,
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(list) = set(ENV_DENYLIST) {
            self.runtime.denylist = DenyList::parse(&list);
        }
        if let Some(base_url) = set(ENV_OLLAMA_BASE_URL) {
            self.model.base_url = base_url;
        }
        if let Some(model) = set(ENV_MODEL) {
            self.runtime.model = model.clone();
            self.model.name = model;
        }
        self
    }

    /// A loader over the configured servers with the configured policies.
    pub fn loader(&self) -> CatalogLoader {
        CatalogLoader::new(self.registry.clone())
            .failure_policy(self.failure_policy)
            .naming(self.naming)
    }

    /// Model client for the configured endpoint.
    pub fn llm_client(&self) -> OllamaClient {
        OllamaClient::with_base_url(&self.model.base_url, &self.model.name)
    }
}

fn server_descriptor(name: String, value: serde_json::Value) -> Result<ServerDescriptor, ConfigError> {
    let entry: ServerEntry = serde_json::from_value(value).map_err(|_| {
        ConfigError::Invalid(format!("server '{}' needs either a 'url' or a 'command'", name))
    })?;
    let timeout = |secs: Option<u64>| secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);

    let transport = match entry {
        ServerEntry::Http {
            url,
            headers,
            timeout_secs,
        } => ServerTransport::Http {
            url,
            headers,
            timeout: timeout(timeout_secs),
        },
        ServerEntry::Stdio {
            command,
            args,
            env,
            timeout_secs,
        } => ServerTransport::Stdio {
            command,
            args,
            env,
            timeout: timeout(timeout_secs),
        },
    };

    Ok(ServerDescriptor { name, transport })
}

fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(home) = dirs::home_dir() {
        let global = home.join(format!(".{}", CONFIG_FILE_NAME));
        if global.exists() {
            return Some(global);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const EXAMPLE: &str = r#"{
        "mcpServers": {
            "sql": {"url": "http://127.0.0.1:8001/mcp/sql", "headers": {"Authorization": "Bearer x"}},
            "math": {"url": "http://127.0.0.1:8000/mcp/math", "timeoutSecs": 5},
            "files": {"command": "npx", "args": ["-y", "server-filesystem", "/tmp"], "env": {"DEBUG": "1"}}
        },
        "denylist": ["task", "plan", "subagent", "sql_execute"],
        "prompt": "universal",
        "maxIterations": 6,
        "parallelToolCalls": true,
        "discovery": "degrade",
        "toolNaming": "prefixed",
        "model": {"baseUrl": "http://gpu:11434", "name": "qwen2.5:7b", "temperature": 0.2, "maxTokens": 800}
    }"#;

    #[test]
    fn test_parse_full_config_keeps_server_order() {
        let config = AgentConfig::from_json(EXAMPLE).unwrap();

        assert_eq!(config.registry.names(), vec!["sql", "math", "files"]);
        match &config.registry.get("math").unwrap().transport {
            ServerTransport::Http { timeout, .. } => assert_eq!(*timeout, Duration::from_secs(5)),
            other => panic!("Expected Http, got {:?}", other),
        }
        match &config.registry.get("files").unwrap().transport {
            ServerTransport::Stdio { command, args, env, timeout } => {
                assert_eq!(command, "npx");
                assert_eq!(args.len(), 3);
                assert_eq!(env.get("DEBUG").map(String::as_str), Some("1"));
                assert_eq!(*timeout, DEFAULT_TIMEOUT);
            }
            other => panic!("Expected Stdio, got {:?}", other),
        }

        assert!(config.runtime.denylist.contains("sql_execute"));
        assert_eq!(config.runtime.instructions, prompt::UNIVERSAL_SYSTEM_PROMPT);
        assert_eq!(config.runtime.max_iterations, 6);
        assert!(config.runtime.parallel_tool_calls);
        assert_eq!(config.runtime.model, "qwen2.5:7b");
        assert_eq!(config.runtime.temperature, Some(0.2));
        assert_eq!(config.runtime.max_tokens, Some(800));
        assert_eq!(config.failure_policy, FailurePolicy::Degrade);
        assert_eq!(config.naming, ToolNaming::Prefixed);
        assert_eq!(config.model.base_url, "http://gpu:11434");
    }

    #[test]
    fn test_defaults_for_minimal_config() {
        let config = AgentConfig::from_json(r#"{"mcpServers": {"math": {"url": "http://localhost:8000/mcp"}}}"#)
            .unwrap();

        assert_eq!(config.registry.len(), 1);
        assert_eq!(config.runtime.denylist, DenyList::default());
        assert_eq!(config.runtime.instructions, prompt::DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.runtime.max_iterations, crate::agent::DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.naming, ToolNaming::Bare);
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_explicit_instructions_win_over_prompt() {
        let config =
            AgentConfig::from_json(r#"{"instructions": "Only use math.", "prompt": "universal"}"#).unwrap();
        assert_eq!(config.runtime.instructions, "Only use math.");
    }

    #[test]
    fn test_denylist_as_comma_string() {
        let config = AgentConfig::from_json(r#"{"denylist": "plan, drop_table"}"#).unwrap();
        assert!(config.runtime.denylist.contains("drop_table"));
        assert!(!config.runtime.denylist.contains("task"));
    }

    #[test]
    fn test_invalid_configs() {
        let cases = [
            r#"{"mcpServers": {"broken": {"args": []}}}"#,
            r#"{"prompt": "pirate"}"#,
            r#"{"maxIterations": 0}"#,
        ];
        for json in cases {
            let err = AgentConfig::from_json(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{}: {:?}", json, err);
        }

        assert!(matches!(
            AgentConfig::from_json("{not json").unwrap_err(),
            ConfigError::Parse(_)
        ));
        assert!(matches!(
            AgentConfig::from_json(r#"{"discovery": "sometimes"}"#).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DENYLIST, "task,sql_execute"),
            (ENV_OLLAMA_BASE_URL, "http://other:11434"),
            (ENV_MODEL, "mistral"),
        ]);
        let config = AgentConfig::builtin().with_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.runtime.denylist.contains("sql_execute"));
        assert!(!config.runtime.denylist.contains("plan"));
        assert_eq!(config.model.base_url, "http://other:11434");
        assert_eq!(config.model.name, "mistral");
        assert_eq!(config.runtime.model, "mistral");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = AgentConfig::builtin().with_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.runtime.denylist, DenyList::default());
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_builtin_matches_example_servers() {
        let config = AgentConfig::builtin();
        assert_eq!(config.registry.names(), vec!["math", "sql"]);
        assert_eq!(
            config.registry.get("sql").unwrap().address(),
            "http://127.0.0.1:8001/mcp/sql"
        );
        assert_eq!(config.naming, ToolNaming::Prefixed);
        assert_eq!(config.runtime.temperature, Some(0.2));
        assert_eq!(config.llm_client().default_model(), OLLAMA_DEFAULT_MODEL);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let config = AgentConfig::locate(Some(file.path())).unwrap();

        assert_eq!(config.source.as_deref(), Some(file.path()));
        assert_eq!(config.loader().registry().names(), vec!["sql", "math", "files"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AgentConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_duplicate_server_key_rejected() {
        let err = AgentConfig::from_json(
            r#"{
                "mcpServers": {
                    "math": {"url": "http://127.0.0.1:8000/mcp/math"},
                    "math": {"url": "http://127.0.0.1:9999/mcp/other"}
                }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateServer(name) if name == "math"));
    }

    #[test]
    fn test_null_servers_rejected() {
        let err = AgentConfig::from_json(r#"{"mcpServers": null}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

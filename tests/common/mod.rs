// ABOUTME: Shared fixtures for integration tests - a wiremock-backed MCP server
// ABOUTME: speaking streamable HTTP, and a scripted model client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use deepmux::error::LlmError;
use deepmux::llm::{AssistantTurn, InferenceRequest, LlmClient, ToolCall};

pub const SESSION_ID: &str = "session-7f3a";

fn rpc_result(request: &Request, result: Value) -> ResponseTemplate {
    let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": body["id"],
        "result": result,
    }))
}

/// An MCP server at `/mcp/<name>` backed by wiremock.
pub struct MockMcpServer {
    pub server: MockServer,
    pub name: String,
}

impl MockMcpServer {
    /// Start a server that completes the handshake and lists `tools`.
    pub async fn start(name: &str, tools: Vec<Value>) -> Self {
        let mock = Self::start_bare(name).await;
        mock.list_tools(tools).await;
        mock
    }

    /// Start a server that only completes the handshake.
    pub async fn start_bare(name: &str) -> Self {
        let server = MockServer::start().await;
        let endpoint = format!("/mcp/{}", name);
        let server_name = name.to_string();

        Mock::given(method("POST"))
            .and(path(endpoint.as_str()))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(move |req: &Request| {
                rpc_result(
                    req,
                    json!({
                        "protocolVersion": "2025-03-26",
                        "capabilities": {"tools": {"listChanged": false}},
                        "serverInfo": {"name": server_name, "version": "1.0.0"}
                    }),
                )
                .insert_header("Mcp-Session-Id", SESSION_ID)
            })
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(endpoint.as_str()))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        Self {
            server,
            name: name.to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/mcp/{}", self.server.uri(), self.name)
    }

    fn endpoint(&self) -> String {
        format!("/mcp/{}", self.name)
    }

    /// Answer `tools/list` with `tools`. Requires the session id from initialize.
    pub async fn list_tools(&self, tools: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path(self.endpoint().as_str()))
            .and(header("Mcp-Session-Id", SESSION_ID))
            .and(body_partial_json(json!({"method": "tools/list"})))
            .respond_with(move |req: &Request| rpc_result(req, json!({"tools": tools})))
            .mount(&self.server)
            .await;
    }

    /// Answer `tools/call` for `tool` with the given text, computed from the arguments.
    pub async fn on_call<F>(&self, tool: &str, handler: F)
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Mock::given(method("POST"))
            .and(path(self.endpoint().as_str()))
            .and(body_partial_json(json!({"method": "tools/call", "params": {"name": tool}})))
            .respond_with(move |req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap_or(Value::Null);
                let text = handler(&body["params"]["arguments"]);
                rpc_result(
                    req,
                    json!({"content": [{"type": "text", "text": text}], "isError": false}),
                )
            })
            .mount(&self.server)
            .await;
    }

    /// Answer `tools/call` for `tool` with a tool-level error.
    pub async fn on_call_error(&self, tool: &str, message: &str) {
        let message = message.to_string();
        Mock::given(method("POST"))
            .and(path(self.endpoint().as_str()))
            .and(body_partial_json(json!({"method": "tools/call", "params": {"name": tool}})))
            .respond_with(move |req: &Request| {
                rpc_result(
                    req,
                    json!({"content": [{"type": "text", "text": message}], "isError": true}),
                )
            })
            .mount(&self.server)
            .await;
    }

    /// Fail the test on drop if `tool` is ever called.
    pub async fn forbid_call(&self, tool: &str) {
        Mock::given(method("POST"))
            .and(path(self.endpoint().as_str()))
            .and(body_partial_json(json!({"method": "tools/call", "params": {"name": tool}})))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// `(tool, arguments)` of every `tools/call` received, in arrival order.
    pub async fn received_calls(&self) -> Vec<(String, Value)> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|req| serde_json::from_slice::<Value>(&req.body).ok())
            .filter(|body| body["method"] == "tools/call")
            .map(|body| {
                (
                    body["params"]["name"].as_str().unwrap_or_default().to_string(),
                    body["params"]["arguments"].clone(),
                )
            })
            .collect()
    }

    /// JSON-RPC methods received, in arrival order.
    pub async fn received_methods(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|req| serde_json::from_slice::<Value>(&req.body).ok())
            .filter_map(|body| body["method"].as_str().map(str::to_string))
            .collect()
    }
}

pub fn tool(name: &str, description: &str, schema: Value) -> Value {
    json!({"name": name, "description": description, "inputSchema": schema})
}

pub fn int_pair_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
        "required": ["a", "b"]
    })
}

/// `add` and `multiply` over integers `a` and `b`.
pub fn math_tools() -> Vec<Value> {
    vec![
        tool("add", "Add two integers together.", int_pair_schema()),
        tool("multiply", "Multiply two integers.", int_pair_schema()),
    ]
}

/// The SQL server's tools plus a `task` orchestration tool that must be denied.
pub fn sql_tools() -> Vec<Value> {
    vec![
        tool("list_schemas", "List database schemas.", json!({"type": "object", "properties": {}})),
        tool(
            "list_tables",
            "List tables in a schema.",
            json!({
                "type": "object",
                "properties": {"db_schema": {"type": "string"}},
                "required": ["db_schema"]
            }),
        ),
        tool(
            "table_preview",
            "Preview the first rows of a table.",
            json!({
                "type": "object",
                "properties": {
                    "db_schema": {"type": "string"},
                    "table": {"type": "string"},
                    "top": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["db_schema", "table"]
            }),
        ),
        tool(
            "task",
            "Delegate work to a subagent.",
            json!({"type": "object", "properties": {"description": {"type": "string"}}}),
        ),
    ]
}

pub fn int_arg(args: &Value, key: &str) -> i64 {
    args[key].as_i64().unwrap_or_default()
}

/// Model client that replays canned turns and records the tool names offered.
#[derive(Default)]
pub struct ScriptedLlm {
    turns: Mutex<VecDeque<AssistantTurn>>,
    pub offered: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLlm {
    pub fn new(turns: Vec<AssistantTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            offered: Mutex::new(Vec::new()),
        }
    }

    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn infer(&self, request: &InferenceRequest<'_>) -> Result<AssistantTurn, LlmError> {
        self.offered
            .lock()
            .unwrap()
            .push(request.tools.iter().map(|t| t.name.clone()).collect());
        Ok(self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| AssistantTurn::answer("done")))
    }
}

pub fn calls(calls: &[(&str, Value)]) -> AssistantTurn {
    AssistantTurn::calls(
        calls
            .iter()
            .map(|(name, args)| ToolCall::new(*name, args.clone()))
            .collect(),
    )
}

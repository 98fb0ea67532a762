// ABOUTME: Ollama client using the native /api/chat endpoint with tool calling.
// ABOUTME: Converts transcripts to Ollama's chat format and replies back to AssistantTurn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AssistantTurn, InferenceRequest, LlmClient, Message, ToolCall, ToolDefinition, Usage};
use crate::error::LlmError;

/// Default base URL of a local Ollama server.
pub const OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default model when none is specified.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1:8b";

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl OllamaMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// Client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
    default_model: String,
}

impl OllamaClient {
    /// Create a client for localhost:11434.
    pub fn new(model: &str) -> Self {
        Self::with_base_url(OLLAMA_BASE_URL, model)
    }

    /// Create a client for a custom base URL, e.g. `http://gpu-box:11434`.
    pub fn with_base_url(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            default_model: if model.is_empty() {
                OLLAMA_DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn build_request(&self, req: &InferenceRequest<'_>) -> OllamaChatRequest {
        let model = if req.model.is_empty() {
            self.default_model.clone()
        } else {
            req.model.to_string()
        };

        let options = (req.temperature.is_some() || req.max_tokens.is_some()).then(|| OllamaOptions {
            temperature: req.temperature,
            num_predict: req.max_tokens,
        });

        OllamaChatRequest {
            model,
            messages: convert_messages(req.instructions, req.transcript),
            tools: convert_tools(req.tools),
            options,
            stream: false,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(OLLAMA_DEFAULT_MODEL)
    }
}

/// Prepend the instructions as a system message and map each transcript entry.
fn convert_messages(instructions: &str, transcript: &[Message]) -> Vec<OllamaMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);

    if !instructions.is_empty() {
        messages.push(OllamaMessage::new("system", instructions));
    }

    for message in transcript {
        messages.push(match message {
            Message::User { content } => OllamaMessage::new("user", content.clone()),
            Message::Assistant {
                content,
                tool_calls,
            } => OllamaMessage {
                tool_calls: tool_calls
                    .iter()
                    .map(|call| OllamaToolCall {
                        function: OllamaFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
                ..OllamaMessage::new("assistant", content.clone().unwrap_or_default())
            },
            Message::ToolResult {
                tool_name, content, ..
            } => OllamaMessage {
                tool_name: Some(tool_name.clone()),
                ..OllamaMessage::new("tool", content.clone())
            },
        });
    }

    messages
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<OllamaTool> {
    tools
        .iter()
        .map(|t| OllamaTool {
            tool_type: "function".to_string(),
            function: OllamaFunction {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

fn parse_response(resp: OllamaChatResponse) -> AssistantTurn {
    let tool_calls = resp
        .message
        .tool_calls
        .into_iter()
        .map(|tc| {
            // Some models emit arguments as a JSON-encoded string.
            let arguments = match tc.function.arguments {
                serde_json::Value::String(raw) => {
                    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
                }
                other => other,
            };
            ToolCall::new(tc.function.name, arguments)
        })
        .collect();

    let content = resp.message.content;
    AssistantTurn {
        content: (!content.is_empty()).then_some(content),
        tool_calls,
        usage: Usage {
            input_tokens: resp.prompt_eval_count.unwrap_or(0),
            output_tokens: resp.eval_count.unwrap_or(0),
        },
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn infer(&self, req: &InferenceRequest<'_>) -> Result<AssistantTurn, LlmError> {
        let body = self.build_request(req);
        let url = format!("{}/api/chat", self.base_url);

        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaChatResponse = response.json().await?;
        Ok(parse_response(parsed))
    }
}

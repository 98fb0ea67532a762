// ABOUTME: Streamable HTTP transport for MCP communication.
// ABOUTME: POSTs JSON-RPC and accepts either a JSON body or an SSE-framed reply.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::Mutex;

use super::Transport;
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// HTTP transport - one POST per JSON-RPC message.
///
/// Streamable HTTP servers may answer a request either with
/// `application/json` or with a short `text/event-stream` carrying the
/// response as a `data:` event. Both are accepted.
pub struct HttpTransport {
    endpoint_url: String,
    http_client: reqwest::Client,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    /// Build a transport for `url`. No network traffic happens until the
    /// first request.
    pub async fn connect(
        url: &str,
        headers: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        reqwest::Url::parse(url).map_err(|e| McpError::Connection(format!("Invalid URL: {}", e)))?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| McpError::Connection(format!("Invalid header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::Connection(format!("Invalid header value: {}", e)))?;
            default_headers.insert(name, value);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("deepmux/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()
            .map_err(|e| McpError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint_url: url.to_string(),
            http_client,
            session_id: Mutex::new(None),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn post(&self, body: String) -> Result<reqwest::Response, McpError> {
        let mut req_builder = self
            .http_client
            .post(&self.endpoint_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");

        if let Some(session_id) = self.session_id.lock().await.as_ref() {
            req_builder = req_builder.header(SESSION_HEADER, session_id.clone());
        }

        let response = req_builder
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::Connection(format!("HTTP request failed: {}", e)))?;

        // The server assigns a session on initialize and expects it echoed back.
        if let Some(session_id) = response.headers().get(SESSION_HEADER) {
            if let Ok(id) = session_id.to_str() {
                *self.session_id.lock().await = Some(id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol(format!(
                "HTTP {} - {}",
                status.as_u16(),
                body
            )));
        }

        Ok(response)
    }
}

/// Pull the response for `request_id` out of an SSE-framed body.
pub(crate) fn parse_event_stream(body: &str, request_id: u64) -> Result<McpResponse, McpError> {
    let mut event_data = String::new();

    // A trailing empty line flushes the last event even if the server omitted it.
    for line in body.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !event_data.is_empty() {
                if let Ok(response) = serde_json::from_str::<McpResponse>(&event_data) {
                    if response.id == request_id {
                        return Ok(response);
                    }
                }
                event_data.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            if !event_data.is_empty() {
                event_data.push('\n');
            }
            event_data.push_str(data.strip_prefix(' ').unwrap_or(data));
        }
    }

    Err(McpError::Protocol(format!(
        "Event stream carried no response for request {}",
        request_id
    )))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError> {
        let request_id = request.id;
        let json = serde_json::to_string(&request)?;

        let response = self.post(json).await?;

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        let body = response
            .text()
            .await
            .map_err(|e| McpError::Protocol(format!("Failed to read response: {}", e)))?;

        let mcp_response = if is_event_stream {
            parse_event_stream(&body, request_id)?
        } else {
            serde_json::from_str::<McpResponse>(&body)
                .map_err(|e| McpError::Protocol(format!("Invalid JSON-RPC response: {}", e)))?
        };

        if mcp_response.id != request_id {
            return Err(McpError::Protocol(format!(
                "Response ID {} does not match request ID {}",
                mcp_response.id, request_id
            )));
        }

        Ok(mcp_response)
    }

    async fn notify(&self, notification: McpNotification) -> Result<(), McpError> {
        let json = serde_json::to_string(&notification)?;
        self.post(json).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        *self.session_id.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[tokio::test]
    async fn test_connect_valid_url() {
        let result =
            HttpTransport::connect("http://127.0.0.1:8000/mcp/math", &no_headers(), Duration::from_secs(5))
                .await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().endpoint_url(), "http://127.0.0.1:8000/mcp/math");
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let result = HttpTransport::connect("not-a-valid-url", &no_headers(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(McpError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_header() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let result =
            HttpTransport::connect("http://127.0.0.1:8000/mcp", &headers, Duration::from_secs(5)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_event_stream_finds_matching_id() {
        let body = "event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{}}\n\
                    \n\
                    event: message\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{\"tools\":[]}}\n\
                    \n";

        let response = parse_event_stream(body, 4).unwrap();
        assert_eq!(response.id, 4);
        assert_eq!(response.result.unwrap()["tools"], serde_json::json!([]));
    }

    #[test]
    fn test_parse_event_stream_without_trailing_blank_line() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{\"ok\":true}}";
        let response = parse_event_stream(body, 9).unwrap();
        assert_eq!(response.result.unwrap()["ok"], true);
    }

    #[test]
    fn test_parse_event_stream_missing_response() {
        let body = ": keep-alive\n\n";
        assert!(matches!(parse_event_stream(body, 1), Err(McpError::Protocol(_))));
    }
}

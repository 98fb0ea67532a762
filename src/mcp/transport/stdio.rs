// ABOUTME: Stdio transport - spawns an MCP server as a subprocess and speaks
// ABOUTME: newline-delimited JSON-RPC over its stdin/stdout.

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use super::Transport;
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<McpResponse>>>>;

/// Stdio transport. The child is killed when the transport is dropped.
pub struct StdioTransport {
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    pending: Pending,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl StdioTransport {
    /// Spawn `command` and start routing its stdout lines to pending requests.
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::Connection(format!("Failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Connection("Failed to open stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Connection("Failed to open stdout".into()))?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let routes = pending.clone();
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<McpResponse>(&line) {
                    Ok(response) => {
                        if let Some(tx) = routes.lock().await.remove(&response.id) {
                            let _ = tx.send(response);
                        }
                    }
                    // Server-initiated requests and notifications are not routed.
                    Err(_) => tracing::trace!(line = %line, "ignoring non-response line"),
                }
            }
            routes.lock().await.clear();
        });

        Ok(Self {
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(Some(stdin)),
            pending,
            reader_handle: Mutex::new(Some(reader_handle)),
            timeout,
        })
    }

    async fn write_line(&self, json: String) -> Result<(), McpError> {
        let mut stdin = self.stdin.lock().await;
        let stdin = stdin
            .as_mut()
            .ok_or_else(|| McpError::Connection("Server connection closed".into()))?;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, request: McpRequest) -> Result<McpResponse, McpError> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.write_line(serde_json::to_string(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(McpError::Connection("Server exited before responding".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Protocol("Request timed out".into()))
            }
        }
    }

    async fn notify(&self, notification: McpNotification) -> Result<(), McpError> {
        self.write_line(serde_json::to_string(&notification)?).await
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        // Closing stdin asks a well-behaved server to exit on its own.
        self.stdin.lock().await.take();

        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if tokio::time::timeout(Duration::from_millis(500), child.wait())
                .await
                .is_err()
            {
                let _ = child.kill().await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_nonexistent_binary() {
        let result = StdioTransport::connect(
            "/nonexistent/mcp-server",
            &[],
            &BTreeMap::new(),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(McpError::Connection(_))));
    }
}

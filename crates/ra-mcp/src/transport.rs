//! MCP transport layer: spawn a server process and speak JSON-RPC over its
//! stdin/stdout, or hold a not-yet-implemented SSE placeholder.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use ra_domain::config::McpServerConfig;

#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError>;
    async fn send_notification(&self, method: &str) -> Result<(), TransportError>;
    fn is_alive(&self) -> bool;
    async fn shutdown(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MCP server process has exited")]
    ProcessExited,
    #[error("timeout waiting for response")]
    Timeout,
    #[error("transport not supported: {0}")]
    Unsupported(String),
    #[error("server config missing required field: {0}")]
    BadConfig(String),
}

const MAX_SKIP_LINES: usize = 1000;

/// Communicates with a child process over stdin/stdout; each JSON-RPC
/// message is a single newline-delimited line. `request_lock` serializes
/// entire request/response cycles, matching the spec's "calls are
/// serialized on the connection" requirement.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    child: Mutex<Child>,
    request_lock: Mutex<()>,
    next_id: AtomicU64,
    alive: AtomicBool,
}

impl StdioTransport {
    pub fn spawn(config: &McpServerConfig) -> Result<Self, TransportError> {
        let command = config
            .command
            .as_ref()
            .ok_or_else(|| TransportError::BadConfig("stdio transport requires `command`".into()))?;

        let mut cmd = tokio::process::Command::new(command);
        cmd.args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(TransportError::Io)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "failed to capture child stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "failed to capture child stdout")))?;

        Ok(Self {
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            child: Mutex::new(child),
            request_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn write_line(&self, json: &str) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Reads a line of JSON, skipping any line that isn't JSON (e.g. a
    /// server logging to stdout). Gives up after [`MAX_SKIP_LINES`].
    async fn read_line(&self) -> Result<String, TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }
        let mut stdout = self.stdout.lock().await;
        let mut skipped = 0usize;
        loop {
            let mut line = String::new();
            let bytes_read = stdout.read_line(&mut line).await?;
            if bytes_read == 0 {
                self.alive.store(false, Ordering::SeqCst);
                return Err(TransportError::ProcessExited);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') {
                return Ok(trimmed.to_string());
            }
            skipped += 1;
            if skipped >= MAX_SKIP_LINES {
                self.alive.store(false, Ordering::SeqCst);
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "MCP server produced too many non-JSON lines on stdout",
                )));
            }
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        let _guard = self.request_lock.lock().await;

        let id = self.next_request_id();
        let req = JsonRpcRequest::new(id, method, params);
        let json = serde_json::to_string(&req)?;
        self.write_line(&json).await?;

        let timeout = tokio::time::Duration::from_secs(30);
        let result = tokio::time::timeout(timeout, async {
            loop {
                let line = self.read_line().await?;
                if let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&line) {
                    if resp.id == id {
                        return Ok(resp);
                    }
                }
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn send_notification(&self, method: &str) -> Result<(), TransportError> {
        let notif = JsonRpcNotification::new(method);
        let json = serde_json::to_string(&notif)?;
        self.write_line(&json).await
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let mut child = self.child.lock().await;
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let wait = tokio::time::timeout(tokio::time::Duration::from_secs(5), child.wait()).await;
        if wait.is_err() {
            let _ = child.kill().await;
        }
    }
}

/// Not yet implemented; the spec names SSE as an alternative transport but
/// all example MCP deployments in this corpus use stdio.
pub struct SseTransport;

#[async_trait]
impl McpTransport for SseTransport {
    async fn send_request(&self, _method: &str, _params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        Err(TransportError::Unsupported("SSE transport is not yet implemented".into()))
    }

    async fn send_notification(&self, _method: &str) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("SSE transport is not yet implemented".into()))
    }

    fn is_alive(&self) -> bool {
        false
    }

    async fn shutdown(&self) {}
}

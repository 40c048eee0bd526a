//! Client session over a worker transport
//!
//! A session performs the `initialize` handshake, then issues one request at
//! a time and waits for the response carrying the same id.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use super::worker::WorkerProcess;
use super::SessionState;
use crate::error::{BridgeError, Result};
use crate::mcp::protocol::{
    codes, methods, InitializeParams, McpNotification, McpRequest, McpResponse, Message,
    ToolCallResult, ToolDefinition,
};
use crate::mcp::tools::SEARCH_MUSIC_DATABASE;
use crate::mcp::Transport;
use crate::types::{ClientInfo, WorkerConfig};

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(2000);

pub struct Session {
    state: SessionState,
    transport: Option<Transport>,
    worker: Option<WorkerProcess>,
    /// Present when the session owns its worker
    config: Option<WorkerConfig>,
    client_info: ClientInfo,
    shutdown_grace: Duration,
    next_id: u64,
    /// Outstanding request ids and their methods
    pending: HashMap<u64, String>,
    server_info: Option<Value>,
}

impl Session {
    /// Session over an already connected transport
    pub fn attach(transport: Transport) -> Self {
        Self {
            state: SessionState::Uninitialized,
            transport: Some(transport),
            worker: None,
            config: None,
            client_info: ClientInfo::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            next_id: 1,
            pending: HashMap::new(),
            server_info: None,
        }
    }

    /// Session that spawns its worker on `open`
    pub fn spawn(config: WorkerConfig) -> Self {
        Self {
            state: SessionState::Uninitialized,
            transport: None,
            worker: None,
            client_info: config.client_info.clone(),
            shutdown_grace: config.shutdown_grace(),
            config: Some(config),
            next_id: 1,
            pending: HashMap::new(),
            server_info: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// The `initialize` result returned by the worker
    pub fn server_info(&self) -> Option<&Value> {
        self.server_info.as_ref()
    }

    pub fn worker_config(&self) -> Option<&WorkerConfig> {
        self.config.as_ref()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Spawn the worker if needed and perform the handshake
    pub async fn open(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Uninitialized => {}
            state => return Err(BridgeError::SessionNotReady(state)),
        }

        if self.transport.is_none() {
            let Some(config) = self.config.as_ref() else {
                self.state = SessionState::Closed;
                return Err(BridgeError::TransportClosed);
            };
            match WorkerProcess::spawn(config) {
                Ok((worker, transport)) => {
                    self.worker = Some(worker);
                    self.transport = Some(transport);
                }
                Err(e) => {
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            }
        }

        self.state = SessionState::Handshaking;
        match self.handshake().await {
            Ok(result) => {
                tracing::info!("Session ready: {}", result.get("serverInfo").unwrap_or(&result));
                self.server_info = Some(result);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Handshake failed: {}", e);
                self.close().await;
                Err(BridgeError::HandshakeFailed(e.to_string()))
            }
        }
    }

    async fn handshake(&mut self) -> Result<Value> {
        let params = serde_json::to_value(InitializeParams::new(self.client_info.clone()))?;
        let result = self.request(methods::INITIALIZE, params).await?;

        let transport = self.transport.as_mut().ok_or(BridgeError::TransportClosed)?;
        transport
            .send(&McpNotification::new(methods::INITIALIZED).into())
            .await?;
        Ok(result)
    }

    /// Issue one request and wait for its result
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        if self.state != SessionState::Ready {
            return Err(BridgeError::SessionNotReady(self.state));
        }

        match self.request(method, params).await {
            Err(e) if e.is_fatal() => {
                tracing::warn!("Closing session after {} failed: {}", method, e);
                self.close().await;
                Err(e)
            }
            other => other,
        }
    }

    /// Available tools on the worker
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDefinition>> {
        let result = self.call(methods::LIST_TOOLS, json!({})).await?;
        parse_tools(result)
    }

    /// Ask the catalogue search tool and return its text answer
    pub async fn search(&mut self, query: &str) -> Result<String> {
        let result = self
            .call(methods::CALL_TOOL, search_params(query))
            .await?;
        tool_text(result)
    }

    /// Close the transport and stop the worker; safe to call repeatedly
    pub async fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::debug!("Closing session (state: {:?})", self.state);
        }
        self.state = SessionState::Closed;
        self.pending.clear();

        if let Some(mut transport) = self.transport.take() {
            transport.close_writer().await;
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.shutdown(self.shutdown_grace).await {
                tracing::warn!("Error stopping worker: {}", e);
            }
        }
    }

    /// Replace a broken worker with a fresh one
    pub async fn restart(&mut self) -> Result<()> {
        if self.config.is_none() {
            return Err(BridgeError::Config(
                "only sessions that spawned their worker can restart".to_string(),
            ));
        }
        self.close().await;
        self.state = SessionState::Uninitialized;
        self.server_info = None;
        self.open().await
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, method.to_string());

        let result = self.exchange(id, method, params).await;
        self.pending.remove(&id);
        result
    }

    async fn exchange(&mut self, id: u64, method: &str, params: Value) -> Result<Value> {
        let transport = self.transport.as_mut().ok_or(BridgeError::TransportClosed)?;
        transport
            .send(&McpRequest::new(id, method, params).into())
            .await?;

        loop {
            match transport.receive().await? {
                Message::Response(response) if response.id == id => {
                    return response.into_result();
                }
                Message::Response(response) => {
                    if self.pending.remove(&response.id).is_none() {
                        return Err(BridgeError::Protocol(format!(
                            "response for unknown request id {}",
                            response.id
                        )));
                    }
                    tracing::debug!(id = response.id, "Discarding late response");
                }
                Message::Notification(notification) => {
                    tracing::debug!("Ignoring worker notification {}", notification.method);
                }
                Message::Request(request) => {
                    tracing::debug!("Rejecting worker request {}", request.method);
                    let reply = McpResponse::error(
                        request.id,
                        codes::METHOD_NOT_FOUND,
                        format!("Method not found: {}", request.method),
                    );
                    transport.send(&reply.into()).await?;
                }
            }
        }
    }
}

pub(crate) fn search_params(query: &str) -> Value {
    json!({
        "name": SEARCH_MUSIC_DATABASE,
        "arguments": { "query": query }
    })
}

pub(crate) fn parse_tools(result: Value) -> Result<Vec<ToolDefinition>> {
    let tools = result
        .get("tools")
        .cloned()
        .ok_or_else(|| BridgeError::Protocol("tools/list result has no tools".to_string()))?;
    serde_json::from_value(tools)
        .map_err(|e| BridgeError::Protocol(format!("malformed tool list: {}", e)))
}

/// First text item of a `tools/call` result
pub fn tool_text(result: Value) -> Result<String> {
    let result: ToolCallResult = serde_json::from_value(result)
        .map_err(|e| BridgeError::Protocol(format!("malformed tool result: {}", e)))?;
    if result.is_error == Some(true) {
        tracing::warn!("Tool reported an error: {:?}", result.first_text());
    }
    result
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| BridgeError::Protocol("tool result has no text content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_text() {
        let text = tool_text(json!({"content": [{"type": "text", "text": "hi"}]})).unwrap();
        assert_eq!(text, "hi");

        let err = tool_text(json!({"content": []})).unwrap_err();
        assert!(matches!(err, BridgeError::Protocol(_)));
    }

    #[test]
    fn test_search_params_shape() {
        assert_eq!(
            search_params("rock"),
            json!({"name": "search_music_database", "arguments": {"query": "rock"}})
        );
    }

    #[tokio::test]
    async fn test_restart_requires_spawned_worker() {
        let (a, _b) = tokio::io::duplex(64);
        let (r, w) = tokio::io::split(a);
        let mut session = Session::attach(Transport::new(r, w));
        assert!(matches!(
            session.restart().await,
            Err(BridgeError::Config(_))
        ));
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_spawn_failure_closes_session() {
        let mut session = Session::spawn(WorkerConfig::new("/nonexistent/chinook-worker"));
        assert!(matches!(session.open().await, Err(BridgeError::Spawn(_))));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.open().await,
            Err(BridgeError::SessionNotReady(SessionState::Closed))
        ));
    }
}

//! Error types for chinook-bridge

use std::time::Duration;

use thiserror::Error;

use crate::client::SessionState;
use crate::mcp::protocol::codes;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Transport closed")]
    TransportClosed,

    #[error("Transport timed out after {0:?}")]
    TransportTimeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session not ready (state: {0:?})")]
    SessionNotReady(SessionState),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Remote error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Whether the session that produced this error can no longer be used
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::TransportClosed
                | BridgeError::TransportTimeout(_)
                | BridgeError::Protocol(_)
                | BridgeError::HandshakeFailed(_)
        )
    }

    /// Get error code for the JSON-RPC protocol
    pub fn code(&self) -> i64 {
        match self {
            BridgeError::Protocol(_) => codes::INVALID_REQUEST,
            BridgeError::Rpc { code, .. } => *code,
            BridgeError::Serialization(_) => codes::PARSE_ERROR,
            BridgeError::Config(_) => codes::INVALID_PARAMS,
            _ => codes::INTERNAL_ERROR,
        }
    }
}

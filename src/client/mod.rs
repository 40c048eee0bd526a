//! Client side of the worker protocol
//!
//! Provides:
//! - Worker subprocess management
//! - The handshake/session state machine
//! - A task-owned session handle for concurrent callers

pub mod handle;
pub mod session;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use handle::{PendingCall, SessionHandle};
pub use session::{tool_text, Session};
pub use worker::WorkerProcess;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Handshaking,
    Ready,
    Closed,
}

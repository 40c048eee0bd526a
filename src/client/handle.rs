//! Task-owned session
//!
//! The session lives in its own tokio task. Callers send commands over a
//! channel and await a [`PendingCall`]; commands are served in arrival order,
//! so only one request is ever on the wire. A spawned worker that breaks is
//! restarted at most `max_restarts` times in a row; any successful call
//! restores the full allowance.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::session::{parse_tools, search_params, tool_text, Session};
use super::SessionState;
use crate::error::{BridgeError, Result};
use crate::mcp::protocol::{methods, ToolDefinition};

enum Command {
    Call {
        method: String,
        params: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a session running in a background task
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

/// Result of a call that has been queued but not yet answered
pub struct PendingCall {
    reply: oneshot::Receiver<Result<Value>>,
}

impl Future for PendingCall {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(BridgeError::TransportClosed)))
    }
}

impl SessionHandle {
    /// Move `session` into a background task
    ///
    /// An unopened session is opened on the first call. Dropping every
    /// handle closes the session.
    pub fn spawn(session: Session) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(serve(session, rx));
        (Self { commands }, task)
    }

    /// Queue a request
    pub fn call(&self, method: impl Into<String>, params: Value) -> PendingCall {
        let (reply, rx) = oneshot::channel();
        let command = Command::Call {
            method: method.into(),
            params,
            reply,
        };
        if self.commands.send(command).is_err() {
            tracing::debug!("Session task has stopped");
        }
        PendingCall { reply: rx }
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        parse_tools(self.call(methods::LIST_TOOLS, json!({})).await?)
    }

    pub async fn search(&self, query: &str) -> Result<String> {
        tool_text(self.call(methods::CALL_TOOL, search_params(query)).await?)
    }

    /// Close the session and wait until the worker has been stopped
    pub async fn close(&self) {
        let (done, rx) = oneshot::channel();
        if self.commands.send(Command::Close { done }).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Consecutive restarts still allowed
#[derive(Debug)]
struct RestartBudget {
    max: u32,
    used: u32,
}

impl RestartBudget {
    fn new(max: u32) -> Self {
        Self { max, used: 0 }
    }

    fn try_take(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    fn reset(&mut self) {
        self.used = 0;
    }
}

async fn serve(mut session: Session, mut commands: mpsc::UnboundedReceiver<Command>) {
    let max_restarts = session
        .worker_config()
        .map(|config| config.max_restarts)
        .unwrap_or(0);
    let mut budget = RestartBudget::new(max_restarts);
    let mut closed = false;

    while let Some(command) = commands.recv().await {
        let (method, params, reply) = match command {
            Command::Call {
                method,
                params,
                reply,
            } => (method, params, reply),
            Command::Close { done } => {
                session.close().await;
                closed = true;
                let _ = done.send(());
                continue;
            }
        };

        if closed {
            let _ = reply.send(Err(BridgeError::SessionNotReady(SessionState::Closed)));
            continue;
        }
        if let Err(e) = ensure_open(&mut session, &mut budget).await {
            let _ = reply.send(Err(e));
            continue;
        }

        let result = session.call(&method, params).await;
        if result.is_ok() {
            budget.reset();
        }
        let _ = reply.send(result);
    }

    session.close().await;
    tracing::debug!("Session task finished");
}

async fn ensure_open(session: &mut Session, budget: &mut RestartBudget) -> Result<()> {
    match session.state() {
        SessionState::Ready => Ok(()),
        SessionState::Uninitialized => session.open().await,
        SessionState::Closed if session.worker_config().is_some() => {
            if !budget.try_take() {
                return Err(BridgeError::SessionNotReady(SessionState::Closed));
            }
            tracing::warn!(
                "Restarting worker (attempt {}/{})",
                budget.used,
                budget.max
            );
            session.restart().await
        }
        state => Err(BridgeError::SessionNotReady(state)),
    }
}

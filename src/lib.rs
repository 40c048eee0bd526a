//! Chinook Bridge - natural-language search over a music catalogue
//!
//! A client talks MCP-style JSON-RPC over stdio to a worker process, which
//! compiles free-text questions into parameterized SQL against a read-only
//! SQLite catalogue and returns formatted answers.

pub mod assistant;
pub mod client;
pub mod error;
pub mod mcp;
pub mod query;
pub mod storage;
pub mod types;

pub use client::{Session, SessionHandle, SessionState};
pub use error::{BridgeError, Result};
pub use storage::Store;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! MCP (Model Context Protocol) over line-delimited JSON-RPC
//!
//! Provides:
//! - Message model and wire types
//! - Noise-tolerant line transport
//! - Worker-side dispatch and message loop

pub mod dispatcher;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use dispatcher::{MusicHandler, MISSING_QUERY};
pub use protocol::{
    codes, methods, InitializeParams, InitializeResult, McpError, McpHandler, McpNotification,
    McpRequest, McpResponse, Message, ToolCallResult, ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use tools::{get_tool_definitions, SEARCH_MUSIC_DATABASE, TOOL_DEFINITIONS};
pub use transport::{decode_line, Frame, Transport};

//! Line-delimited JSON transport
//!
//! One message per line over a pair of byte streams. Lines that are not
//! JSON objects (log output sharing the stream, including output that is not
//! UTF-8) are skipped without touching request/response correlation.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
};

use super::protocol::Message;
use crate::error::{BridgeError, Result};

type BoxReader = Box<dyn AsyncBufRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A decoded line
#[derive(Debug)]
pub enum Frame {
    Message(Message),
    /// Valid JSON that is not a valid message
    Invalid { id: Option<u64>, reason: String },
}

/// Bidirectional message channel
pub struct Transport {
    reader: BoxReader,
    writer: Option<BoxWriter>,
    read_timeout: Option<Duration>,
    line: Vec<u8>,
}

impl Transport {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(BufReader::new(reader)),
            writer: Some(Box::new(writer)),
            read_timeout: None,
            line: Vec::new(),
        }
    }

    /// Transport over this process's stdin/stdout
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Fail `receive` with `TransportTimeout` when no message arrives in time
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Serialize, write and flush one message
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(BridgeError::TransportClosed)?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        tracing::trace!(target: "chinook_bridge::wire", "-> {}", line.trim_end());
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::debug!("Write failed: {}", e);
            return Err(BridgeError::TransportClosed);
        }
        if let Err(e) = writer.flush().await {
            tracing::debug!("Flush failed: {}", e);
            return Err(BridgeError::TransportClosed);
        }
        Ok(())
    }

    /// Next message from the peer
    pub async fn receive(&mut self) -> Result<Message> {
        match self.receive_frame().await? {
            Frame::Message(message) => Ok(message),
            Frame::Invalid { reason, .. } => Err(BridgeError::Protocol(reason)),
        }
    }

    /// Next decodable line, keeping malformed messages as `Frame::Invalid`
    pub async fn receive_frame(&mut self) -> Result<Frame> {
        match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_frame())
                .await
                .map_err(|_| BridgeError::TransportTimeout(limit))?,
            None => self.read_frame().await,
        }
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line).await {
                Ok(0) => return Err(BridgeError::TransportClosed),
                Ok(_) => match std::str::from_utf8(&self.line) {
                    Ok(line) => {
                        if let Some(frame) = decode_line(line) {
                            return Ok(frame);
                        }
                    }
                    Err(e) => tracing::trace!("Skipping non-UTF-8 line: {}", e),
                },
                Err(e) => {
                    tracing::debug!("Read failed: {}", e);
                    return Err(BridgeError::TransportClosed);
                }
            }
        }
    }

    /// Close the write half; the peer observes end-of-file
    pub async fn close_writer(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
    }
}

/// Decode one line, or `None` when the line is noise
pub fn decode_line(line: &str) -> Option<Frame> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        if !trimmed.is_empty() {
            tracing::trace!("Skipping non-protocol line: {}", trimmed);
        }
        return None;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Skipping unparseable line ({}): {}", e, trimmed);
            return None;
        }
    };

    tracing::trace!(target: "chinook_bridge::wire", "<- {}", trimmed);
    let id = Message::salvage_id(&value);
    Some(match Message::from_value(value) {
        Ok(message) => Frame::Message(message),
        Err(e) => Frame::Invalid {
            id,
            reason: e.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{McpRequest, McpResponse};
    use serde_json::json;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_decode_line_skips_noise() {
        assert!(decode_line("[DEBUG] Starting MCP server\n").is_none());
        assert!(decode_line("\n").is_none());
        assert!(decode_line("{not json at all\n").is_none());
        assert!(matches!(
            decode_line(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#),
            Some(Frame::Message(Message::Response(_)))
        ));
    }

    #[test]
    fn test_decode_line_invalid_message_keeps_id() {
        match decode_line(r#"{"jsonrpc":"1.0","id":9,"method":"x"}"#) {
            Some(Frame::Invalid { id, .. }) => assert_eq!(id, Some(9)),
            other => panic!("expected invalid frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_receive_skips_interleaved_diagnostics() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let mut transport = Transport::new(read_half, write_half);

        server
            .write_all(
                b"[MCP-SERVER] *** RECEIVED TOOL CALL ***\n\
                  {broken\n\
                  {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"ok\":true}}\n",
            )
            .await
            .unwrap();

        let message = transport.receive().await.unwrap();
        assert_eq!(
            message,
            Message::Response(McpResponse::success(2, json!({"ok": true})))
        );
    }

    #[tokio::test]
    async fn test_receive_skips_non_utf8_lines() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let mut transport = Transport::new(read_half, write_half);

        server
            .write_all(b"[worker] caf\xe9 warming up\n{\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{}}\n")
            .await
            .unwrap();

        let message = transport.receive().await.unwrap();
        assert_eq!(message, Message::Response(McpResponse::success(4, json!({}))));
    }

    #[tokio::test]
    async fn test_send_writes_one_line() {
        let (client, server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let mut transport = Transport::new(read_half, write_half);

        transport
            .send(&McpRequest::new(5, "tools/list", Value::Null).into())
            .await
            .unwrap();

        let mut reader = BufReader::new(server);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 5, "method": "tools/list"}));
    }

    #[tokio::test]
    async fn test_eof_is_transport_closed() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let (read_half, write_half) = tokio::io::split(client);
        let mut transport = Transport::new(read_half, write_half);

        assert!(matches!(
            transport.receive().await,
            Err(BridgeError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (client, _server) = tokio::io::duplex(64);
        let (read_half, write_half) = tokio::io::split(client);
        let mut transport = Transport::new(read_half, write_half)
            .with_read_timeout(Some(Duration::from_millis(50)));

        assert!(matches!(
            transport.receive().await,
            Err(BridgeError::TransportTimeout(_))
        ));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (client, _server) = tokio::io::duplex(64);
        let (read_half, write_half) = tokio::io::split(client);
        let mut transport = Transport::new(read_half, write_half);
        transport.close_writer().await;

        let err = transport
            .send(&McpRequest::new(1, "ping", Value::Null).into())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::TransportClosed));
    }
}

//! Worker message loop

use super::protocol::{McpHandler, McpResponse, Message};
use super::transport::{Frame, Transport};
use crate::error::{BridgeError, Result};

/// Serves one client over a transport, one message at a time
pub struct McpServer<H: McpHandler> {
    handler: H,
}

impl<H: McpHandler> McpServer<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Run until the client closes its end of the transport
    pub async fn run(&self, transport: &mut Transport) -> Result<()> {
        loop {
            let frame = match transport.receive_frame().await {
                Ok(frame) => frame,
                Err(BridgeError::TransportClosed) => {
                    tracing::info!("Client closed the connection");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let reply = match frame {
                Frame::Message(Message::Request(request)) => {
                    tracing::debug!(id = request.id, "Request {}", request.method);
                    Some(self.handler.handle_request(request))
                }
                Frame::Message(Message::Notification(notification)) => {
                    self.handler.handle_notification(notification);
                    None
                }
                Frame::Message(Message::Response(response)) => {
                    tracing::warn!(id = response.id, "Ignoring unsolicited response");
                    None
                }
                Frame::Invalid {
                    id: Some(id),
                    reason,
                } => Some(McpResponse::from_error(id, BridgeError::Protocol(reason))),
                Frame::Invalid { id: None, reason } => {
                    tracing::warn!("Dropping invalid message: {}", reason);
                    None
                }
            };

            if let Some(response) = reply {
                match transport.send(&response.into()).await {
                    Ok(()) => {}
                    Err(BridgeError::TransportClosed) => {
                        tracing::info!("Client went away before the reply was written");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
}

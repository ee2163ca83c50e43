//! services/client/src/adapters/socket.rs
//!
//! WebSocket implementation of the chat transport. Frames carry the JSON
//! protocol from `chat::protocol`; the access-token handshake is the first
//! frame on every connection.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use telehealth_core::ports::ChatError;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::warn;

use crate::chat::protocol::{AuthHandshake, ClientEvent, ServerEvent};
use crate::chat::transport::{ChatConnection, ChatTransport};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Connects to the chat server over WebSocket.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Creates a transport for the given `ws://` or `wss://` URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    async fn connect(&self, token: &str) -> Result<Box<dyn ChatConnection>, ChatError> {
        let (mut stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| ChatError::ConnectionFailed(e.to_string()))?;

        let handshake = serde_json::to_string(&AuthHandshake::new(token))
            .map_err(|e| ChatError::Protocol(format!("failed to encode handshake: {e}")))?;
        stream
            .send(WsMessage::Text(handshake.into()))
            .await
            .map_err(|e| ChatError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(WsConnection { stream }))
    }
}

//=========================================================================================
// Connection
//=========================================================================================

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl ChatConnection for WsConnection {
    async fn send(&mut self, event: &ClientEvent) -> Result<(), ChatError> {
        let frame = serde_json::to_string(event)
            .map_err(|e| ChatError::Protocol(format!("failed to encode event: {e}")))?;
        self.stream
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| ChatError::ConnectionFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<ServerEvent, ChatError>> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => match serde_json::from_str(&text) {
                    Ok(event) => return Some(Ok(event)),
                    Err(e) => {
                        // Unknown event types are skipped rather than
                        // tearing down the connection.
                        warn!("Ignoring unparseable server frame: {e}");
                    }
                },
                Ok(WsMessage::Close(_)) => return None,
                // Pings are answered by tungstenite internally; binary and
                // pong frames carry nothing for this protocol.
                Ok(_) => {}
                Err(e) => return Some(Err(ChatError::ConnectionFailed(e.to_string()))),
            }
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================

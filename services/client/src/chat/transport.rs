//! services/client/src/chat/transport.rs
//!
//! The connection seam for the real-time chat. The production
//! implementation lives in `adapters::socket`; tests drive the session
//! through an in-memory implementation.

use async_trait::async_trait;
use telehealth_core::ports::ChatError;

use crate::chat::protocol::{ClientEvent, ServerEvent};

/// Opens authenticated real-time connections.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Connects and performs the token handshake. The returned connection
    /// yields server events starting with `authenticated` on success.
    async fn connect(&self, token: &str) -> Result<Box<dyn ChatConnection>, ChatError>;
}

/// One established real-time connection.
#[async_trait]
pub trait ChatConnection: Send {
    async fn send(&mut self, event: &ClientEvent) -> Result<(), ChatError>;

    /// The next server event. `None` means the connection closed cleanly;
    /// an `Err` is a fatal transport failure.
    async fn recv(&mut self) -> Option<Result<ServerEvent, ChatError>>;
}

impl std::fmt::Debug for dyn ChatConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChatConnection")
    }
}

//! services/client/src/lib.rs
//!
//! The telehealth client service: credential lifecycle, the authenticated
//! request pipeline, the real-time chat session, and the concrete adapters
//! that connect them to the REST API, the WebSocket server, and the disk.

pub mod adapters;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testutil;

pub use auth::SessionManager;
pub use chat::{ChatHandle, ChatNotice, ChatSession};
pub use config::Config;
pub use error::ClientError;
pub use pipeline::RequestPipeline;

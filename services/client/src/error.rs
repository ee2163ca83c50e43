//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire client service.

use crate::config::ConfigError;
use telehealth_core::ports::{AuthError, ChatError, RequestError};

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a credential-lifecycle failure (login, refresh, logout).
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Represents a failure of an authenticated API call.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Represents a failure of the real-time chat session.
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Represents a standard Input/Output error (e.g. reading the terminal).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

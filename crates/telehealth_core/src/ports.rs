//! crates/telehealth_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like HTTP transports or
//! on-disk storage.

use async_trait::async_trait;

use crate::domain::{Credential, Message, NewUser, Profile, Room};

//=========================================================================================
// Error Taxonomy
//=========================================================================================

/// Failures of the credential lifecycle (login, registration, refresh, logout).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server rejected the supplied email/password. Carries the
    /// server-provided message, or a generic fallback when there was none.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    /// A refresh was requested but no refresh token is persisted.
    /// Callers must treat this identically to a rejected refresh.
    #[error("No refresh token available")]
    NoRefreshToken,
    /// The server rejected the refresh token (expired or invalid).
    #[error("Refresh token rejected")]
    RefreshRejected,
    /// The request never produced an interpretable server response.
    #[error("Network failure: {0}")]
    Network(String),
}

/// Failures of an authenticated API call made through the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// A 401 that could not be recovered by a refresh-and-retry.
    #[error("Unauthorized")]
    Unauthorized,
    /// Any non-401 error status, with the server's message when it sent one.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    /// The request never produced an interpretable server response.
    #[error("Network failure: {0}")]
    Network(String),
    /// A pipeline-level token refresh failed. Propagated instead of the
    /// original 401 so callers observe the refresh failure.
    #[error("Authentication failure: {0}")]
    Auth(#[from] AuthError),
}

/// Failures of the real-time chat session.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The transport-level connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// The room lookup collaborator could not resolve a room.
    #[error("Failed to resolve chat room: {0}")]
    RoomResolutionFailed(String),
    /// A malformed or fatal message on the real-time connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for the three independent credential slots.
///
/// Reads are synchronous and must never perform I/O: implementations cache
/// slot values in memory and write through on mutation. Partial slot
/// presence (e.g. after a crash) is legal; each slot is interpreted on its
/// own. Empty-string tokens are never stored or returned.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn profile(&self) -> Option<Profile>;

    /// Persists all three slots.
    fn store(&self, credential: &Credential);
    /// Replaces only the access-token slot, leaving the other two untouched.
    fn replace_access_token(&self, access_token: &str);
    /// Removes all three slots.
    fn clear(&self);
}

/// The raw authentication wire API (`/auth/*`). No token attachment or
/// retry logic lives here; that is the request pipeline's job.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, user: &NewUser, password: &str) -> Result<Credential, AuthError>;

    async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthError>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError>;

    /// Invalidates the refresh token server-side. Best-effort from the
    /// caller's perspective; correctness never depends on it succeeding.
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
}

/// Authenticated REST reads used by the chat session.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Resolves the current user's single ongoing conversation.
    async fn room(&self) -> Result<Room, ChatError>;

    /// Loads the full message history for a room.
    async fn messages(&self, room_id: i64) -> Result<Vec<Message>, ChatError>;

    /// The server-side unread count for the current user.
    async fn unread_count(&self) -> Result<u32, ChatError>;
}

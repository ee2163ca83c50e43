//! services/client/src/chat/state.rs
//!
//! Defines the chat session's phases and per-session state.

use telehealth_core::domain::{Message, Room};
use tokio_util::sync::CancellationToken;

//=========================================================================================
// SessionPhase
//=========================================================================================

/// The chat session's connection lifecycle.
///
/// `Disconnected → Connecting → Authenticated → RoomJoined → Active`, with
/// the terminal `Closed` reachable from any phase. Room and message events
/// are only processed in `Active`; anything arriving earlier is dropped
/// (the history load at join time re-reads the authoritative message list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Authenticated,
    RoomJoined,
    Active,
    Closed,
}

//=========================================================================================
// ChatState
//=========================================================================================

/// The state of a single chat session, owned by its control loop. All
/// mutation happens on that one task; readers take the lock briefly.
pub struct ChatState {
    pub phase: SessionPhase,
    pub room: Option<Room>,
    /// Message history in arrival order. Server timestamps are not used to
    /// re-sort.
    pub messages: Vec<Message>,
    /// The draft the user is composing.
    pub input: String,
    /// Whether this client currently advertises a typing indicator.
    pub is_typing: bool,
    pub other_user_typing: bool,
    pub other_user_online: bool,
    /// Server-reported unread count; reconciled by polling, never derived
    /// locally.
    pub unread_count: u32,
    /// The most recent user-visible error, shown inline in the conversation.
    pub error_message: Option<String>,
    /// Cancels the control loop and everything scheduled inside it.
    pub cancellation_token: CancellationToken,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            room: None,
            messages: Vec::new(),
            input: String::new(),
            is_typing: false,
            other_user_typing: false,
            other_user_online: false,
            unread_count: 0,
            error_message: None,
            cancellation_token: CancellationToken::new(),
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

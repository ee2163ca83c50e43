//! services/client/src/chat/protocol.rs
//!
//! Defines the real-time message protocol between this client and the chat
//! server. Variant names are snake_case on the wire; field names are
//! camelCase, matching the REST contract.

use serde::{Deserialize, Serialize};
use telehealth_core::domain::Message;

//=========================================================================================
// Connection Handshake
//=========================================================================================

/// The first frame sent after the transport connects: the access token the
/// server authenticates the connection with.
#[derive(Serialize, Debug)]
pub struct AuthHandshake {
    pub auth: AuthToken,
}

#[derive(Serialize, Debug)]
pub struct AuthToken {
    pub token: String,
}

impl AuthHandshake {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            auth: AuthToken {
                token: token.into(),
            },
        }
    }
}

//=========================================================================================
// Events Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured events this client can emit to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Joins the resolved conversation room. Sent once per connection.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: i64 },

    /// Sends a chat message. The text is already trimmed by the session.
    #[serde(rename_all = "camelCase")]
    SendMessage { room_id: i64, message: String },

    /// Signals that the user started typing.
    #[serde(rename_all = "camelCase")]
    TypingStart { room_id: i64 },

    /// Signals that the user stopped typing (idle timeout or message sent).
    #[serde(rename_all = "camelCase")]
    TypingStop { room_id: i64 },

    /// Marks the room's messages as read by the current user.
    #[serde(rename_all = "camelCase")]
    MarkRead { room_id: i64 },
}

//=========================================================================================
// Events Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured events the server can emit to this client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The handshake token was accepted. Always the first event.
    Authenticated,

    /// Acknowledges a `join_room` request.
    JoinedRoom,

    /// A new message in the joined room, from either party.
    NewMessage {
        #[serde(flatten)]
        message: Message,
    },

    /// Another participant's typing state changed. Echoes of the current
    /// user's own typing are filtered by sender id, not by the server.
    #[serde(rename_all = "camelCase")]
    UserTyping { user_id: i64, is_typing: bool },

    /// Another participant's presence changed. Same self-filtering rule.
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: i64, is_online: bool },

    /// The other party read the conversation; the client stamps `read_at`
    /// on its own messages.
    MessagesRead,

    /// Reports an error to the client, which should display the message.
    Error { message: String },
}

//! services/client/src/adapters/chat_http.rs
//!
//! This module contains the adapter for the `/chat/*` REST endpoints. It
//! implements the `ChatApi` port from the `core` crate on top of the
//! request pipeline, so every call gets bearer attachment and 401 recovery
//! for free.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use telehealth_core::domain::{Message, Room};
use telehealth_core::ports::{ChatApi, ChatError};

use crate::pipeline::RequestPipeline;

//=========================================================================================
// Wire Envelopes
//=========================================================================================

#[derive(Deserialize)]
struct RoomEnvelope {
    room: Room,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadEnvelope {
    unread_count: u32,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ChatApi` port through the authenticated
/// request pipeline.
#[derive(Clone)]
pub struct HttpChatApi {
    pipeline: Arc<RequestPipeline>,
}

impl HttpChatApi {
    /// Creates a new `HttpChatApi`.
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }
}

//=========================================================================================
// `ChatApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn room(&self) -> Result<Room, ChatError> {
        let envelope: RoomEnvelope = self
            .pipeline
            .get_json("/chat/room")
            .await
            .map_err(|e| ChatError::RoomResolutionFailed(e.to_string()))?;
        Ok(envelope.room)
    }

    async fn messages(&self, room_id: i64) -> Result<Vec<Message>, ChatError> {
        let envelope: MessagesEnvelope = self
            .pipeline
            .get_json(&format!("/chat/rooms/{room_id}/messages"))
            .await
            .map_err(|e| ChatError::Protocol(format!("failed to load messages: {e}")))?;
        Ok(envelope.messages)
    }

    async fn unread_count(&self) -> Result<u32, ChatError> {
        let envelope: UnreadEnvelope = self
            .pipeline
            .get_json("/chat/unread-count")
            .await
            .map_err(|e| ChatError::Protocol(format!("failed to load unread count: {e}")))?;
        Ok(envelope.unread_count)
    }
}

//=========================================================================================
// Tests
//=========================================================================================

//! crates/telehealth_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs double as the wire representation: the server speaks
//! camelCase JSON, so the serde attributes here are part of the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role a user holds in the product. Serialized lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

/// A snapshot of the authenticated user, taken from the last successful
/// auth response. Never refreshed independently of login/registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<i64>,
}

/// The full credential set owned by the session manager.
///
/// Invariant: `access_token` and `refresh_token` are never empty strings.
/// Absence is modeled by the storage slot being absent, not by "".
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Profile,
}

/// Registration fields for a new account. The password travels separately
/// and is never held in domain state.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A short doctor summary attached to a room. The server sends these two
/// fields in snake_case, unlike the rest of the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub first_name: String,
    pub last_name: String,
}

/// The single ongoing conversation between one patient and one doctor.
/// Resolved once per chat session; never created or deleted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorSummary>,
}

/// One chat message. Append-only from the client's perspective; the only
/// in-place mutation is stamping `read_at` on the current user's own
/// messages when a read receipt arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    /// The wire calls the body "message"; locally that name collides with
    /// the struct, so it is `text` here.
    #[serde(rename = "message")]
    pub text: String,
    pub sender_id: i64,
    pub sender_role: Role,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
}

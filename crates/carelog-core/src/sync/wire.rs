//! Wire representation of the sync protocol
//!
//! Matches the HTTP endpoint contract: `GET /api/v1/sync?since=<ms>` returns
//! a [`PullResponse`], `POST /api/v1/sync` takes a [`PushRequest`] and
//! answers with confirmations wrapped in an [`ApiEnvelope`].

use serde::{Deserialize, Serialize};

use crate::models::EntityType;

/// What a change does to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// One entry of the change log, in both directions.
///
/// `local_id` is only meaningful to the device that pushed the change; the
/// server echoes it back in confirmations and zeroes it before the change is
/// served to other devices. `entity_id` is the server-assigned identity and
/// is empty for records that have never been accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    pub entity_type: EntityType,
    #[serde(default)]
    pub local_id: i64,
    pub entity_id: String,
    pub action: ChangeAction,
    /// Full serialized entity; absent for deletions
    #[serde(default)]
    pub data: Option<String>,
    pub version: i64,
    pub timestamp: i64,
}

/// Server acknowledgment for one accepted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub entity_type: EntityType,
    pub local_id: i64,
    pub remote_id: String,
    pub version: i64,
}

/// Response of the pull RPC.
///
/// `server_time` is the authoritative checkpoint; when `has_more` is set the
/// caller must pull again from it before pushing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub changes: Vec<ChangeEntry>,
    pub server_time: i64,
    #[serde(default)]
    pub has_more: bool,
}

/// Body of the push RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub changes: Vec<ChangeEntry>,
    pub last_sync_at: i64,
}

/// Generic response wrapper used by the push RPC. `code == 0` means success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

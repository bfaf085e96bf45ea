//! Entity models shared by every CareLog interface.
//!
//! Each record type carries the same sync metadata ([`SyncMeta`]) so the sync
//! engine can treat them uniformly through the [`Syncable`] trait.

mod chronic;
mod document;
mod family;
mod visit;

pub use chronic::{CheckupPlan, ChronicCondition};
pub use document::Document;
pub use family::{FamilyMember, Relationship};
pub use visit::Visit;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Syncable entity kinds, in the order they are collected during a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Visit,
    Document,
    ChronicCondition,
    CheckupPlan,
    FamilyMember,
}

impl EntityType {
    /// Every entity kind the engine knows about.
    pub const ALL: [Self; 5] = [
        Self::Visit,
        Self::Document,
        Self::ChronicCondition,
        Self::CheckupPlan,
        Self::FamilyMember,
    ];

    /// Wire/database name for this entity kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::Document => "document",
            Self::ChronicCondition => "chronic_condition",
            Self::CheckupPlan => "checkup_plan",
            Self::FamilyMember => "family_member",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown entity type: {s}")))
    }
}

/// Sync lifecycle tag carried by every record.
///
/// `Pending` means the record holds a local mutation the server has not
/// acknowledged yet. `Conflict` is representable for completeness; the
/// automatic merge resolver never rests a record in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Synced,
    #[default]
    Pending,
    Conflict,
}

impl SyncStatus {
    /// Database/wire name for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "SYNCED",
            Self::Pending => "PENDING",
            Self::Conflict => "CONFLICT",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SYNCED" => Ok(Self::Synced),
            "PENDING" => Ok(Self::Pending),
            "CONFLICT" => Ok(Self::Conflict),
            other => Err(Error::InvalidInput(format!("unknown sync status: {other}"))),
        }
    }
}

const fn default_version() -> i64 {
    1
}

/// Sync metadata embedded in every record.
///
/// `local_id` is the device-local rowid and is never the record's identity on
/// the server; `remote_id` is assigned by the server on first acceptance.
/// `version` is bumped by the server on every accepted mutation and is the
/// ordering authority within one record lineage. `updated_at` is device
/// wall-clock time and only ever used as a conflict tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    #[serde(default)]
    pub local_id: i64,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl SyncMeta {
    /// Metadata for a record freshly created on this device.
    #[must_use]
    pub fn for_new_record() -> Self {
        let now = crate::util::unix_timestamp_millis();
        Self {
            local_id: 0,
            remote_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            sync_status: SyncStatus::Pending,
        }
    }
}

impl Default for SyncMeta {
    fn default() -> Self {
        Self::for_new_record()
    }
}

/// Common view over every entity model the sync engine can handle.
pub trait Syncable: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Entity kind used on the wire and in the record store.
    const ENTITY_TYPE: EntityType;

    /// Shared sync metadata carried by the record.
    fn meta(&self) -> &SyncMeta;

    /// Mutable access to the sync metadata.
    fn meta_mut(&mut self) -> &mut SyncMeta;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trips_through_wire_name() {
        for kind in EntityType::ALL {
            let parsed: EntityType = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn entity_type_rejects_unknown_name() {
        assert!("appointment".parse::<EntityType>().is_err());
    }

    #[test]
    fn sync_status_round_trips() {
        for status in [SyncStatus::Synced, SyncStatus::Pending, SyncStatus::Conflict] {
            let parsed: SyncStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn new_record_meta_is_pending_without_remote_id() {
        let meta = SyncMeta::for_new_record();
        assert_eq!(meta.sync_status, SyncStatus::Pending);
        assert!(meta.remote_id.is_none());
        assert_eq!(meta.version, 1);
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn meta_deserializes_with_defaults() {
        let meta: SyncMeta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.local_id, 0);
        assert_eq!(meta.version, 1);
        assert_eq!(meta.sync_status, SyncStatus::Pending);
    }
}

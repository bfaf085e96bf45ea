//! Local record store contract consumed by the sync engine.
//!
//! The engine never touches a concrete storage technology; it sees each
//! entity type through an object-safe [`SyncStore`] handle yielding
//! normalized [`RecordSnapshot`] views, plus a [`SyncCheckpoint`] holding the
//! single `last_sync_at` watermark.

use crate::error::Result;
use crate::models::{EntityType, SyncStatus};

/// Normalized view of one local record, detached from its concrete type.
///
/// `payload` is the full serialized entity, exactly what goes on the wire as
/// a change's `data` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub entity_type: EntityType,
    pub local_id: i64,
    pub remote_id: Option<String>,
    pub version: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub sync_status: SyncStatus,
    pub payload: String,
}

/// Sync-facing operations over one entity type's records.
///
/// All writes here are self-contained and safe to re-run; the engine relies
/// on that to make a partially completed cycle harmless.
pub trait SyncStore: Send + Sync {
    /// Entity type this store holds.
    fn entity_type(&self) -> EntityType;

    /// Every record with a local mutation the server has not acknowledged,
    /// in insertion order.
    fn list_pending(&self) -> Result<Vec<RecordSnapshot>>;

    /// Look up a record by its server-assigned id.
    fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<RecordSnapshot>>;

    /// Materialize a remote record unseen on this device. Returns the new
    /// local id. The stored record is `Synced` at the given version.
    fn adopt_remote(&self, payload: &str, remote_id: &str, version: i64) -> Result<i64>;

    /// Replace an existing local record's state with the remote payload and
    /// mark it `Synced` at the given version.
    fn overwrite_with_remote(
        &self,
        local_id: i64,
        payload: &str,
        remote_id: &str,
        version: i64,
    ) -> Result<()>;

    /// Apply a remote deletion: soft-delete the record and mark the tombstone
    /// `Synced` at the incoming version so a stale local edit cannot
    /// resurrect it.
    fn apply_remote_delete(&self, local_id: i64, remote_id: &str, version: i64) -> Result<()>;

    /// Record a push confirmation: set the server-assigned id and version and
    /// flip the record to `Synced`.
    fn mark_synced(&self, local_id: i64, remote_id: &str, version: i64) -> Result<()>;
}

/// Persisted `last_sync_at` watermark: the server timestamp below which all
/// remote changes are known to be merged locally.
pub trait SyncCheckpoint: Send + Sync {
    fn last_sync_at(&self) -> Result<i64>;
    fn set_last_sync_at(&self, timestamp: i64) -> Result<()>;
}

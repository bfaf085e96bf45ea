//! Change collection
//!
//! Scans the local store for records whose status is not `Synced` and turns
//! each into a normalized [`ChangeEntry`]. Collection is a pure read; nothing
//! transitions to `Synced` until the server confirms the push.

use std::sync::Arc;

use crate::error::Result;
use crate::sync::store::{RecordSnapshot, SyncStore};
use crate::sync::wire::{ChangeAction, ChangeEntry};

/// Collect the pending changes of one entity type, preserving insertion
/// order so a create-then-delete of a never-synced record stays ordered.
pub fn collect_pending(store: &dyn SyncStore) -> Result<Vec<ChangeEntry>> {
    Ok(store
        .list_pending()?
        .into_iter()
        .map(change_from_snapshot)
        .collect())
}

/// Collect pending changes across every entity type, concatenated.
pub fn collect_all(stores: &[Arc<dyn SyncStore>]) -> Result<Vec<ChangeEntry>> {
    let mut changes = Vec::new();
    for store in stores {
        changes.extend(collect_pending(store.as_ref())?);
    }
    Ok(changes)
}

fn change_from_snapshot(snapshot: RecordSnapshot) -> ChangeEntry {
    let action = if snapshot.deleted_at.is_some() {
        ChangeAction::Delete
    } else if snapshot.remote_id.is_none() {
        ChangeAction::Insert
    } else {
        ChangeAction::Update
    };

    ChangeEntry {
        entity_type: snapshot.entity_type,
        local_id: snapshot.local_id,
        entity_id: snapshot.remote_id.unwrap_or_default(),
        action,
        data: match action {
            ChangeAction::Delete => None,
            ChangeAction::Insert | ChangeAction::Update => Some(snapshot.payload),
        },
        version: snapshot.version,
        timestamp: snapshot.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityType, SyncStatus};
    use pretty_assertions::assert_eq;

    fn snapshot(
        local_id: i64,
        remote_id: Option<&str>,
        deleted_at: Option<i64>,
    ) -> RecordSnapshot {
        RecordSnapshot {
            entity_type: EntityType::Visit,
            local_id,
            remote_id: remote_id.map(str::to_string),
            version: 1,
            updated_at: 1_700_000_000_000 + local_id,
            deleted_at,
            sync_status: SyncStatus::Pending,
            payload: format!("{{\"localId\":{local_id}}}"),
        }
    }

    #[test]
    fn never_synced_record_becomes_insert() {
        let change = change_from_snapshot(snapshot(1, None, None));
        assert_eq!(change.action, ChangeAction::Insert);
        assert_eq!(change.entity_id, "");
        assert!(change.data.is_some());
    }

    #[test]
    fn known_record_becomes_update() {
        let change = change_from_snapshot(snapshot(1, Some("srv-1"), None));
        assert_eq!(change.action, ChangeAction::Update);
        assert_eq!(change.entity_id, "srv-1");
    }

    #[test]
    fn deleted_record_becomes_delete_without_data() {
        let change = change_from_snapshot(snapshot(1, Some("srv-1"), Some(2)));
        assert_eq!(change.action, ChangeAction::Delete);
        assert!(change.data.is_none());
    }

    #[test]
    fn never_synced_delete_keeps_empty_entity_id() {
        // Created and soft-deleted before ever syncing: still a DELETE, with
        // no identity for the server to match; the server treats it as a
        // no-op rather than an error.
        let change = change_from_snapshot(snapshot(1, None, Some(2)));
        assert_eq!(change.action, ChangeAction::Delete);
        assert_eq!(change.entity_id, "");
        assert!(change.data.is_none());
    }

    #[test]
    fn timestamp_mirrors_last_local_mutation() {
        let change = change_from_snapshot(snapshot(5, None, None));
        assert_eq!(change.timestamp, 1_700_000_000_005);
        assert_eq!(change.local_id, 5);
    }
}

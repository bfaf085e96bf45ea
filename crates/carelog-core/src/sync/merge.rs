//! Merge resolution
//!
//! Given one pulled change and the matching local record (if any), decide
//! what the local store should look like afterwards. The decision is pure;
//! the engine applies it.

use crate::models::SyncStatus;
use crate::sync::store::RecordSnapshot;
use crate::sync::wire::{ChangeAction, ChangeEntry};

/// Rule for picking a winner when both sides edited the same record.
///
/// One value for the whole engine; records are coarse enough that per-field
/// merging is not worth negotiating per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The later writer wins, judged by local `updated_at` against the remote
    /// change's timestamp. Versions order edits within one lineage; wall
    /// clocks only break ties between divergent lineages.
    #[default]
    LastWriteWins,
    /// The remote copy always wins.
    ServerWins,
    /// The local copy always wins and is re-pushed.
    ClientWins,
}

/// What the engine should do with one pulled change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Materialize or overwrite local state from the remote payload and mark
    /// it `Synced`.
    AdoptRemote,
    /// The local pending edit wins; leave it `Pending` so the next push can
    /// overwrite the server.
    KeepLocal,
    /// Apply the remote deletion to the existing local record.
    Deleted,
    /// Nothing to do (e.g. a deletion for a record never seen here).
    Skip,
}

/// Resolve one remote change against the local record with the same remote
/// id, if any.
#[must_use]
pub fn merge(
    local: Option<&RecordSnapshot>,
    remote: &ChangeEntry,
    policy: ConflictPolicy,
) -> MergeOutcome {
    let Some(local) = local else {
        // Unseen on this device: deletions are a no-op, anything else is new.
        return match remote.action {
            ChangeAction::Delete => MergeOutcome::Skip,
            ChangeAction::Insert | ChangeAction::Update => MergeOutcome::AdoptRemote,
        };
    };

    if remote.action == ChangeAction::Delete {
        return MergeOutcome::Deleted;
    }

    // A true conflict needs an unacknowledged local edit; otherwise the
    // remote change simply supersedes our copy.
    if local.sync_status != SyncStatus::Pending {
        return MergeOutcome::AdoptRemote;
    }

    match policy {
        ConflictPolicy::ServerWins => MergeOutcome::AdoptRemote,
        ConflictPolicy::ClientWins => MergeOutcome::KeepLocal,
        ConflictPolicy::LastWriteWins => {
            if local.updated_at > remote.timestamp {
                MergeOutcome::KeepLocal
            } else {
                MergeOutcome::AdoptRemote
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;
    use pretty_assertions::assert_eq;

    fn local(sync_status: SyncStatus, updated_at: i64) -> RecordSnapshot {
        RecordSnapshot {
            entity_type: EntityType::Visit,
            local_id: 1,
            remote_id: Some("srv-1".to_string()),
            version: 2,
            updated_at,
            deleted_at: None,
            sync_status,
            payload: "{}".to_string(),
        }
    }

    fn remote(action: ChangeAction, timestamp: i64) -> ChangeEntry {
        ChangeEntry {
            entity_type: EntityType::Visit,
            local_id: 0,
            entity_id: "srv-1".to_string(),
            action,
            data: Some("{}".to_string()),
            version: 3,
            timestamp,
        }
    }

    #[test]
    fn unseen_insert_is_adopted() {
        let outcome = merge(None, &remote(ChangeAction::Insert, 10), ConflictPolicy::default());
        assert_eq!(outcome, MergeOutcome::AdoptRemote);
    }

    #[test]
    fn unseen_delete_is_a_no_op() {
        let outcome = merge(None, &remote(ChangeAction::Delete, 10), ConflictPolicy::default());
        assert_eq!(outcome, MergeOutcome::Skip);
    }

    #[test]
    fn remote_delete_wins_over_local_edit() {
        // Even a pending local edit must not resurrect a deleted record.
        let snapshot = local(SyncStatus::Pending, 100);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Delete, 10),
            ConflictPolicy::default(),
        );
        assert_eq!(outcome, MergeOutcome::Deleted);
    }

    #[test]
    fn synced_local_copy_is_superseded_without_conflict() {
        let snapshot = local(SyncStatus::Synced, 999);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Update, 10),
            ConflictPolicy::default(),
        );
        assert_eq!(outcome, MergeOutcome::AdoptRemote);
    }

    #[test]
    fn last_write_wins_keeps_newer_local_edit_pending() {
        let snapshot = local(SyncStatus::Pending, 200);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Update, 100),
            ConflictPolicy::LastWriteWins,
        );
        assert_eq!(outcome, MergeOutcome::KeepLocal);
    }

    #[test]
    fn last_write_wins_adopts_newer_remote_edit() {
        let snapshot = local(SyncStatus::Pending, 100);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Update, 200),
            ConflictPolicy::LastWriteWins,
        );
        assert_eq!(outcome, MergeOutcome::AdoptRemote);
    }

    #[test]
    fn last_write_wins_tie_goes_to_remote() {
        let snapshot = local(SyncStatus::Pending, 100);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Update, 100),
            ConflictPolicy::LastWriteWins,
        );
        assert_eq!(outcome, MergeOutcome::AdoptRemote);
    }

    #[test]
    fn server_wins_always_adopts() {
        let snapshot = local(SyncStatus::Pending, 999);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Update, 1),
            ConflictPolicy::ServerWins,
        );
        assert_eq!(outcome, MergeOutcome::AdoptRemote);
    }

    #[test]
    fn client_wins_always_keeps_local() {
        let snapshot = local(SyncStatus::Pending, 1);
        let outcome = merge(
            Some(&snapshot),
            &remote(ChangeAction::Update, 999),
            ConflictPolicy::ClientWins,
        );
        assert_eq!(outcome, MergeOutcome::KeepLocal);
    }
}

//! Sync engine orchestration
//!
//! One `sync()` call is one exclusive cycle: pull remote changes to
//! exhaustion, merge them, collect pending local edits, push, apply
//! confirmations, advance the checkpoint. Every step's writes are
//! self-contained and idempotent, so a cycle that dies halfway leaves the
//! store consistent and the next cycle converges to the same end state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::models::EntityType;
use crate::sync::collector;
use crate::sync::merge::{merge, ConflictPolicy, MergeOutcome};
use crate::sync::store::{SyncCheckpoint, SyncStore};
use crate::sync::transport::{SyncTransport, TransportError};
use crate::sync::wire::ChangeEntry;

/// Observable engine state, always queryable.
///
/// `Success`/`Error` describe the last finished cycle; the next `sync()`
/// call moves the state back through `Syncing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    Success { checkpoint: i64 },
    Error { message: String },
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Remote changes pulled
    pub pulled: usize,
    /// Pulled changes that modified the local store
    pub applied: usize,
    /// Local changes pushed
    pub pushed: usize,
    /// Push confirmations applied
    pub confirmed: usize,
    /// Checkpoint persisted at the end of the cycle
    pub checkpoint: i64,
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// The re-entrancy guard tripped; not a failure of sync itself.
    #[error("Sync already in progress")]
    AlreadyInProgress,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] crate::error::Error),
}

/// Orchestrates one entity-agnostic sync cycle over the injected transport,
/// record stores and checkpoint.
pub struct SyncEngine<T: SyncTransport> {
    transport: T,
    stores: Vec<Arc<dyn SyncStore>>,
    checkpoint: Arc<dyn SyncCheckpoint>,
    policy: ConflictPolicy,
    state: watch::Sender<SyncState>,
    in_flight: AtomicBool,
}

impl<T: SyncTransport> SyncEngine<T> {
    #[must_use]
    pub fn new(
        transport: T,
        stores: Vec<Arc<dyn SyncStore>>,
        checkpoint: Arc<dyn SyncCheckpoint>,
        policy: ConflictPolicy,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            transport,
            stores,
            checkpoint,
            policy,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Last known state, for rendering "last synced at ..." style UI.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Subscribe to state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Run one full sync cycle.
    ///
    /// Fails fast with [`SyncError::AlreadyInProgress`] when a cycle is in
    /// flight; the guard is an atomic compare-and-set, so concurrent callers
    /// cannot both enter. Dropping the returned future mid-cycle releases the
    /// guard without rolling back already-applied merges or confirmations.
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::AlreadyInProgress);
        }

        let guard = CycleGuard {
            in_flight: &self.in_flight,
            state: &self.state,
            finished: false,
        };
        self.state.send_replace(SyncState::Syncing);

        let result = self.run_cycle().await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    pulled = report.pulled,
                    applied = report.applied,
                    pushed = report.pushed,
                    confirmed = report.confirmed,
                    checkpoint = report.checkpoint,
                    "sync cycle completed"
                );
                guard.finish(SyncState::Success {
                    checkpoint: report.checkpoint,
                });
            }
            Err(error) => {
                tracing::warn!("sync cycle failed: {error}");
                guard.finish(SyncState::Error {
                    message: error.to_string(),
                });
            }
        }
        result
    }

    async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        let last_sync_at = self.checkpoint.last_sync_at()?;
        let mut since = last_sync_at;
        let mut checkpoint = last_sync_at;
        let mut pulled = 0;
        let mut applied = 0;

        loop {
            let page = self.transport.pull_since(since).await?;
            tracing::debug!(since, count = page.changes.len(), "pulled changes");
            pulled += page.changes.len();
            for change in &page.changes {
                if self.apply_remote_change(change)? {
                    applied += 1;
                }
            }
            checkpoint = page.server_time;
            if !page.has_more {
                break;
            }
            // Drain the server before pushing, so the push never runs
            // against a stale baseline.
            since = page.server_time;
        }

        let changes = collector::collect_all(&self.stores)?;
        let pushed = changes.len();
        let mut confirmed = 0;
        if !changes.is_empty() {
            tracing::debug!(count = pushed, "pushing local changes");
            let confirmations = self.transport.push_changes(&changes, last_sync_at).await?;
            for confirmation in confirmations {
                if let Some(store) = self.store_for(confirmation.entity_type) {
                    store.mark_synced(
                        confirmation.local_id,
                        &confirmation.remote_id,
                        confirmation.version,
                    )?;
                    confirmed += 1;
                } else {
                    tracing::warn!(
                        entity_type = %confirmation.entity_type,
                        "confirmation for unknown entity type"
                    );
                }
            }
        }

        self.checkpoint.set_last_sync_at(checkpoint)?;

        Ok(SyncReport {
            pulled,
            applied,
            pushed,
            confirmed,
            checkpoint,
        })
    }

    /// Merge one pulled change into the local store. Returns whether the
    /// store was modified.
    fn apply_remote_change(&self, change: &ChangeEntry) -> Result<bool, SyncError> {
        let Some(store) = self.store_for(change.entity_type) else {
            tracing::warn!(
                entity_type = %change.entity_type,
                "pulled change for unknown entity type"
            );
            return Ok(false);
        };
        if change.entity_id.is_empty() {
            tracing::warn!("pulled change without a server id, skipping");
            return Ok(false);
        }

        let local = store.find_by_remote_id(&change.entity_id)?;
        match merge(local.as_ref(), change, self.policy) {
            MergeOutcome::Skip => Ok(false),
            MergeOutcome::KeepLocal => {
                tracing::debug!(
                    entity_id = %change.entity_id,
                    "local edit wins, leaving it pending"
                );
                Ok(false)
            }
            MergeOutcome::Deleted => match local {
                Some(existing) => {
                    store.apply_remote_delete(
                        existing.local_id,
                        &change.entity_id,
                        change.version,
                    )?;
                    Ok(true)
                }
                None => Ok(false),
            },
            MergeOutcome::AdoptRemote => {
                let Some(payload) = change.data.as_deref() else {
                    tracing::warn!(
                        entity_id = %change.entity_id,
                        "change without payload, skipping"
                    );
                    return Ok(false);
                };
                match local {
                    Some(existing) => store.overwrite_with_remote(
                        existing.local_id,
                        payload,
                        &change.entity_id,
                        change.version,
                    )?,
                    None => {
                        store.adopt_remote(payload, &change.entity_id, change.version)?;
                    }
                }
                Ok(true)
            }
        }
    }

    fn store_for(&self, entity_type: EntityType) -> Option<&dyn SyncStore> {
        self.stores
            .iter()
            .find(|store| store.entity_type() == entity_type)
            .map(|store| store.as_ref())
    }
}

/// Releases the re-entrancy guard even when the cycle future is dropped.
struct CycleGuard<'a> {
    in_flight: &'a AtomicBool,
    state: &'a watch::Sender<SyncState>,
    finished: bool,
}

impl CycleGuard<'_> {
    fn finish(mut self, state: SyncState) {
        self.state.send_replace(state);
        self.finished = true;
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Cancelled mid-cycle: no result was ever published.
            self.state.send_replace(SyncState::Idle);
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

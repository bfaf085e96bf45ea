//! Per-user change log with idempotent application.
//!
//! The authoritative log the sync endpoint serves. Application rules keep a
//! retried push from duplicating entities: an INSERT for an entity id the
//! log already knows is applied as an UPDATE, and a DELETE for an unknown
//! (or never-synced) entity id is a no-op that is still confirmed so the
//! client can settle its tombstone.
//!
//! State is in-memory behind a mutex; a durable log store slots in behind
//! the same interface.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use carelog_core::models::EntityType;
use carelog_core::sync::{ChangeAction, ChangeEntry, Confirmation, PullResponse};
use uuid::Uuid;

pub struct SyncLog {
    state: Mutex<HashMap<String, UserLog>>,
    page_size: usize,
}

#[derive(Default)]
struct UserLog {
    /// Accepted changes in timestamp order.
    entries: Vec<ChangeEntry>,
    /// Entity ids this user's log has ever accepted.
    known: HashSet<(EntityType, String)>,
    /// Last stamped timestamp, to keep the log strictly ordered even when
    /// two pushes land within one millisecond.
    clock: i64,
}

impl UserLog {
    fn next_timestamp(&mut self) -> i64 {
        self.clock = now_millis().max(self.clock + 1);
        self.clock
    }
}

impl SyncLog {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Apply pushed changes and return one confirmation per change, each
    /// carrying the server-assigned remote id and version.
    pub fn apply_changes(&self, user_id: &str, changes: &[ChangeEntry]) -> Vec<Confirmation> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let log = state.entry(user_id.to_string()).or_default();

        let mut confirmations = Vec::with_capacity(changes.len());
        for change in changes {
            let remote_id = if change.entity_id.trim().is_empty() {
                Uuid::new_v4().to_string()
            } else {
                change.entity_id.clone()
            };
            let key = (change.entity_type, remote_id.clone());
            let known = log.known.contains(&key);

            if change.action == ChangeAction::Delete && !known {
                // Nothing to delete and nothing to propagate; confirm so the
                // client can mark its tombstone synced.
                confirmations.push(Confirmation {
                    entity_type: change.entity_type,
                    local_id: change.local_id,
                    remote_id,
                    version: change.version + 1,
                });
                continue;
            }

            let action = if change.action == ChangeAction::Insert && known {
                ChangeAction::Update
            } else {
                change.action
            };
            let version = if action == ChangeAction::Insert {
                change.version.max(1)
            } else {
                change.version + 1
            };

            let timestamp = log.next_timestamp();
            log.entries.push(ChangeEntry {
                entity_type: change.entity_type,
                // The pusher's local id means nothing to other devices.
                local_id: 0,
                entity_id: remote_id.clone(),
                action,
                data: change.data.clone(),
                version,
                timestamp,
            });
            log.known.insert(key);

            confirmations.push(Confirmation {
                entity_type: change.entity_type,
                local_id: change.local_id,
                remote_id,
                version,
            });
        }
        confirmations
    }

    /// Changes newer than `since`, oldest first, paginated.
    pub fn changes_since(&self, user_id: &str, since: i64) -> PullResponse {
        let state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(log) = state.get(user_id) else {
            return PullResponse {
                changes: Vec::new(),
                server_time: now_millis(),
                has_more: false,
            };
        };

        let mut newer: Vec<ChangeEntry> = log
            .entries
            .iter()
            .filter(|entry| entry.timestamp > since)
            .cloned()
            .collect();

        let has_more = newer.len() > self.page_size;
        newer.truncate(self.page_size);
        let server_time = if has_more {
            // Next pull resumes from the last served change.
            newer.last().map_or(log.clock, |entry| entry.timestamp)
        } else {
            now_millis().max(log.clock)
        };

        PullResponse {
            changes: newer,
            server_time,
            has_more,
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

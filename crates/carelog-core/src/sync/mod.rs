//! Offline-first synchronization engine
//!
//! Reconciles the local record store with the remote authoritative change
//! log: [`collector`] turns pending local edits into change entries,
//! [`merge`] decides what pulled changes do to local records,
//! [`transport`] speaks the two RPCs, and [`engine`] sequences one cycle
//! (pull, merge, collect, push, confirm, checkpoint) at a time.

pub mod collector;
pub mod engine;
pub mod merge;
pub mod store;
pub mod transport;
pub mod wire;

pub use engine::{SyncEngine, SyncError, SyncReport, SyncState};
pub use merge::{merge, ConflictPolicy, MergeOutcome};
pub use store::{RecordSnapshot, SyncCheckpoint, SyncStore};
pub use transport::{HttpSyncTransport, SyncTransport, TransportError, TransportResult};
pub use wire::{ApiEnvelope, ChangeAction, ChangeEntry, Confirmation, PullResponse, PushRequest};

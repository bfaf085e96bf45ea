//! carelog-core - Core library for CareLog
//!
//! This crate contains the shared entity models, the local record store, the
//! auth client, and the offline-first sync engine used by all CareLog
//! interfaces (CLI, future mobile/desktop shells) and by the backend's wire
//! types.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    CheckupPlan, ChronicCondition, Document, EntityType, FamilyMember, SyncStatus, Syncable, Visit,
};
pub use sync::{ConflictPolicy, SyncEngine, SyncReport, SyncState};

//! Clinic visit model

use serde::{Deserialize, Serialize};

use super::{EntityType, SyncMeta, Syncable};

/// One clinic visit: where, when, what was done and what it cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[serde(flatten)]
    pub meta: SyncMeta,
    /// Remote id of the family member this visit belongs to, if any
    #[serde(default)]
    pub member_id: Option<String>,
    /// Visit date (Unix ms)
    pub date: i64,
    pub hospital: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub doctor: Option<String>,
    /// Free-text list of examinations/treatments
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Visit {
    /// Create a new visit pending its first sync.
    #[must_use]
    pub fn new(date: i64, hospital: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::for_new_record(),
            member_id: None,
            date,
            hospital: hospital.into(),
            department: None,
            doctor: None,
            items: None,
            cost: None,
            note: None,
        }
    }
}

impl Syncable for Visit {
    const ENTITY_TYPE: EntityType = EntityType::Visit;

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }
}

//! Family member model

use serde::{Deserialize, Serialize};

use super::{EntityType, SyncMeta, Syncable};

/// Relationship of a family member to the account owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    #[serde(rename = "SELF")]
    Myself,
    Spouse,
    Child,
    Parent,
    Other,
}

/// A person whose records are kept under this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub birth_date: Option<i64>,
    #[serde(default)]
    pub medical_card_no: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl FamilyMember {
    /// Create a new member record pending its first sync.
    #[must_use]
    pub fn new(name: impl Into<String>, relationship: Relationship) -> Self {
        Self {
            meta: SyncMeta::for_new_record(),
            name: name.into(),
            relationship,
            birth_date: None,
            medical_card_no: None,
            is_default: false,
        }
    }
}

impl Syncable for FamilyMember {
    const ENTITY_TYPE: EntityType = EntityType::FamilyMember;

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }
}

//! Chronic condition and checkup plan models

use serde::{Deserialize, Serialize};

use super::{EntityType, SyncMeta, Syncable};

/// A diagnosed chronic condition tracked over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChronicCondition {
    #[serde(flatten)]
    pub meta: SyncMeta,
    /// Remote id of the family member this condition belongs to, if any
    #[serde(default)]
    pub member_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub diagnosed_at: Option<i64>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ChronicCondition {
    /// Create a new condition record pending its first sync.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::for_new_record(),
            member_id: None,
            name: name.into(),
            diagnosed_at: None,
            department: None,
            note: None,
        }
    }
}

impl Syncable for ChronicCondition {
    const ENTITY_TYPE: EntityType = EntityType::ChronicCondition;

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }
}

/// Recurring checkup schedule attached to a chronic condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckupPlan {
    #[serde(flatten)]
    pub meta: SyncMeta,
    /// Local id of the condition this plan belongs to
    pub condition_id: i64,
    /// Free-text list of items to re-check
    #[serde(default)]
    pub items: Option<String>,
    pub interval_months: i64,
    #[serde(default)]
    pub start_date: Option<i64>,
    #[serde(default)]
    pub remind_days_before: Option<i64>,
}

impl CheckupPlan {
    /// Create a new plan pending its first sync.
    #[must_use]
    pub fn new(condition_id: i64, interval_months: i64) -> Self {
        Self {
            meta: SyncMeta::for_new_record(),
            condition_id,
            items: None,
            interval_months,
            start_date: None,
            remind_days_before: None,
        }
    }
}

impl Syncable for CheckupPlan {
    const ENTITY_TYPE: EntityType = EntityType::CheckupPlan;

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_round_trips_with_camel_case_fields() {
        let mut plan = CheckupPlan::new(7, 3);
        plan.remind_days_before = Some(5);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["conditionId"], 7);
        assert_eq!(json["intervalMonths"], 3);
        assert_eq!(json["remindDaysBefore"], 5);

        let back: CheckupPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn condition_defaults_are_empty() {
        let condition = ChronicCondition::new("Hypertension");
        assert!(condition.diagnosed_at.is_none());
        assert!(condition.member_id.is_none());
    }
}

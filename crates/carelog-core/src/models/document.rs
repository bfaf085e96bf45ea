//! Scanned document model

use serde::{Deserialize, Serialize};

use super::{EntityType, SyncMeta, Syncable};

/// A scanned report, prescription or other paper record.
///
/// `local_path` points at the file on this device and is not meaningful on
/// other devices; `remote_path` is the opaque reference returned by the blob
/// store after upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(flatten)]
    pub meta: SyncMeta,
    /// Local id of the visit this document is attached to, if any
    #[serde(default)]
    pub visit_id: Option<i64>,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default = "default_pages")]
    pub pages: i64,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub remote_path: Option<String>,
    /// Comma-separated free-text tags
    #[serde(default)]
    pub tags: Option<String>,
}

const fn default_pages() -> i64 {
    1
}

impl Document {
    /// Create a new document pending its first sync.
    #[must_use]
    pub fn new(title: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::for_new_record(),
            visit_id: None,
            title: title.into(),
            doc_type: doc_type.into(),
            pages: 1,
            local_path: None,
            remote_path: None,
            tags: None,
        }
    }
}

impl Syncable for Document {
    const ENTITY_TYPE: EntityType = EntityType::Document;

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
    fn doc_type_serializes_as_type() {
        let document = Document::new("Blood panel", "lab_report");
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["type"], "lab_report");
        assert_eq!(json["pages"], 1);
    }

    #[test]
    fn payload_round_trips() {
        let mut document = Document::new("X-ray", "imaging");
        document.tags = Some("chest,2026".to_string());
        let json = serde_json::to_string(&document).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, document);
    }
}

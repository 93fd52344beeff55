//! MemoryPatch - An explicit mutation for the owning store to apply
//!
//! Components never hold on to shared records. When a decision changes a
//! record they return a patch keyed by record id, and whoever owns the record
//! applies it under its own per-id serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::MemoryRecord;
use crate::domain::value_objects::Importance;

/// Set of field changes for one record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<Importance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub consolidate: bool,
    #[serde(default)]
    pub deprecate: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.importance.is_none()
            && self.confidence.is_none()
            && !self.consolidate
            && !self.deprecate
            && self.metadata.is_empty()
    }

    pub fn deprecation(reason: impl Into<String>) -> Self {
        let mut patch = Self {
            deprecate: true,
            ..Self::default()
        };
        patch.metadata.insert(
            "deprecation_reason".to_string(),
            serde_json::Value::String(reason.into()),
        );
        patch
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Apply to a record. Record invariants win over patch values, so a
    /// deprecated record stays MINIMAL whatever importance the patch carries.
    pub fn apply(&self, record: &mut MemoryRecord) {
        if self.consolidate {
            record.consolidate();
        }
        if let Some(importance) = self.importance {
            record.set_importance(importance);
        }
        if let Some(confidence) = self.confidence {
            record.set_confidence(confidence);
        }
        for (key, value) in &self.metadata {
            record.metadata.insert(key.clone(), value.clone());
        }
        if self.deprecate {
            record.deprecate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_respects_deprecation() {
        let mut record = MemoryRecord::new("u", "x");
        let patch = MemoryPatch {
            importance: Some(Importance::Critical),
            deprecate: true,
            ..MemoryPatch::default()
        };
        patch.apply(&mut record);
        assert!(record.is_deprecated());
        assert_eq!(record.importance(), Importance::Minimal);
    }

    #[test]
    fn test_apply_sets_scores_and_metadata() {
        let mut record = MemoryRecord::new("u", "x");
        let patch = MemoryPatch {
            importance: Some(Importance::High),
            confidence: Some(0.85),
            ..MemoryPatch::default()
        }
        .with_metadata("scored_by", serde_json::json!("rules"));
        patch.apply(&mut record);
        assert_eq!(record.importance(), Importance::High);
        assert_eq!(record.confidence(), 0.85);
        assert_eq!(record.metadata["scored_by"], "rules");
    }

    #[test]
    fn test_empty_patch() {
        assert!(MemoryPatch::default().is_empty());
        assert!(!MemoryPatch::deprecation("stale").is_empty());
    }
}

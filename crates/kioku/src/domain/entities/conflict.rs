//! Conflict & Resolution - Transient results of a detection cycle

use serde::{Deserialize, Serialize};

use super::MemoryRecord;
use crate::domain::value_objects::{ConflictType, DecisionSource, ResolutionStrategy};

/// Overlap between an incoming memory and one already stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// The incoming memory ("first")
    pub new_memory: MemoryRecord,
    /// The stored memory it collides with ("second")
    pub existing_memory: MemoryRecord,
    pub conflict_type: ConflictType,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub reason: String,
    /// Similarity that triggered detection
    pub similarity: f64,
}

/// How a conflict should be reconciled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub strategy: ResolutionStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_content: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub source: DecisionSource,
}

impl Resolution {
    pub fn new(strategy: ResolutionStrategy, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            merged_content: None,
            reason: reason.into(),
            source: DecisionSource::Rules,
        }
    }

    pub fn merged(content: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            strategy: ResolutionStrategy::Merge,
            merged_content: Some(content.into()),
            reason: reason.into(),
            source: DecisionSource::Rules,
        }
    }

    pub fn with_source(mut self, source: DecisionSource) -> Self {
        self.source = source;
        self
    }

    /// Ids of the records that survive this resolution
    pub fn surviving_ids<'a>(&self, conflict: &'a Conflict) -> Vec<&'a str> {
        match self.strategy {
            ResolutionStrategy::KeepFirst => vec![conflict.new_memory.id()],
            ResolutionStrategy::KeepSecond => vec![conflict.existing_memory.id()],
            ResolutionStrategy::KeepBoth => {
                vec![conflict.new_memory.id(), conflict.existing_memory.id()]
            }
            ResolutionStrategy::Merge | ResolutionStrategy::DeleteBoth => Vec::new(),
        }
    }
}

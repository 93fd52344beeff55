//! ConflictType - Nature of an overlap between two memories

use serde::{Deserialize, Serialize};

/// Kind of conflict between a new memory and an existing one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    #[default]
    None,
    /// One memory asserts what the other denies
    Contradiction,
    /// Same fact with different concrete values
    FactualConflict,
    /// Opposing preferences about the same subject
    PreferenceConflict,
    /// Competing claims about the same point in time
    TemporalConflict,
    /// Near-duplicate information
    Redundancy,
}

impl ConflictType {
    /// Confidence added on top of the similarity term
    pub fn confidence_bonus(&self) -> f64 {
        match self {
            ConflictType::None => 0.0,
            ConflictType::Contradiction => 0.4,
            ConflictType::FactualConflict => 0.3,
            ConflictType::PreferenceConflict => 0.4,
            ConflictType::TemporalConflict => 0.3,
            ConflictType::Redundancy => 0.5,
        }
    }

    pub fn is_conflict(&self) -> bool {
        !matches!(self, ConflictType::None)
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::None => write!(f, "none"),
            ConflictType::Contradiction => write!(f, "contradiction"),
            ConflictType::FactualConflict => write!(f, "factual_conflict"),
            ConflictType::PreferenceConflict => write!(f, "preference_conflict"),
            ConflictType::TemporalConflict => write!(f, "temporal_conflict"),
            ConflictType::Redundancy => write!(f, "redundancy"),
        }
    }
}

//! ForgettingStrategy - How aggressively a memory class decays

use serde::{Deserialize, Serialize};

use super::MemoryType;

/// Threshold used by aggressive forgetting
pub const AGGRESSIVE_RETENTION_THRESHOLD: f64 = 0.4;
/// Threshold used by conservative forgetting
pub const CONSERVATIVE_RETENTION_THRESHOLD: f64 = 0.1;

/// Forgetting strategy applied to a record's retention score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ForgettingStrategy {
    NeverForget,
    #[default]
    GradualDecay,
    AggressiveForgetting,
    ConservativeForgetting,
    ImportanceBased,
    AccessBased,
}

impl ForgettingStrategy {
    /// Built-in strategy for each memory type
    pub fn default_for(memory_type: MemoryType) -> Self {
        match memory_type {
            MemoryType::Semantic => ForgettingStrategy::GradualDecay,
            MemoryType::Episodic => ForgettingStrategy::AccessBased,
            MemoryType::Procedural => ForgettingStrategy::ConservativeForgetting,
            MemoryType::Factual => ForgettingStrategy::ImportanceBased,
            MemoryType::Contextual => ForgettingStrategy::AggressiveForgetting,
            MemoryType::Preference => ForgettingStrategy::ConservativeForgetting,
            MemoryType::Relationship => ForgettingStrategy::ConservativeForgetting,
            MemoryType::Temporal => ForgettingStrategy::AggressiveForgetting,
        }
    }

    /// Retention threshold below which a record is forgotten.
    ///
    /// `None` means the strategy never forgets.
    pub fn retention_threshold(
        &self,
        base: f64,
        importance: f64,
        access_count: u32,
    ) -> Option<f64> {
        match self {
            ForgettingStrategy::NeverForget => None,
            ForgettingStrategy::GradualDecay => Some(base),
            ForgettingStrategy::AggressiveForgetting => Some(AGGRESSIVE_RETENTION_THRESHOLD),
            ForgettingStrategy::ConservativeForgetting => Some(CONSERVATIVE_RETENTION_THRESHOLD),
            ForgettingStrategy::ImportanceBased => Some(base * (6.0 - importance) / 5.0),
            ForgettingStrategy::AccessBased => {
                if access_count > 5 {
                    Some(base / 2.0)
                } else {
                    Some(base)
                }
            }
        }
    }
}

impl std::fmt::Display for ForgettingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForgettingStrategy::NeverForget => write!(f, "never_forget"),
            ForgettingStrategy::GradualDecay => write!(f, "gradual_decay"),
            ForgettingStrategy::AggressiveForgetting => write!(f, "aggressive_forgetting"),
            ForgettingStrategy::ConservativeForgetting => write!(f, "conservative_forgetting"),
            ForgettingStrategy::ImportanceBased => write!(f, "importance_based"),
            ForgettingStrategy::AccessBased => write!(f, "access_based"),
        }
    }
}

//! DecisionSource - which engine produced a result

use serde::{Deserialize, Serialize};

/// Engine that produced a decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Deterministic rule engine
    #[default]
    Rules,
    /// Language-model-backed strategy
    Model,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionSource::Rules => write!(f, "rules"),
            DecisionSource::Model => write!(f, "model"),
        }
    }
}

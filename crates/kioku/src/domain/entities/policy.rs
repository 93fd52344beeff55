//! ForgettingPolicy - When a class of memories may be forgotten

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Importance, MemoryType};

/// Forgetting policy, either a built-in per-type default or a custom override
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForgettingPolicy {
    /// Disabled policies never forget anything
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Decay rate passed to the forgetting curve
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Records more important than this are never forgotten
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: Importance,
    /// Records older than this are forgotten without consulting the curve
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Records accessed at least this often are retained
    #[serde(default = "default_min_access_count")]
    pub min_access_count: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_decay_rate() -> f64 {
    0.1
}

fn default_importance_threshold() -> Importance {
    Importance::Medium
}

fn default_max_age_days() -> u32 {
    365
}

fn default_min_access_count() -> u32 {
    10
}

impl Default for ForgettingPolicy {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            decay_rate: default_decay_rate(),
            importance_threshold: default_importance_threshold(),
            max_age_days: default_max_age_days(),
            min_access_count: default_min_access_count(),
        }
    }
}

impl ForgettingPolicy {
    /// Built-in policy for a memory type
    pub fn default_for(memory_type: MemoryType) -> Self {
        let base = Self::default();
        match memory_type {
            MemoryType::Contextual => Self {
                decay_rate: 0.2,
                max_age_days: 30,
                min_access_count: 5,
                ..base
            },
            MemoryType::Temporal => Self {
                decay_rate: 0.15,
                max_age_days: 90,
                ..base
            },
            MemoryType::Episodic => Self {
                max_age_days: 180,
                ..base
            },
            MemoryType::Procedural | MemoryType::Relationship => Self {
                decay_rate: 0.05,
                importance_threshold: Importance::Low,
                max_age_days: 730,
                ..base
            },
            MemoryType::Preference => Self {
                decay_rate: 0.05,
                max_age_days: 730,
                ..base
            },
            MemoryType::Semantic | MemoryType::Factual => base,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

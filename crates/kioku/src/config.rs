//! Engine configuration
//!
//! Thresholds and curve constants accepted by the component constructors.
//! Every field has a default, so partial TOML/JSON documents deserialize.
//! `from_env` reads `KIOKU_*` variables (after loading a `.env` file if one
//! exists).

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ForgettingPolicy, ForgettingStrategy};

/// Conflict detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictConfig {
    /// Minimum similarity for a candidate to be analysed
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,
    /// Minimum confidence for a conflict to be reported
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Similarity at which two memories count as near-duplicates
    #[serde(default = "default_redundancy_threshold")]
    pub redundancy_threshold: f64,
}

fn default_semantic_threshold() -> f64 {
    0.85
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_redundancy_threshold() -> f64 {
    0.95
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: default_semantic_threshold(),
            confidence_threshold: default_confidence_threshold(),
            redundancy_threshold: default_redundancy_threshold(),
        }
    }
}

/// Forgetting curve constants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForgettingConfig {
    /// Weight of the slow (long-term) retention component
    #[serde(default = "default_curve_base")]
    pub curve_base: f64,
    /// Time constant of the fast (short-term) retention component
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Base retention threshold
    #[serde(default = "default_retention_threshold")]
    pub retention_threshold: f64,
    /// Custom policy overriding the per-type defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ForgettingPolicy>,
    /// Strategy overriding the per-type defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ForgettingStrategy>,
}

fn default_curve_base() -> f64 {
    0.5
}

fn default_decay_rate() -> f64 {
    0.1
}

fn default_retention_threshold() -> f64 {
    0.2
}

impl Default for ForgettingConfig {
    fn default() -> Self {
        Self {
            curve_base: default_curve_base(),
            decay_rate: default_decay_rate(),
            retention_threshold: default_retention_threshold(),
            policy: None,
            strategy: None,
        }
    }
}

/// Merge and consolidation thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeConfig {
    /// Jaccard overlap at which records are grouped for consolidation
    #[serde(default = "default_consolidation_threshold")]
    pub consolidation_threshold: f64,
    /// Jaccard overlap above which an update replaces instead of appends
    #[serde(default = "default_replace_threshold")]
    pub replace_threshold: f64,
}

fn default_consolidation_threshold() -> f64 {
    0.8
}

fn default_replace_threshold() -> f64 {
    0.8
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            consolidation_threshold: default_consolidation_threshold(),
            replace_threshold: default_replace_threshold(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub conflict: ConflictConfig,
    #[serde(default)]
    pub forgetting: ForgettingConfig,
    #[serde(default)]
    pub merge: MergeConfig,
}

impl EngineConfig {
    /// Load from the process environment (and `.env`), starting from defaults
    pub fn from_env() -> Result<Self, DomainError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let read = |key: &str, target: &mut f64| -> Result<(), DomainError> {
            if let Some(raw) = lookup(key) {
                *target = raw.trim().parse::<f64>().map_err(|_| {
                    DomainError::Validation(format!("{} must be a number, got '{}'", key, raw))
                })?;
            }
            Ok(())
        };

        read("KIOKU_SEMANTIC_THRESHOLD", &mut config.conflict.semantic_threshold)?;
        read(
            "KIOKU_CONFLICT_CONFIDENCE_THRESHOLD",
            &mut config.conflict.confidence_threshold,
        )?;
        read(
            "KIOKU_REDUNDANCY_THRESHOLD",
            &mut config.conflict.redundancy_threshold,
        )?;
        read("KIOKU_FORGETTING_CURVE_BASE", &mut config.forgetting.curve_base)?;
        read("KIOKU_FORGETTING_DECAY_RATE", &mut config.forgetting.decay_rate)?;
        read(
            "KIOKU_RETENTION_THRESHOLD",
            &mut config.forgetting.retention_threshold,
        )?;
        read(
            "KIOKU_CONSOLIDATION_THRESHOLD",
            &mut config.merge.consolidation_threshold,
        )?;

        if let Some(raw) = lookup("KIOKU_FORGETTING_STRATEGY") {
            let strategy = serde_json::from_value(serde_json::Value::String(
                raw.trim().to_lowercase(),
            ))
            .map_err(|_| {
                DomainError::Validation(format!("Unknown forgetting strategy: {}", raw))
            })?;
            config.forgetting.strategy = Some(strategy);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> Result<(), DomainError> {
        let unit = [
            ("conflict.semantic_threshold", self.conflict.semantic_threshold),
            ("conflict.confidence_threshold", self.conflict.confidence_threshold),
            ("conflict.redundancy_threshold", self.conflict.redundancy_threshold),
            ("forgetting.curve_base", self.forgetting.curve_base),
            ("forgetting.retention_threshold", self.forgetting.retention_threshold),
            ("merge.consolidation_threshold", self.merge.consolidation_threshold),
            ("merge.replace_threshold", self.merge.replace_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(DomainError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.forgetting.decay_rate <= 0.0 || !self.forgetting.decay_rate.is_finite() {
            return Err(DomainError::Validation(format!(
                "forgetting.decay_rate must be positive, got {}",
                self.forgetting.decay_rate
            )));
        }
        if let Some(policy) = &self.forgetting.policy {
            if policy.decay_rate <= 0.0 {
                return Err(DomainError::Validation(format!(
                    "forgetting.policy.decay_rate must be positive, got {}",
                    policy.decay_rate
                )));
            }
        }
        Ok(())
    }
}

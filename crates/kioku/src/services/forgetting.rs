//! Forgetting Manager - decay scoring, deprecation and pruning
//!
//! Memory strength grows with importance, use, confidence, links and
//! consolidation. Retention combines a slow component (exponential in days
//! since access and days since creation, scaled by strength) with a fast
//! component governed by the curve's decay rate. A record is forgotten when
//! its retention falls below the threshold of its forgetting strategy.
//!
//! Everything here is pure CPU work over the given records, so the API is
//! synchronous.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ForgettingConfig;
use crate::domain::{
    ForgettingPolicy, ForgettingStrategy, Importance, MemoryPatch, MemoryRecord, MemoryType,
    PruneStrategy,
};

/// Records younger than this are never forgotten
const MIN_AGE_DAYS: f64 = 1.0;
/// Policy decay rate at which the curve runs at its nominal pace
const NOMINAL_POLICY_DECAY_RATE: f64 = 0.1;
/// Access count above which reinforcement promotes to HIGH
const REINFORCE_PROMOTION_ACCESSES: u32 = 10;

/// Outcome of evaluating one record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgettingDecision {
    pub memory_id: String,
    pub forget: bool,
    pub reason: String,
    /// Forgettability in [0, 1]
    pub decay_score: f64,
    /// 1 - decay_score
    pub retention: f64,
    pub strategy: ForgettingStrategy,
}

#[derive(Debug, Clone, Default)]
pub struct ForgettingManager {
    config: ForgettingConfig,
}

impl ForgettingManager {
    pub fn new(config: ForgettingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForgettingConfig {
        &self.config
    }

    /// Custom policy when configured, else the built-in one for the type
    pub fn policy_for(&self, memory_type: MemoryType) -> ForgettingPolicy {
        self.config
            .policy
            .clone()
            .unwrap_or_else(|| ForgettingPolicy::default_for(memory_type))
    }

    pub fn strategy_for(&self, memory_type: MemoryType) -> ForgettingStrategy {
        self.config
            .strategy
            .unwrap_or_else(|| ForgettingStrategy::default_for(memory_type))
    }

    /// Memory strength: the time constant of the slow retention component
    pub fn strength(record: &MemoryRecord) -> f64 {
        let mut strength = record.importance().score()
            + ((record.access_count() as f64) + 1.0).ln()
            + 2.0 * record.confidence()
            + (0.2 * record.related.len() as f64).min(2.0);
        if record.is_consolidated() {
            strength += 3.0;
        }
        strength
    }

    pub fn decay_score(&self, record: &MemoryRecord) -> f64 {
        self.decay_score_at(record, Utc::now())
    }

    /// Forgettability in [0, 1]; never decreases as days since access grow
    pub fn decay_score_at(&self, record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
        let policy = self.policy_for(record.memory_type());
        let pace = policy.decay_rate.max(f64::EPSILON) / NOMINAL_POLICY_DECAY_RATE;
        let strength = Self::strength(record);

        let time_decay = (-pace * record.days_since_access(now) / strength).exp();
        let age_decay = (-pace * record.age_days(now) / (2.0 * strength)).exp();
        let combined = (time_decay + age_decay) / 2.0;

        let base = self.config.curve_base;
        let fast = (-(1.0 - combined) / self.config.decay_rate.max(f64::EPSILON)).exp();
        let retention = base * combined + (1.0 - base) * fast;

        (1.0 - retention).clamp(0.0, 1.0)
    }

    pub fn evaluate(&self, record: &MemoryRecord) -> ForgettingDecision {
        self.evaluate_at(record, Utc::now())
    }

    pub fn evaluate_at(&self, record: &MemoryRecord, now: DateTime<Utc>) -> ForgettingDecision {
        let memory_type = record.memory_type();
        let policy = self.policy_for(memory_type);
        let strategy = self.strategy_for(memory_type);
        let decay_score = self.decay_score_at(record, now);
        let retention = 1.0 - decay_score;

        let decide = |forget: bool, reason: String| ForgettingDecision {
            memory_id: record.id().to_string(),
            forget,
            reason,
            decay_score,
            retention,
            strategy,
        };

        if self.config.policy.as_ref().is_some_and(|p| !p.enabled) {
            return decide(false, "forgetting disabled by policy".to_string());
        }

        if record.importance() > policy.importance_threshold {
            return decide(
                false,
                format!("importance above {}", policy.importance_threshold),
            );
        }
        if record.access_count() >= policy.min_access_count {
            return decide(
                false,
                format!("accessed {} times", record.access_count()),
            );
        }
        let age = record.age_days(now);
        if age < MIN_AGE_DAYS {
            return decide(false, "younger than a day".to_string());
        }

        if record.importance() == Importance::Critical || record.is_consolidated() {
            return decide(false, "critical or consolidated".to_string());
        }

        if record.is_deprecated() {
            return decide(true, "already deprecated".to_string());
        }
        if record.is_expired(now) {
            return decide(true, "expired".to_string());
        }
        if age > policy.max_age_days as f64 {
            return decide(
                true,
                format!("older than {} days", policy.max_age_days),
            );
        }

        match strategy.retention_threshold(
            self.config.retention_threshold,
            record.importance().score(),
            record.access_count(),
        ) {
            None => decide(false, format!("{} strategy", strategy)),
            Some(threshold) if retention < threshold => decide(
                true,
                format!(
                    "retention {:.3} below {:.3} ({})",
                    retention, threshold, strategy
                ),
            ),
            Some(threshold) => decide(
                false,
                format!(
                    "retention {:.3} at or above {:.3} ({})",
                    retention, threshold, strategy
                ),
            ),
        }
    }

    pub fn evaluate_all(&self, records: &[MemoryRecord]) -> Vec<ForgettingDecision> {
        let now = Utc::now();
        records.iter().map(|r| self.evaluate_at(r, now)).collect()
    }

    /// Deprecation patches for every live record that should be forgotten
    pub fn forgetting_pass(&self, records: &[MemoryRecord]) -> Vec<(String, MemoryPatch)> {
        self.forgetting_pass_at(records, Utc::now())
    }

    pub fn forgetting_pass_at(
        &self,
        records: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Vec<(String, MemoryPatch)> {
        let patches: Vec<(String, MemoryPatch)> = records
            .iter()
            .filter(|r| !r.is_deprecated())
            .map(|r| self.evaluate_at(r, now))
            .filter(|d| d.forget)
            .map(|d| {
                let patch = MemoryPatch::deprecation(d.reason.clone())
                    .with_metadata("decay_score", serde_json::json!(d.decay_score));
                (d.memory_id, patch)
            })
            .collect();

        tracing::info!(
            evaluated = records.len(),
            deprecated = patches.len(),
            "🧹 Forgetting pass completed"
        );
        patches
    }

    /// Keep at most `target` records. CRITICAL records rank ahead of
    /// everything else; the strategy orders the rest. Survivors keep their
    /// input order.
    pub fn prune(
        &self,
        records: &[MemoryRecord],
        target: usize,
        strategy: PruneStrategy,
    ) -> Vec<MemoryRecord> {
        self.prune_at(records, target, strategy, Utc::now())
    }

    pub fn prune_at(
        &self,
        records: &[MemoryRecord],
        target: usize,
        strategy: PruneStrategy,
        now: DateTime<Utc>,
    ) -> Vec<MemoryRecord> {
        if records.len() <= target {
            return records.to_vec();
        }

        let max_access = records
            .iter()
            .map(|r| r.access_count())
            .max()
            .unwrap_or(1)
            .max(1) as f64;
        let keep_score = |r: &MemoryRecord| -> f64 {
            match strategy {
                PruneStrategy::LeastRecentlyUsed => r.last_accessed_at.timestamp_millis() as f64,
                PruneStrategy::LeastImportant => r.importance().score(),
                PruneStrategy::Oldest => r.created_at.timestamp_millis() as f64,
                PruneStrategy::HighestDecay => -self.decay_score_at(r, now),
                PruneStrategy::Balanced => {
                    let recency = 1.0 / (1.0 + r.days_since_access(now));
                    let access = r.access_count() as f64 / max_access;
                    0.3 * r.importance().score() / 5.0 + 0.2 * recency + 0.2 * access
                        - 0.3 * self.decay_score_at(r, now)
                }
            }
        };

        let mut ranked: Vec<(usize, bool, f64)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, r.importance() == Importance::Critical, keep_score(r)))
            .collect();
        ranked.sort_by(|(ia, ca, sa), (ib, cb, sb)| {
            cb.cmp(ca)
                .then_with(|| sb.partial_cmp(sa).unwrap_or(Ordering::Equal))
                .then_with(|| records[*ia].id().cmp(records[*ib].id()))
        });

        let mut survivors: Vec<usize> = ranked.iter().take(target).map(|(i, _, _)| *i).collect();
        survivors.sort_unstable();

        tracing::info!(
            input = records.len(),
            target,
            strategy = %strategy,
            "✂️ Prune completed"
        );
        survivors.into_iter().map(|i| records[i].clone()).collect()
    }

    /// Strengthen a record that was just used
    pub fn reinforce(&self, record: &mut MemoryRecord) {
        let now = Utc::now();
        record.record_access_at(now);
        record.set_confidence(record.confidence() + 0.1);
        if record.access_count() > REINFORCE_PROMOTION_ACCESSES {
            record.set_importance(record.importance().max(Importance::High));
        }

        let count = record
            .metadata
            .get("reinforcement_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
            + 1;
        record
            .metadata
            .insert("reinforcement_count".to_string(), serde_json::json!(count));
        record.metadata.insert(
            "last_reinforced_at".to_string(),
            serde_json::json!(now.to_rfc3339()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn aged(
        content: &str,
        memory_type: MemoryType,
        importance: Importance,
        days: i64,
    ) -> MemoryRecord {
        let now = Utc::now();
        let mut record = MemoryRecord::new("u", content)
            .with_type(memory_type)
            .with_importance(importance);
        record.created_at = now - Duration::days(days);
        record.last_accessed_at = now - Duration::days(days);
        record
    }

    #[test]
    fn test_decay_is_monotone_in_days_since_access() {
        let manager = ForgettingManager::default();
        let now = Utc::now();
        let mut record = MemoryRecord::new("u", "x").with_importance(Importance::High);
        record.created_at = now - Duration::days(500);

        let mut previous = -1.0;
        for days in 0..=500 {
            record.last_accessed_at = now - Duration::days(days);
            let decay = manager.decay_score_at(&record, now);
            assert!((0.0..=1.0).contains(&decay));
            assert!(decay >= previous, "day {days}: {decay} < {previous}");
            previous = decay;
        }
    }

    #[test]
    fn test_stronger_records_decay_slower() {
        let manager = ForgettingManager::default();
        let now = Utc::now();
        let weak = aged("x", MemoryType::Semantic, Importance::Low, 5);
        let mut strong = aged("x", MemoryType::Semantic, Importance::High, 5);
        strong.consolidate();
        assert!(manager.decay_score_at(&strong, now) < manager.decay_score_at(&weak, now));
    }

    #[test]
    fn test_critical_consolidated_is_never_forgotten() {
        let now = Utc::now();
        let mut record = aged("x", MemoryType::Contextual, Importance::Critical, 5000);
        record.consolidate();
        record = record.with_expiry(now - Duration::days(1));

        let configs = [
            ForgettingConfig::default(),
            ForgettingConfig {
                policy: Some(ForgettingPolicy {
                    importance_threshold: Importance::Critical,
                    max_age_days: 1,
                    min_access_count: 1000,
                    ..ForgettingPolicy::default()
                }),
                strategy: Some(ForgettingStrategy::AggressiveForgetting),
                ..ForgettingConfig::default()
            },
            ForgettingConfig {
                policy: Some(ForgettingPolicy::disabled()),
                ..ForgettingConfig::default()
            },
        ];
        for config in configs {
            let manager = ForgettingManager::new(config);
            assert!(!manager.evaluate_at(&record, now).forget);
            assert!(manager.forgetting_pass_at(std::slice::from_ref(&record), now).is_empty());
        }
    }

    #[test]
    fn test_disabled_policy_keeps_everything() {
        let now = Utc::now();
        let mut record = aged("x", MemoryType::Contextual, Importance::Minimal, 900);
        record.deprecate();
        let manager = ForgettingManager::new(ForgettingConfig {
            policy: Some(ForgettingPolicy::disabled()),
            ..ForgettingConfig::default()
        });
        assert!(!manager.evaluate_at(&record, now).forget);
    }

    #[test]
    fn test_floors_keep_records() {
        let now = Utc::now();
        let manager = ForgettingManager::default();

        let important = aged("x", MemoryType::Semantic, Importance::High, 900);
        assert!(!manager.evaluate_at(&important, now).forget);

        let used = aged("x", MemoryType::Semantic, Importance::Low, 900).with_access_count(10);
        assert!(!manager.evaluate_at(&used, now).forget);

        let young = aged("x", MemoryType::Contextual, Importance::Minimal, 0).with_expiry(now);
        assert!(!manager.evaluate_at(&young, now).forget);
    }

    #[test]
    fn test_deprecated_expired_and_old_are_forgotten() {
        let now = Utc::now();
        let manager = ForgettingManager::default();

        let mut deprecated = aged("x", MemoryType::Semantic, Importance::Low, 2);
        deprecated.deprecate();
        assert!(manager.evaluate_at(&deprecated, now).forget);
        assert!(manager.evaluate(&deprecated).forget);

        let expired = aged("x", MemoryType::Procedural, Importance::Low, 2)
            .with_expiry(now - Duration::hours(1));
        let decision = manager.evaluate_at(&expired, now);
        assert!(decision.forget);
        assert_eq!(decision.reason, "expired");

        let old = aged("x", MemoryType::Semantic, Importance::Low, 400);
        assert_eq!(manager.evaluate_at(&old, now).reason, "older than 365 days");
    }

    #[test]
    fn test_strategy_thresholds_on_retention() {
        let now = Utc::now();
        let manager = ForgettingManager::default();

        let recent = aged("x", MemoryType::Semantic, Importance::Low, 2);
        let decision = manager.evaluate_at(&recent, now);
        assert_eq!(decision.strategy, ForgettingStrategy::GradualDecay);
        assert!(!decision.forget, "{}", decision.reason);

        let stale = aged("x", MemoryType::Semantic, Importance::Low, 30);
        assert!(manager.evaluate_at(&stale, now).forget);

        let contextual = aged("x", MemoryType::Contextual, Importance::Low, 2);
        let decision = manager.evaluate_at(&contextual, now);
        assert_eq!(decision.strategy, ForgettingStrategy::AggressiveForgetting);
        assert!(decision.forget);

        let never = ForgettingManager::new(ForgettingConfig {
            strategy: Some(ForgettingStrategy::NeverForget),
            ..ForgettingConfig::default()
        });
        assert!(!never.evaluate_at(&stale, now).forget);
    }

    #[test]
    fn test_forgetting_pass_emits_deprecation_patches() {
        let now = Utc::now();
        let manager = ForgettingManager::default();
        let stale = aged("x", MemoryType::Semantic, Importance::Low, 30).with_id("stale");
        let fresh = aged("x", MemoryType::Semantic, Importance::Low, 0).with_id("fresh");
        let mut gone = aged("x", MemoryType::Semantic, Importance::Low, 30).with_id("gone");
        gone.deprecate();

        let patches = manager.forgetting_pass_at(&[stale.clone(), fresh, gone], now);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, "stale");
        assert!(patches[0].1.deprecate);

        let mut record = stale;
        patches[0].1.apply(&mut record);
        assert!(record.is_deprecated());
        assert!(record.metadata.contains_key("deprecation_reason"));
    }

    #[test]
    fn test_prune_least_important() {
        let manager = ForgettingManager::default();
        let records: Vec<MemoryRecord> = [
            Importance::Low,
            Importance::Critical,
            Importance::Minimal,
            Importance::High,
            Importance::Medium,
        ]
        .into_iter()
        .map(|i| MemoryRecord::new("u", i.as_str()).with_id(i.as_str()).with_importance(i))
        .collect();

        let kept = manager.prune(&records, 3, PruneStrategy::LeastImportant);
        let ids: Vec<&str> = kept.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["critical", "high", "medium"]);
    }

    #[test]
    fn test_prune_caps_and_keeps_critical() {
        let manager = ForgettingManager::default();
        let now = Utc::now();
        let mut records = Vec::new();
        for i in 0..8 {
            let mut r = MemoryRecord::new("u", format!("memory {i}"))
                .with_id(format!("m{i}"))
                .with_access_count(50 - i);
            r.last_accessed_at = now - Duration::days(i as i64);
            records.push(r);
        }
        let mut critical = MemoryRecord::new("u", "stale but critical")
            .with_id("crit")
            .with_importance(Importance::Critical);
        critical.created_at = now - Duration::days(900);
        critical.last_accessed_at = now - Duration::days(900);
        records.push(critical);

        for strategy in [
            PruneStrategy::LeastRecentlyUsed,
            PruneStrategy::LeastImportant,
            PruneStrategy::Oldest,
            PruneStrategy::HighestDecay,
            PruneStrategy::Balanced,
        ] {
            for target in [1, 4, 9, 20] {
                let kept = manager.prune_at(&records, target, strategy, now);
                assert_eq!(kept.len(), target.min(records.len()));
                assert!(kept.iter().any(|r| r.id() == "crit"), "{strategy} {target}");
            }
        }
        let kept = manager.prune_at(&records, 0, PruneStrategy::Balanced, now);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_reinforce() {
        let manager = ForgettingManager::default();
        let mut record = MemoryRecord::new("u", "x")
            .with_importance(Importance::Low)
            .with_confidence(0.95)
            .with_access_count(10);
        manager.reinforce(&mut record);
        assert_eq!(record.access_count(), 11);
        assert_eq!(record.confidence(), 1.0);
        assert_eq!(record.importance(), Importance::High);
        assert_eq!(record.metadata["reinforcement_count"], 1);

        manager.reinforce(&mut record);
        assert_eq!(record.metadata["reinforcement_count"], 2);
        assert!(record.metadata.contains_key("last_reinforced_at"));
    }
}

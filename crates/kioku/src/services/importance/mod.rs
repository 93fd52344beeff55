//! Importance Scorer - 1-5 importance and a confidence for a memory
//!
//! - [`RuleImportanceScorer`]: 3.0 baseline plus six additive factors
//! - [`LlmImportanceScorer`]: structured `{score, confidence, reasoning}` reply

mod llm;
mod rules;

pub use llm::*;
pub use rules::*;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::domain::{
    DecisionSource, DomainError, Importance, MemoryContext, MemoryPatch, MemoryRecord,
};
use crate::services::fallback::{try_primary, WithFallback};

/// Lowest and highest total score
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;
/// Confidence bounds for scores
pub const MIN_SCORE_CONFIDENCE: f64 = 0.1;
pub const MAX_SCORE_CONFIDENCE: f64 = 1.0;

/// Per-factor contributions added to the baseline
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub content: f64,
    pub type_weight: f64,
    pub usage: f64,
    pub temporal: f64,
    pub context: f64,
    pub relationships: f64,
}

impl ScoreBreakdown {
    pub fn factors(&self) -> [(&'static str, f64); 6] {
        [
            ("content", self.content),
            ("type", self.type_weight),
            ("usage", self.usage),
            ("temporal", self.temporal),
            ("context", self.context),
            ("relationships", self.relationships),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.factors().iter().map(|(_, v)| v).sum()
    }
}

/// Result of scoring one memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceScore {
    /// Total score in [1, 5]
    pub total: f64,
    /// Confidence in [0.1, 1.0]
    pub confidence: f64,
    pub importance: Importance,
    pub breakdown: ScoreBreakdown,
    pub reasoning: String,
    pub source: DecisionSource,
}

impl ImportanceScore {
    /// Patch writing this score back onto its record
    pub fn to_patch(&self) -> MemoryPatch {
        MemoryPatch {
            importance: Some(self.importance),
            confidence: Some(self.confidence),
            ..MemoryPatch::default()
        }
        .with_metadata("importance_score", serde_json::json!(self.total))
        .with_metadata("scored_by", serde_json::json!(self.source.to_string()))
    }
}

/// Importance scoring strategy
#[async_trait]
pub trait ImportanceScorer: Send + Sync {
    async fn score(
        &self,
        record: &MemoryRecord,
        context: &MemoryContext,
    ) -> Result<ImportanceScore, DomainError>;

    /// Score every record concurrently and sort by total, highest first.
    /// Ties are ordered by id so the result does not depend on completion order.
    async fn rank(
        &self,
        records: &[MemoryRecord],
        context: &MemoryContext,
    ) -> Result<Vec<(MemoryRecord, ImportanceScore)>, DomainError> {
        let scores = join_all(records.iter().map(|r| self.score(r, context))).await;

        let mut ranked = records
            .iter()
            .cloned()
            .zip(scores)
            .map(|(record, score)| score.map(|s| (record, s)))
            .collect::<Result<Vec<_>, _>>()?;

        ranked.sort_by(|(a, sa), (b, sb)| {
            sb.total
                .total_cmp(&sa.total)
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(ranked)
    }

    /// Recompute a record's score and describe the change as a patch
    async fn refresh(&self, record: &MemoryRecord) -> Result<MemoryPatch, DomainError> {
        let score = self.score(record, &MemoryContext::new()).await?;
        Ok(score.to_patch())
    }
}

#[async_trait]
impl<P, F> ImportanceScorer for WithFallback<P, F>
where
    P: ImportanceScorer,
    F: ImportanceScorer,
{
    async fn score(
        &self,
        record: &MemoryRecord,
        context: &MemoryContext,
    ) -> Result<ImportanceScore, DomainError> {
        try_primary!(
            "importance",
            self.primary().score(record, context),
            self.fallback().score(record, context)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemoryType;

    #[tokio::test]
    async fn test_rank_orders_by_score_then_id() {
        let scorer = RuleImportanceScorer::new();
        let records = vec![
            MemoryRecord::new("u", "lol nice weather").with_id("b"),
            MemoryRecord::new("u", "Password for the bank: deadline to rotate is Friday")
                .with_id("a")
                .with_type(MemoryType::Procedural),
            MemoryRecord::new("u", "lol nice weather").with_id("a2"),
        ];
        let ranked = scorer.rank(&records, &MemoryContext::new()).await.unwrap();
        let ids: Vec<&str> = ranked.iter().map(|(r, _)| r.id()).collect();
        assert_eq!(ids, vec!["a", "a2", "b"]);
        assert!(ranked[0].1.total >= ranked[1].1.total);
    }

    #[tokio::test]
    async fn test_refresh_produces_patch() {
        let scorer = RuleImportanceScorer::new();
        let record = MemoryRecord::new("u", "Urgent: the deadline for the tax filing is April 15");
        let patch = scorer.refresh(&record).await.unwrap();
        assert!(patch.importance.is_some());
        assert!(patch.confidence.is_some());
        assert_eq!(patch.metadata["scored_by"], "rules");

        let mut updated = record.clone();
        patch.apply(&mut updated);
        assert!(updated.importance().is_high_priority());
    }
}

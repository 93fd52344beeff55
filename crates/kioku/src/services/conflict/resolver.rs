//! Conflict resolution strategies

use async_trait::async_trait;

use super::analysis::numbers_compatible;
use crate::domain::{Conflict, ConflictType, DomainError, Resolution, ResolutionStrategy};
use crate::services::fallback::{try_primary, WithFallback};
use crate::services::text::{join_statements, sentence_union};

/// Tag callers put on both records of an unresolved preference conflict
pub const NEEDS_REVIEW_TAG: &str = "needs_review";

/// Resolution strategy
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(&self, conflict: &Conflict) -> Result<Resolution, DomainError>;
}

/// Deterministic per-type resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleConflictResolver;

impl RuleConflictResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_conflict(&self, conflict: &Conflict) -> Resolution {
        let new = &conflict.new_memory;
        let existing = &conflict.existing_memory;

        match conflict.conflict_type {
            ConflictType::Redundancy => {
                if new.access_count() != existing.access_count() {
                    if new.access_count() > existing.access_count() {
                        Resolution::new(
                            ResolutionStrategy::KeepFirst,
                            "new memory is accessed more",
                        )
                    } else {
                        Resolution::new(
                            ResolutionStrategy::KeepSecond,
                            "existing memory is accessed more",
                        )
                    }
                } else {
                    keep_newer(conflict, "duplicates with equal access")
                }
            }
            ConflictType::Contradiction => {
                if new.is_consolidated() != existing.is_consolidated() {
                    if new.is_consolidated() {
                        Resolution::new(ResolutionStrategy::KeepFirst, "new memory is consolidated")
                    } else {
                        Resolution::new(
                            ResolutionStrategy::KeepSecond,
                            "existing memory is consolidated",
                        )
                    }
                } else if existing.importance() > new.importance() {
                    Resolution::new(
                        ResolutionStrategy::KeepSecond,
                        "existing memory is more important",
                    )
                } else {
                    Resolution::new(ResolutionStrategy::KeepFirst, "newer statement wins")
                }
            }
            ConflictType::PreferenceConflict => Resolution::new(
                ResolutionStrategy::KeepBoth,
                format!("preferences may be context-dependent; tag both {}", NEEDS_REVIEW_TAG),
            ),
            ConflictType::FactualConflict => {
                if numbers_compatible(new.content(), existing.content()) {
                    let merged = join_statements(sentence_union([
                        existing.content(),
                        new.content(),
                    ]));
                    Resolution::merged(merged, "compatible facts combined")
                } else {
                    keep_newer(conflict, "different values for the same fact, newer wins")
                }
            }
            ConflictType::TemporalConflict => Resolution::new(
                ResolutionStrategy::KeepBoth,
                "both schedules kept for the caller to confirm",
            ),
            ConflictType::None => Resolution::new(ResolutionStrategy::KeepBoth, "no conflict"),
        }
    }
}

fn keep_newer(conflict: &Conflict, reason: &str) -> Resolution {
    if conflict.existing_memory.created_at > conflict.new_memory.created_at {
        Resolution::new(
            ResolutionStrategy::KeepSecond,
            format!("{}: existing is newer", reason),
        )
    } else {
        Resolution::new(ResolutionStrategy::KeepFirst, format!("{}: new is newer", reason))
    }
}

#[async_trait]
impl ConflictResolver for RuleConflictResolver {
    async fn resolve(&self, conflict: &Conflict) -> Result<Resolution, DomainError> {
        Ok(self.resolve_conflict(conflict))
    }
}

#[async_trait]
impl<P, F> ConflictResolver for WithFallback<P, F>
where
    P: ConflictResolver,
    F: ConflictResolver,
{
    async fn resolve(&self, conflict: &Conflict) -> Result<Resolution, DomainError> {
        try_primary!(
            "conflict_resolver",
            self.primary().resolve(conflict),
            self.fallback().resolve(conflict)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Importance, MemoryRecord};
    use chrono::Duration;

    fn conflict(
        conflict_type: ConflictType,
        new: MemoryRecord,
        existing: MemoryRecord,
    ) -> Conflict {
        Conflict {
            new_memory: new,
            existing_memory: existing,
            conflict_type,
            confidence: 0.9,
            reason: String::new(),
            similarity: 0.9,
        }
    }

    #[test]
    fn test_redundancy_keeps_more_accessed_then_newer() {
        let resolver = RuleConflictResolver::new();
        let new = MemoryRecord::new("u", "a");
        let existing = MemoryRecord::new("u", "a").with_access_count(4);
        let r =
            resolver.resolve_conflict(&conflict(ConflictType::Redundancy, new.clone(), existing));
        assert_eq!(r.strategy, ResolutionStrategy::KeepSecond);

        let mut older = MemoryRecord::new("u", "a");
        older.created_at = new.created_at - Duration::days(3);
        let r = resolver.resolve_conflict(&conflict(ConflictType::Redundancy, new, older));
        assert_eq!(r.strategy, ResolutionStrategy::KeepFirst);
    }

    #[test]
    fn test_contradiction_prefers_consolidated_then_importance() {
        let resolver = RuleConflictResolver::new();
        let mut existing = MemoryRecord::new("u", "open");
        existing.consolidate();
        let r = resolver.resolve_conflict(&conflict(
            ConflictType::Contradiction,
            MemoryRecord::new("u", "not open"),
            existing,
        ));
        assert_eq!(r.strategy, ResolutionStrategy::KeepSecond);

        let r = resolver.resolve_conflict(&conflict(
            ConflictType::Contradiction,
            MemoryRecord::new("u", "not open").with_importance(Importance::Low),
            MemoryRecord::new("u", "open").with_importance(Importance::High),
        ));
        assert_eq!(r.strategy, ResolutionStrategy::KeepSecond);

        let r = resolver.resolve_conflict(&conflict(
            ConflictType::Contradiction,
            MemoryRecord::new("u", "not open"),
            MemoryRecord::new("u", "open"),
        ));
        assert_eq!(r.strategy, ResolutionStrategy::KeepFirst);
    }

    #[test]
    fn test_preference_and_temporal_keep_both() {
        let resolver = RuleConflictResolver::new();
        for t in [
            ConflictType::PreferenceConflict,
            ConflictType::TemporalConflict,
            ConflictType::None,
        ] {
            let r = resolver.resolve_conflict(&conflict(
                t,
                MemoryRecord::new("u", "a"),
                MemoryRecord::new("u", "b"),
            ));
            assert_eq!(r.strategy, ResolutionStrategy::KeepBoth);
        }
    }

    #[test]
    fn test_factual_merges_only_compatible_numbers() {
        let resolver = RuleConflictResolver::new();
        let r = resolver.resolve_conflict(&conflict(
            ConflictType::FactualConflict,
            MemoryRecord::new("u", "Alice was born in 1990. She has 2 kids."),
            MemoryRecord::new("u", "Alice was born in 1990."),
        ));
        assert_eq!(r.strategy, ResolutionStrategy::Merge);
        assert_eq!(
            r.merged_content.as_deref(),
            Some("Alice was born in 1990. She has 2 kids.")
        );

        let r = resolver.resolve_conflict(&conflict(
            ConflictType::FactualConflict,
            MemoryRecord::new("u", "Alice was born in 1990. She runs 5 km daily."),
            MemoryRecord::new("u", "Alice was born in 1990. She has 2 kids."),
        ));
        assert_eq!(r.strategy, ResolutionStrategy::Merge);
        assert_eq!(
            r.merged_content.as_deref(),
            Some("Alice was born in 1990. She has 2 kids. She runs 5 km daily.")
        );
    }

    #[test]
    fn test_factual_with_two_values_keeps_newer() {
        let resolver = RuleConflictResolver::new();
        let new = MemoryRecord::new("u", "Alice was born in 1990. She has 3 kids.");
        let mut existing = MemoryRecord::new("u", "Alice was born in 1990. She has 2 kids.");
        existing.created_at = new.created_at - Duration::days(1);
        let r = resolver.resolve_conflict(&conflict(
            ConflictType::FactualConflict,
            new.clone(),
            existing,
        ));
        assert_eq!(r.strategy, ResolutionStrategy::KeepFirst);
        assert!(r.merged_content.is_none());

        let mut newer = MemoryRecord::new("u", "The office has 40 desks");
        newer.created_at = new.created_at + Duration::days(1);
        let r = resolver.resolve_conflict(&conflict(
            ConflictType::FactualConflict,
            MemoryRecord::new("u", "The office has 45 desks"),
            newer,
        ));
        assert_eq!(r.strategy, ResolutionStrategy::KeepSecond);
    }
}

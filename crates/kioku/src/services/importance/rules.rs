//! Rule-engine importance scorer

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use super::{
    ImportanceScore, ImportanceScorer, ScoreBreakdown, MAX_SCORE, MAX_SCORE_CONFIDENCE, MIN_SCORE,
    MIN_SCORE_CONFIDENCE,
};
use crate::domain::{
    DecisionSource, DomainError, Importance, MemoryContext, MemoryRecord, MemoryType,
};
use crate::services::text::{count_matches, extract_numbers, find_dates, split_sentences};

const BASELINE: f64 = 3.0;
const BASE_CONFIDENCE: f64 = 0.7;

const HIGH_IMPORTANCE_KEYWORDS: &[&str] = &[
    "important", "critical", "urgent", "must", "never", "always", "remember", "essential",
    "priority", "required", "emergency", "allergic", "allergy", "medication", "crucial", "vital",
];
const LOW_IMPORTANCE_KEYWORDS: &[&str] = &[
    "maybe", "perhaps", "random", "trivial", "whatever", "casual", "somewhat", "minor",
    "unimportant", "kinda", "sorta", "idk",
];
const KEYWORD_CAP: f64 = 1.5;

static CONTENT_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        // deadlines
        (
            r"(?i)\b(deadline|due\s+(date|by|on|tomorrow|today)|must\s+be\s+(done|submitted|finished)\s+by)\b",
            2.0,
        ),
        // secrets and credentials
        (
            r"(?i)\b(password|passcode|pin\s+code|api[\s_-]?key|secret|access\s+token|ssn|social\s+security)\b",
            1.5,
        ),
        // meetings
        (r"(?i)\b(meeting|appointment|interview|conference|call\s+with)\b", 1.2),
        // money
        (
            r"(?i)[$€£]\s?\d[\d,]*(\.\d+)?|\b\d[\d,]*(\.\d+)?\s?(dollars|usd|eur|euros|pounds|gbp|yen)\b",
            1.0,
        ),
        (r"(?i)\b(work|job|project|client|boss|colleague|office|career)\b", 0.5),
        (
            r"(?i)\b(wife|husband|partner|mother|father|mom|dad|son|daughter|friend|family|sister|brother)\b",
            0.3,
        ),
        // small talk
        (r"(?i)\b(weather|lol|haha|tv\s+show|small\s+talk|chit-?chat|just\s+chatting)\b", -0.5),
    ]
    .into_iter()
    .map(|(p, w)| (Regex::new(p).unwrap(), w))
    .collect()
});

/// Additive weight per memory type
pub fn type_weight(memory_type: MemoryType) -> f64 {
    match memory_type {
        MemoryType::Procedural => 1.0,
        MemoryType::Temporal => 0.8,
        MemoryType::Factual => 0.6,
        MemoryType::Relationship => 0.5,
        MemoryType::Preference => 0.4,
        MemoryType::Episodic => 0.3,
        MemoryType::Contextual => 0.2,
        MemoryType::Semantic => 0.0,
    }
}

/// Deterministic multi-factor scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleImportanceScorer;

impl RuleImportanceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score against an explicit clock
    pub fn score_at(
        &self,
        record: &MemoryRecord,
        context: &MemoryContext,
        now: DateTime<Utc>,
    ) -> ImportanceScore {
        let breakdown = ScoreBreakdown {
            content: content_factor(record.content()),
            type_weight: type_weight(record.memory_type()),
            usage: usage_factor(record),
            temporal: temporal_factor(record, now),
            context: context_factor(context),
            relationships: relationship_factor(record),
        };

        let total = (BASELINE + breakdown.sum()).clamp(MIN_SCORE, MAX_SCORE);
        let confidence = confidence(record, &breakdown, now);
        let reasoning = format!(
            "rule-based: {}",
            breakdown
                .factors()
                .iter()
                .map(|(name, v)| format!("{} {:+.2}", name, v))
                .collect::<Vec<_>>()
                .join(", ")
        );

        ImportanceScore {
            total,
            confidence,
            importance: Importance::from_score(total),
            breakdown,
            reasoning,
            source: DecisionSource::Rules,
        }
    }
}

fn content_factor(content: &str) -> f64 {
    let high = count_matches(content, HIGH_IMPORTANCE_KEYWORDS) as f64;
    let low = count_matches(content, LOW_IMPORTANCE_KEYWORDS) as f64;
    let keywords = (0.3 * high - 0.2 * low).clamp(-KEYWORD_CAP, KEYWORD_CAP);

    let patterns: f64 = CONTENT_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(content))
        .map(|(_, w)| w)
        .sum();

    let chars = content.trim().chars().count();
    let length = if chars < 15 {
        -0.3
    } else if chars > 200 {
        0.3
    } else {
        0.0
    };

    let mut specificity = 0.0;
    if !extract_numbers(content).is_empty() {
        specificity += 0.1;
    }
    if has_proper_noun(content) {
        specificity += 0.1;
    }
    if !find_dates(content).is_empty() {
        specificity += 0.1;
    }

    keywords + patterns + length + specificity
}

/// A capitalized word that does not open its sentence
fn has_proper_noun(content: &str) -> bool {
    split_sentences(content).iter().any(|sentence| {
        sentence.split_whitespace().skip(1).any(|w| {
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            w != "I" && w.chars().next().is_some_and(|c| c.is_uppercase())
        })
    })
}

fn usage_factor(record: &MemoryRecord) -> f64 {
    let access = match record.access_count() {
        n if n >= 20 => 0.8,
        n if n >= 10 => 0.5,
        n if n >= 5 => 0.2,
        _ => 0.0,
    };
    let updates = (0.1 * record.update_count as f64).min(0.3);
    let consolidated = if record.is_consolidated() { 0.6 } else { 0.0 };
    access + updates + consolidated
}

fn temporal_factor(record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    let age = record.age_days(now);
    let idle = record.days_since_access(now);
    let mut factor = 0.0;

    if age < 1.0 {
        factor += 0.3;
    } else if age < 7.0 {
        factor += 0.1;
    } else if age > 365.0 {
        factor -= 0.5;
    }

    if idle < 1.0 {
        factor += 0.2;
    } else if idle > 30.0 {
        factor -= 0.3;
    }

    if record.expires_within(now, Duration::days(7)) {
        factor += 0.5;
    }
    factor
}

fn context_factor(context: &MemoryContext) -> f64 {
    let value = |key: &str| context.get(key).map(|v| v.trim().to_lowercase());
    let mut factor = 0.0;

    factor += match value("priority").as_deref() {
        Some("critical") => 1.5,
        Some("high") | Some("urgent") => 1.0,
        Some("low") => -0.5,
        _ => 0.0,
    };
    factor += match value("source").as_deref() {
        Some("user") | Some("explicit") => 0.3,
        Some("inferred") | Some("system") => -0.1,
        _ => 0.0,
    };
    factor += match value("category").as_deref() {
        Some("health") | Some("medical") | Some("security") | Some("finance") => 0.5,
        Some("work") => 0.3,
        _ => 0.0,
    };
    factor
}

fn relationship_factor(record: &MemoryRecord) -> f64 {
    let related = (0.1 * record.related.len() as f64).min(0.5);
    let entities = match record.entities.len() {
        0 => 0.0,
        1 | 2 => 0.1,
        _ => 0.2,
    };
    let tags = if record.tags.len() >= 3 { 0.1 } else { 0.0 };
    related + entities + tags
}

fn confidence(record: &MemoryRecord, breakdown: &ScoreBreakdown, now: DateTime<Utc>) -> f64 {
    let contributing = breakdown
        .factors()
        .iter()
        .filter(|(_, v)| v.abs() > 0.1)
        .count() as f64;

    let mut confidence = BASE_CONFIDENCE + 0.05 * contributing;
    if record.access_count() > 5 {
        confidence += 0.1;
    }
    if record.is_consolidated() {
        confidence += 0.15;
    }
    if record.age_days(now) > 365.0 {
        confidence -= 0.1;
    }
    confidence.clamp(MIN_SCORE_CONFIDENCE, MAX_SCORE_CONFIDENCE)
}

#[async_trait]
impl ImportanceScorer for RuleImportanceScorer {
    async fn score(
        &self,
        record: &MemoryRecord,
        context: &MemoryContext,
    ) -> Result<ImportanceScore, DomainError> {
        Ok(self.score_at(record, context, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(record: &MemoryRecord) -> ImportanceScore {
        RuleImportanceScorer::new().score_at(record, &MemoryContext::new(), Utc::now())
    }

    #[test]
    fn test_type_weights_order() {
        assert!(type_weight(MemoryType::Procedural) > type_weight(MemoryType::Temporal));
        assert!(type_weight(MemoryType::Temporal) > type_weight(MemoryType::Factual));
        assert!(type_weight(MemoryType::Contextual) > type_weight(MemoryType::Semantic));
    }

    #[test]
    fn test_plain_fresh_record() {
        let record = MemoryRecord::new("u", "Rust uses ownership for memory safety");
        let s = score(&record);
        // fresh: age < 1 day and accessed < 1 day ago
        assert!((s.breakdown.temporal - 0.5).abs() < 1e-9);
        assert_eq!(s.breakdown.type_weight, 0.0);
        assert!((s.total - 3.5).abs() < 1e-9, "{}", s.reasoning);
        assert_eq!(s.importance, Importance::High);
        assert_eq!(s.source, DecisionSource::Rules);
    }

    #[test]
    fn test_deadline_and_secret_push_to_critical() {
        let record = MemoryRecord::new(
            "u",
            "Important: the API key expires and the deadline to rotate the password is Friday",
        );
        let s = score(&record);
        assert!(s.breakdown.content > 3.0);
        assert_eq!(s.total, MAX_SCORE);
        assert_eq!(s.importance, Importance::Critical);
    }

    #[test]
    fn test_small_talk_scores_low() {
        let now = Utc::now();
        let mut record = MemoryRecord::new("u", "lol the weather, maybe");
        record.created_at = now - Duration::days(400);
        record.last_accessed_at = now - Duration::days(100);
        let s = RuleImportanceScorer::new().score_at(&record, &MemoryContext::new(), now);
        assert!(s.total < 2.0, "{}", s.reasoning);
        assert!(s.importance.is_low_priority());
    }

    #[test]
    fn test_usage_factor_tiers() {
        let base = MemoryRecord::new("u", "x");
        assert_eq!(usage_factor(&base), 0.0);
        assert_eq!(usage_factor(&base.clone().with_access_count(5)), 0.2);
        assert_eq!(usage_factor(&base.clone().with_access_count(10)), 0.5);
        assert_eq!(usage_factor(&base.clone().with_access_count(20)), 0.8);
        let mut consolidated = base.clone();
        consolidated.consolidate();
        assert_eq!(usage_factor(&consolidated), 0.6);
    }

    #[test]
    fn test_context_hints() {
        let mut context = MemoryContext::new();
        context.insert("priority".to_string(), "High".to_string());
        context.insert("source".to_string(), "user".to_string());
        context.insert("category".to_string(), "health".to_string());
        assert!((context_factor(&context) - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_expiry_urgency() {
        let now = Utc::now();
        let record = MemoryRecord::new("u", "x").with_expiry(now + Duration::days(2));
        assert!((temporal_factor(&record, now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_adjustments() {
        let now = Utc::now();
        let mut record = MemoryRecord::new("u", "Rust uses ownership for memory safety")
            .with_access_count(6);
        record.consolidate();
        let s = RuleImportanceScorer::new().score_at(&record, &MemoryContext::new(), now);
        // temporal and usage contribute: 0.7 + 0.1 + 0.1 + 0.15
        assert!((s.confidence - 1.0).abs() < 1e-9, "{}", s.confidence);
    }

    #[test]
    fn test_scores_are_bounded() {
        let now = Utc::now();
        let mut extreme_high = MemoryRecord::new(
            "u",
            "URGENT critical important: password and API key, deadline tomorrow, meeting with \
             my boss about the $5,000 client project. Must remember, always, essential, vital.",
        )
        .with_type(MemoryType::Procedural)
        .with_access_count(100)
        .with_expiry(now + Duration::days(1));
        extreme_high.consolidate();
        for i in 0..10 {
            extreme_high.add_related(format!("r{i}"), 0.9);
        }
        let mut context = MemoryContext::new();
        context.insert("priority".to_string(), "critical".to_string());

        let mut extreme_low = MemoryRecord::new("u", "lol maybe").with_type(MemoryType::Semantic);
        extreme_low.created_at = now - Duration::days(1000);
        extreme_low.last_accessed_at = now - Duration::days(1000);
        let mut low_context = MemoryContext::new();
        low_context.insert("priority".to_string(), "low".to_string());
        low_context.insert("source".to_string(), "inferred".to_string());

        let scorer = RuleImportanceScorer::new();
        for (record, context) in [
            (&extreme_high, &context),
            (&extreme_low, &low_context),
            (&MemoryRecord::new("u", ""), &MemoryContext::new()),
        ] {
            let s = scorer.score_at(record, context, now);
            assert!((MIN_SCORE..=MAX_SCORE).contains(&s.total), "{}", s.total);
            assert!(
                (MIN_SCORE_CONFIDENCE..=MAX_SCORE_CONFIDENCE).contains(&s.confidence),
                "{}",
                s.confidence
            );
        }
        assert_eq!(scorer.score_at(&extreme_high, &context, now).total, MAX_SCORE);
        assert_eq!(scorer.score_at(&extreme_low, &low_context, now).total, MIN_SCORE);
    }
}

//! End-to-end lifecycle scenarios against the public API

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use kioku::services::text::split_sentences;
use kioku::{
    Classifier, ConflictConfig, ConflictDetector, ConflictType, DomainError, EmbeddingService,
    EngineConfig, ForgettingConfig, ForgettingManager, ForgettingPolicy, ForgettingStrategy,
    Importance, ImportanceScorer, MemoryContext, MemoryEngine, MemoryMerger, MemoryRecord,
    MemoryType, PruneStrategy, ResolutionStrategy, RuleClassifier, RuleImportanceScorer,
    RuleMemoryMerger,
};

/// Embeddings from a fixed table; unknown text embeds to the zero vector
struct TableEmbeddings(HashMap<String, Vec<f32>>);

impl TableEmbeddings {
    fn pair(a: &str, b: &str, similarity: f32) -> Arc<Self> {
        let other = (1.0 - similarity * similarity).sqrt();
        Arc::new(Self(HashMap::from([
            (a.to_string(), vec![1.0, 0.0]),
            (b.to_string(), vec![similarity, other]),
        ])))
    }
}

#[async_trait]
impl EmbeddingService for TableEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        Ok(self.0.get(text).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
    }
}

fn aged(content: &str, importance: Importance, days: i64) -> MemoryRecord {
    let now = Utc::now();
    let mut record = MemoryRecord::new("user-1", content).with_importance(importance);
    record.created_at = now - Duration::days(days);
    record.last_accessed_at = now - Duration::days(days);
    record
}

#[tokio::test]
async fn test_scenario_preference_is_classified_without_model() {
    let classifier = RuleClassifier::new();
    let content = "I prefer tea over coffee";
    let memory_type = classifier
        .classify(content, &MemoryContext::new())
        .await
        .unwrap();
    assert_eq!(memory_type, MemoryType::Preference);
    assert!(classifier
        .score_tags(content, memory_type)
        .contains("preference"));
}

#[tokio::test]
async fn test_scenario_opposing_preferences_keep_both() {
    let existing =
        MemoryRecord::new("user-1", "User prefers coffee").with_type(MemoryType::Preference);
    let new = MemoryRecord::new("user-1", "User prefers tea").with_type(MemoryType::Preference);
    let detector = ConflictDetector::new(ConflictConfig::default()).with_embedder(
        TableEmbeddings::pair("User prefers tea", "User prefers coffee", 0.9),
    );

    let conflicts = detector.detect(&new, &[existing]).await;
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflict_type, ConflictType::PreferenceConflict);

    let resolution = detector.resolve(&conflicts[0]).await.unwrap();
    assert_eq!(resolution.strategy, ResolutionStrategy::KeepBoth);
}

#[test]
fn test_scenario_critical_consolidated_survives_any_policy() {
    let now = Utc::now();
    let policies = [
        None,
        Some(ForgettingPolicy::default()),
        Some(ForgettingPolicy {
            importance_threshold: Importance::Critical,
            max_age_days: 0,
            min_access_count: u32::MAX,
            decay_rate: 5.0,
            enabled: true,
        }),
        Some(ForgettingPolicy::disabled()),
    ];
    let strategies = [
        None,
        Some(ForgettingStrategy::AggressiveForgetting),
        Some(ForgettingStrategy::ImportanceBased),
        Some(ForgettingStrategy::AccessBased),
    ];

    for memory_type in MemoryType::ALL {
        let mut record =
            aged("ancient but vital", Importance::Critical, 10_000).with_type(memory_type);
        record.consolidate();
        for policy in &policies {
            for strategy in strategies {
                let manager = ForgettingManager::new(ForgettingConfig {
                    policy: policy.clone(),
                    strategy,
                    ..ForgettingConfig::default()
                });
                assert!(!manager.evaluate_at(&record, now).forget);
                assert!(manager.forgetting_pass(std::slice::from_ref(&record)).is_empty());
            }
        }
    }
}

#[test]
fn test_scenario_prune_least_important() {
    let records: Vec<MemoryRecord> = [
        Importance::Critical,
        Importance::High,
        Importance::Medium,
        Importance::Low,
        Importance::Minimal,
    ]
    .into_iter()
    .map(|i| MemoryRecord::new("user-1", format!("{i} memory")).with_importance(i))
    .collect();

    let kept = ForgettingManager::default().prune(&records, 3, PruneStrategy::LeastImportant);
    let mut levels: Vec<Importance> = kept.iter().map(|r| r.importance()).collect();
    levels.sort();
    assert_eq!(
        levels,
        vec![Importance::Medium, Importance::High, Importance::Critical]
    );
}

#[tokio::test]
async fn test_classification_is_total() {
    let classifier = RuleClassifier::new();
    let long = "very long ".repeat(500);
    let inputs = [
        "",
        "   ",
        "🙂🙂🙂",
        "x",
        "How to bake bread: first mix flour",
        "Meeting tomorrow at 3pm",
        "Paris is the capital of France",
        long.as_str(),
    ];
    for input in inputs {
        let t = classifier.classify(input, &MemoryContext::new()).await.unwrap();
        assert!(MemoryType::ALL.contains(&t));
    }
    assert_eq!(
        classifier.classify("  ", &MemoryContext::new()).await.unwrap(),
        MemoryType::Semantic
    );
}

#[tokio::test]
async fn test_scores_are_bounded() {
    let scorer = RuleImportanceScorer::new();
    let mut context = MemoryContext::new();
    context.insert("priority".to_string(), "critical".to_string());
    context.insert("category".to_string(), "health".to_string());

    let records = vec![
        aged("", Importance::Minimal, 2000),
        aged("lol maybe whatever", Importance::Low, 800),
        aged("URGENT: password deadline, meeting, $900 owed to client", Importance::High, 0)
            .with_type(MemoryType::Procedural)
            .with_access_count(500),
    ];
    for ctx in [MemoryContext::new(), context] {
        for (_, score) in scorer.rank(&records, &ctx).await.unwrap() {
            assert!((1.0..=5.0).contains(&score.total));
            assert!((0.1..=1.0).contains(&score.confidence));
        }
    }
}

#[tokio::test]
async fn test_conflict_confidence_bounded_and_thresholded() {
    let detector = ConflictDetector::new(ConflictConfig {
        semantic_threshold: 0.3,
        ..ConflictConfig::default()
    });
    let mut consolidated = MemoryRecord::new("user-1", "The store is open on Sundays")
        .with_importance(Importance::Critical);
    consolidated.consolidate();
    let candidates = vec![
        consolidated,
        MemoryRecord::new("user-1", "The store is open on Sundays."),
        MemoryRecord::new("user-1", "The store opens at 9 on Sundays"),
        MemoryRecord::new("user-1", "Bananas are yellow"),
    ];
    let new = MemoryRecord::new("user-1", "The store is not open on Sundays");

    let conflicts = detector.detect(&new, &candidates).await;
    assert!(!conflicts.is_empty());
    for window in conflicts.windows(2) {
        assert!(window[0].confidence >= window[1].confidence);
    }
    for conflict in &conflicts {
        assert!((0.0..=1.0).contains(&conflict.confidence));
        assert!(conflict.confidence >= 0.7);
        assert_ne!(conflict.conflict_type, ConflictType::None);
    }
}

#[tokio::test]
async fn test_redundancy_is_symmetric() {
    let detector = ConflictDetector::new(ConflictConfig::default());
    let pairs = [
        ("Alice lives in Lyon", "alice lives in lyon."),
        ("Alice lives in Lyon", "Alice lives in Paris"),
        ("The cat sleeps all day", "The cat sleeps all day long"),
    ];
    for (a, b) in pairs {
        let a = MemoryRecord::new("user-1", a);
        let b = MemoryRecord::new("user-1", b);
        let ab = detector.detect(&a, std::slice::from_ref(&b)).await;
        let ba = detector.detect(&b, std::slice::from_ref(&a)).await;
        let is_redundant =
            |c: &[kioku::Conflict]| c.iter().any(|c| c.conflict_type == ConflictType::Redundancy);
        assert_eq!(is_redundant(&ab), is_redundant(&ba), "{} / {}", a.content(), b.content());
    }
}

#[tokio::test]
async fn test_factual_remerge_loses_nothing() {
    let merger = RuleMemoryMerger::default();
    let a = MemoryRecord::new("user-1", "Alice was born in 1990. She lives in Lyon.")
        .with_type(MemoryType::Factual);
    let b = MemoryRecord::new("user-1", "She lives in Lyon. She has 2 kids.")
        .with_type(MemoryType::Factual);

    let merged = merger.merge(&[a.clone(), b.clone()]).await.unwrap();
    let remerged = merger.merge(&[merged.clone(), a, b]).await.unwrap();
    for sentence in split_sentences(merged.content()) {
        assert!(remerged.content().contains(&sentence), "lost: {sentence}");
    }
    assert!(remerged.is_consolidated());
}

#[test]
fn test_decay_is_monotone() {
    let manager = ForgettingManager::default();
    let now = Utc::now();
    for memory_type in MemoryType::ALL {
        let mut record = MemoryRecord::new("user-1", "x").with_type(memory_type);
        record.created_at = now - Duration::days(120);
        let mut previous = 0.0;
        for days in (0..=120).step_by(3) {
            record.last_accessed_at = now - Duration::days(days);
            let decay = manager.decay_score_at(&record, now);
            assert!(decay >= previous);
            previous = decay;
        }
    }
}

#[test]
fn test_prune_cap_and_critical_retention() {
    let manager = ForgettingManager::default();
    let mut records: Vec<MemoryRecord> = (0..10)
        .map(|i| aged(&format!("memory {i}"), Importance::Medium, i))
        .collect();
    records.push(aged("critical one", Importance::Critical, 900));
    records.push(aged("critical two", Importance::Critical, 1200));

    for strategy in [
        PruneStrategy::LeastRecentlyUsed,
        PruneStrategy::LeastImportant,
        PruneStrategy::Oldest,
        PruneStrategy::HighestDecay,
        PruneStrategy::Balanced,
    ] {
        for target in [2, 5, 12, 30] {
            let kept = manager.prune(&records, target, strategy);
            assert_eq!(kept.len(), target.min(records.len()));
            let criticals = kept
                .iter()
                .filter(|r| r.importance() == Importance::Critical)
                .count();
            assert_eq!(criticals, 2);
        }
    }
}

#[tokio::test]
async fn test_engine_ingest_then_maintain() {
    let engine = MemoryEngine::new(EngineConfig::default());
    let context = MemoryContext::new();

    let mut store: Vec<MemoryRecord> = Vec::new();
    for text in [
        "I prefer tea over coffee",
        "Paris is the capital of France.",
        "Paris is the capital of France!",
    ] {
        let outcome = engine
            .ingest(MemoryRecord::new("user-1", text), &store, &context)
            .await
            .unwrap();
        for (id, patch) in &outcome.patches {
            if let Some(record) = store.iter_mut().find(|r| r.id() == id.as_str()) {
                patch.apply(record);
            }
        }
        if outcome.store {
            store.push(outcome.record);
        }
    }
    // equally used duplicates: the newer statement supersedes the older one
    assert_eq!(store.len(), 3);
    let live: Vec<&str> = store
        .iter()
        .filter(|r| !r.is_deprecated())
        .map(|r| r.content())
        .collect();
    assert_eq!(
        live,
        vec!["I prefer tea over coffee", "Paris is the capital of France!"]
    );
    assert!(store[1].is_deprecated());

    let report = engine.maintain(&store, &context).await.unwrap();
    assert_eq!(report.records.len(), 2);
    assert!(report.deprecated.is_empty());
}

//! MemoryEngine - the lifecycle pipeline over all components
//!
//! `ingest` takes a new memory through classification, scoring and conflict
//! handling against the stored set. `maintain` refreshes scores, runs the
//! forgetting pass and consolidates near-duplicates. Neither touches storage:
//! both return the records to write and the patches to apply.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::{
    Conflict, ConflictType, DomainError, MemoryContext, MemoryPatch, MemoryRecord, MemoryType,
    Resolution, ResolutionStrategy,
};
use crate::ports::{EmbeddingService, LlmProvider};
use crate::services::conflict::NEEDS_REVIEW_TAG;
use crate::services::merge::assemble_merged;
use crate::services::{
    Classifier, ConflictDetector, ForgettingManager, ImportanceScorer, LlmClassifier,
    LlmConflictResolver, LlmImportanceScorer, LlmMemoryMerger, MemoryMerger, RuleClassifier,
    RuleConflictResolver, RuleImportanceScorer, RuleMemoryMerger, WithFallback,
};

/// Result of ingesting one memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// The incoming record after classification, tagging and scoring
    pub record: MemoryRecord,
    /// Whether `record` should be stored
    pub store: bool,
    /// Record produced by a merge resolution, to be stored instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<MemoryRecord>,
    /// Changes to already-stored records
    #[serde(default)]
    pub patches: Vec<(String, MemoryPatch)>,
    #[serde(default)]
    pub resolutions: Vec<(Conflict, Resolution)>,
}

/// Result of one maintenance run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceReport {
    /// Patches for the input records, in application order
    pub patches: Vec<(String, MemoryPatch)>,
    /// Ids deprecated by forgetting or absorbed into a merge
    pub deprecated: Vec<String>,
    /// New consolidated records
    pub merged: Vec<MemoryRecord>,
    /// Live set after the run
    pub records: Vec<MemoryRecord>,
}

pub struct MemoryEngine {
    config: EngineConfig,
    classifier: Arc<dyn Classifier>,
    scorer: Arc<dyn ImportanceScorer>,
    detector: ConflictDetector,
    merger: Arc<dyn MemoryMerger>,
    forgetting: ForgettingManager,
}

impl MemoryEngine {
    /// Engine running the rule engines only
    pub fn new(config: EngineConfig) -> Self {
        Self {
            classifier: Arc::new(RuleClassifier::new()),
            scorer: Arc::new(RuleImportanceScorer::new()),
            detector: ConflictDetector::new(config.conflict.clone()),
            merger: Arc::new(RuleMemoryMerger::new(config.merge.clone())),
            forgetting: ForgettingManager::new(config.forgetting.clone()),
            config,
        }
    }

    /// Engine asking `provider` first and falling back to the rule engines
    pub fn with_model(config: EngineConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let resolver = WithFallback::new(
            LlmConflictResolver::new(provider.clone()),
            RuleConflictResolver::new(),
        );
        Self {
            classifier: Arc::new(WithFallback::new(
                LlmClassifier::new(provider.clone()),
                RuleClassifier::new(),
            )),
            scorer: Arc::new(WithFallback::new(
                LlmImportanceScorer::new(provider.clone()),
                RuleImportanceScorer::new(),
            )),
            detector: ConflictDetector::new(config.conflict.clone())
                .with_resolver(Arc::new(resolver)),
            merger: Arc::new(WithFallback::new(
                LlmMemoryMerger::new(provider),
                RuleMemoryMerger::new(config.merge.clone()),
            )),
            forgetting: ForgettingManager::new(config.forgetting.clone()),
            config,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingService>) -> Self {
        self.detector = self.detector.with_embedder(embedder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scorer(&self) -> &dyn ImportanceScorer {
        self.scorer.as_ref()
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub fn merger(&self) -> &dyn MemoryMerger {
        self.merger.as_ref()
    }

    pub fn forgetting(&self) -> &ForgettingManager {
        &self.forgetting
    }

    /// Take a new memory through the pipeline against `existing`
    pub async fn ingest(
        &self,
        mut record: MemoryRecord,
        existing: &[MemoryRecord],
        context: &MemoryContext,
    ) -> Result<IngestOutcome, DomainError> {
        // 1. Type: explicit context hint, else classification
        let memory_type = match context.get("memory_type").map(|t| t.parse::<MemoryType>()) {
            Some(Ok(t)) => t,
            _ => self.classifier.classify(record.content(), context).await?,
        };
        record.set_type(memory_type);

        // 2. Tags and entities
        for tag in self.classifier.score_tags(record.content(), memory_type) {
            record.add_tag(tag);
        }
        for entity in self.classifier.extract_entities(record.content()) {
            record.add_entity(entity);
        }

        // 3. Importance
        let score = self.scorer.score(&record, context).await?;
        score.to_patch().apply(&mut record);

        // 4. Conflicts, strongest first
        let conflicts = self.detector.detect(&record, existing).await;

        let mut outcome = IngestOutcome {
            record: record.clone(),
            store: true,
            merged: None,
            patches: Vec::new(),
            resolutions: Vec::new(),
        };

        // 5. Resolution, until the new record is absorbed
        for conflict in conflicts {
            let resolution = self.detector.resolve(&conflict).await?;
            let existing_id = conflict.existing_memory.id().to_string();
            outcome
                .record
                .add_related(existing_id.clone(), conflict.similarity);

            match resolution.strategy {
                ResolutionStrategy::KeepFirst => {
                    outcome.patches.push((
                        existing_id,
                        MemoryPatch::deprecation(format!("superseded by {}", record.id())),
                    ));
                }
                ResolutionStrategy::KeepSecond => {
                    outcome.store = false;
                    outcome.patches.push((existing_id, reinforcement_patch(&conflict)));
                }
                ResolutionStrategy::Merge => {
                    let sources = [conflict.existing_memory.clone(), outcome.record.clone()];
                    let merged = match &resolution.merged_content {
                        Some(content) => {
                            assemble_merged(&sources, content.clone(), resolution.source)
                        }
                        None => self.merger.merge(&sources).await?,
                    };
                    outcome.patches.push((
                        existing_id,
                        MemoryPatch::deprecation(format!("merged into {}", merged.id())),
                    ));
                    outcome.store = false;
                    outcome.merged = Some(merged);
                }
                ResolutionStrategy::KeepBoth => {
                    if conflict.conflict_type == ConflictType::PreferenceConflict {
                        outcome.record.add_tag(NEEDS_REVIEW_TAG);
                        outcome.patches.push((
                            existing_id,
                            MemoryPatch::default()
                                .with_metadata(NEEDS_REVIEW_TAG, serde_json::json!(true)),
                        ));
                    }
                }
                ResolutionStrategy::DeleteBoth => {
                    outcome.store = false;
                    outcome.patches.push((
                        existing_id,
                        MemoryPatch::deprecation(format!(
                            "discarded with {}",
                            record.id()
                        )),
                    ));
                }
            }
            tracing::debug!(
                conflict_type = %conflict.conflict_type,
                strategy = %resolution.strategy,
                source = %resolution.source,
                "conflict resolved"
            );
            outcome.resolutions.push((conflict, resolution));

            if !outcome.store {
                break;
            }
        }

        tracing::info!(
            memory_id = outcome.record.id(),
            memory_type = %memory_type,
            importance = %outcome.record.importance(),
            conflicts = outcome.resolutions.len(),
            stored = outcome.store,
            "📥 Ingest completed"
        );
        Ok(outcome)
    }

    /// Refresh scores, forget decayed records and consolidate duplicates
    pub async fn maintain(
        &self,
        records: &[MemoryRecord],
        context: &MemoryContext,
    ) -> Result<MaintenanceReport, DomainError> {
        let mut report = MaintenanceReport::default();
        let mut working: Vec<MemoryRecord> = records.to_vec();

        // 1. Refresh importance of live records
        let scores = join_all(
            working
                .iter()
                .filter(|r| !r.is_deprecated())
                .map(|r| async move { (r.id().to_string(), self.scorer.score(r, context).await) }),
        )
        .await;
        let mut refreshed: HashMap<String, MemoryPatch> = HashMap::new();
        for (id, score) in scores {
            refreshed.insert(id, score?.to_patch());
        }
        for record in working.iter_mut() {
            if let Some(patch) = refreshed.remove(record.id()) {
                patch.apply(record);
                report.patches.push((record.id().to_string(), patch));
            }
        }

        // 2. Forgetting
        for (id, patch) in self.forgetting.forgetting_pass(&working) {
            if let Some(record) = working.iter_mut().find(|r| r.id() == id) {
                patch.apply(record);
            }
            report.deprecated.push(id.clone());
            report.patches.push((id, patch));
        }

        // 3. Consolidation of what is left
        let live: Vec<MemoryRecord> = working
            .iter()
            .filter(|r| !r.is_deprecated())
            .cloned()
            .collect();
        let input_ids: BTreeSet<&str> = live.iter().map(|r| r.id()).collect();
        let consolidated = self
            .merger
            .consolidate(&live, self.config.merge.consolidation_threshold)
            .await?;

        for record in consolidated {
            if input_ids.contains(record.id()) {
                report.records.push(record);
                continue;
            }
            for source in merged_sources(&record) {
                let patch = MemoryPatch::deprecation(format!("merged into {}", record.id()));
                report.deprecated.push(source.clone());
                report.patches.push((source, patch));
            }
            report.records.push(record.clone());
            report.merged.push(record);
        }

        tracing::info!(
            input = records.len(),
            deprecated = report.deprecated.len(),
            merged = report.merged.len(),
            live = report.records.len(),
            "🔧 Maintenance completed"
        );
        Ok(report)
    }
}

/// Access bump for a stored record that absorbed a duplicate
fn reinforcement_patch(conflict: &Conflict) -> MemoryPatch {
    let existing = &conflict.existing_memory;
    let mut patch = MemoryPatch {
        confidence: Some((existing.confidence() + 0.05).min(1.0)),
        ..MemoryPatch::default()
    };
    if conflict.conflict_type == ConflictType::Redundancy {
        patch = patch.with_metadata("duplicate_of", serde_json::json!(conflict.new_memory.id()));
    }
    patch
}

fn merged_sources(record: &MemoryRecord) -> Vec<String> {
    record
        .metadata
        .get("merged_from")
        .and_then(|v| v.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

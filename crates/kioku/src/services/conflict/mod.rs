//! Conflict Detector - finds and resolves overlaps with stored memories
//!
//! Detection runs in four steps:
//! 1. candidate filtering (same user, live, type-compatible)
//! 2. similarity gate (embeddings, or word overlap without them)
//! 3. conflict type cascade ([`analysis::conflict_type`])
//! 4. confidence scoring and thresholding
//!
//! Resolution is delegated to a [`ConflictResolver`].

pub mod analysis;
mod llm;
mod resolver;

pub use llm::*;
pub use resolver::*;

use std::sync::Arc;

use crate::config::ConflictConfig;
use crate::domain::{Conflict, DomainError, MemoryRecord, Resolution};
use crate::ports::EmbeddingService;
use crate::services::text::{cosine_similarity, jaccard};

/// Weight of the similarity term in conflict confidence
const SIMILARITY_WEIGHT: f64 = 0.4;
const CONSOLIDATED_BONUS: f64 = 0.1;
const HIGH_PRIORITY_BONUS: f64 = 0.1;

pub struct ConflictDetector {
    config: ConflictConfig,
    embedder: Option<Arc<dyn EmbeddingService>>,
    resolver: Arc<dyn ConflictResolver>,
}

impl ConflictDetector {
    /// Detector using word overlap for similarity and the rule resolver
    pub fn new(config: ConflictConfig) -> Self {
        Self {
            config,
            embedder: None,
            resolver: Arc::new(RuleConflictResolver::new()),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingService>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &ConflictConfig {
        &self.config
    }

    /// Conflicts between `new_memory` and `candidates`, strongest first
    pub async fn detect(
        &self,
        new_memory: &MemoryRecord,
        candidates: &[MemoryRecord],
    ) -> Vec<Conflict> {
        let eligible: Vec<&MemoryRecord> = candidates
            .iter()
            .filter(|c| {
                c.user_id == new_memory.user_id
                    && !c.is_deprecated()
                    && c.id() != new_memory.id()
                    && new_memory.memory_type().is_compatible_with(c.memory_type())
            })
            .collect();

        if eligible.is_empty() || new_memory.content().trim().is_empty() {
            return Vec::new();
        }

        let similarities = self.similarities(new_memory, &eligible).await;

        let mut conflicts: Vec<Conflict> = eligible
            .into_iter()
            .zip(similarities)
            .filter(|(_, similarity)| *similarity >= self.config.semantic_threshold)
            .filter_map(|(existing, similarity)| self.analyze(new_memory, existing, similarity))
            .collect();

        conflicts.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.similarity.total_cmp(&a.similarity))
                .then_with(|| a.existing_memory.id().cmp(b.existing_memory.id()))
        });

        tracing::debug!(
            memory_id = new_memory.id(),
            candidates = candidates.len(),
            conflicts = conflicts.len(),
            "conflict detection"
        );
        conflicts
    }

    /// Resolve one conflict with the configured resolver
    pub async fn resolve(&self, conflict: &Conflict) -> Result<Resolution, DomainError> {
        self.resolver.resolve(conflict).await
    }

    /// Pairwise similarity, embedding-based when possible
    async fn similarities(
        &self,
        new_memory: &MemoryRecord,
        eligible: &[&MemoryRecord],
    ) -> Vec<f64> {
        if let Some(embedder) = &self.embedder {
            match self.embedded_similarities(embedder.as_ref(), new_memory, eligible).await {
                Ok(similarities) => return similarities,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "embedding failed, falling back to word overlap"
                    );
                }
            }
        }
        eligible
            .iter()
            .map(|c| jaccard(new_memory.content(), c.content()))
            .collect()
    }

    async fn embedded_similarities(
        &self,
        embedder: &dyn EmbeddingService,
        new_memory: &MemoryRecord,
        eligible: &[&MemoryRecord],
    ) -> Result<Vec<f64>, DomainError> {
        let target = embedder.embed(new_memory.content()).await?;
        let texts: Vec<String> = eligible.iter().map(|c| c.content().to_string()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(DomainError::external(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors
            .iter()
            .map(|v| cosine_similarity(&target, v).max(0.0))
            .collect())
    }

    fn analyze(
        &self,
        new_memory: &MemoryRecord,
        existing: &MemoryRecord,
        similarity: f64,
    ) -> Option<Conflict> {
        let (conflict_type, reason) = analysis::conflict_type(
            new_memory,
            existing,
            similarity,
            self.config.redundancy_threshold,
        );
        if !conflict_type.is_conflict() {
            return None;
        }

        let mut confidence = SIMILARITY_WEIGHT * similarity + conflict_type.confidence_bonus();
        if new_memory.is_consolidated() || existing.is_consolidated() {
            confidence += CONSOLIDATED_BONUS;
        }
        if new_memory.importance().is_high_priority() || existing.importance().is_high_priority() {
            confidence += HIGH_PRIORITY_BONUS;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        if confidence < self.config.confidence_threshold {
            return None;
        }

        Some(Conflict {
            new_memory: new_memory.clone(),
            existing_memory: existing.clone(),
            conflict_type,
            confidence,
            reason,
            similarity,
        })
    }
}

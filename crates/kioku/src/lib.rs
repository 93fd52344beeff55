//! Kioku Memory Lifecycle Library
//!
//! Decision core for an AI-agent memory store: what kind of memory a record
//! is, how important it is, whether it collides with what is already stored,
//! how to merge duplicates and when to let a memory go.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain/`): Pure entities and value types
//!   - `entities/`: MemoryRecord, Conflict, Resolution, ForgettingPolicy, MemoryPatch
//!   - `value_objects/`: MemoryType, Importance, strategies
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Model backends (`LlmProvider`, `EmbeddingService`)
//!
//! - **Services** (`services/`): Classifier, Importance Scorer, Conflict
//!   Detector, Merge Strategy, Forgetting Manager. Each decision has a rule
//!   engine and an optional model-backed strategy, combined with
//!   `WithFallback`.
//!
//! - **Engine** (`engine`): `ingest` and `maintain` pipelines over the services
//!
//! # Usage
//!
//! ```rust,ignore
//! use kioku::{EngineConfig, MemoryContext, MemoryEngine, MemoryRecord};
//!
//! let engine = MemoryEngine::new(EngineConfig::from_env()?);
//! let record = MemoryRecord::new("user-1", "I prefer tea over coffee");
//! let outcome = engine
//!     .ingest(record, &stored, &MemoryContext::new())
//!     .await?;
//! ```

pub mod config;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{ConflictConfig, EngineConfig, ForgettingConfig, MergeConfig};
pub use domain::{
    Conflict, ConflictType, DecisionSource, DomainError, ForgettingPolicy, ForgettingStrategy,
    Importance, MemoryContext, MemoryPatch, MemoryRecord, MemoryType, PruneStrategy, Resolution,
    ResolutionStrategy,
};
pub use engine::{IngestOutcome, MaintenanceReport, MemoryEngine};
pub use ports::{
    ChatMessage, CompletionOptions, CompletionResponse, EmbeddingService, LlmProvider, MessageRole,
    TokenUsage,
};
pub use services::{
    Classifier, ConflictDetector, ConflictResolver, ForgettingDecision, ForgettingManager,
    ImportanceScore, ImportanceScorer, LlmClassifier, LlmConflictResolver, LlmImportanceScorer,
    LlmMemoryMerger, MemoryMerger, RuleClassifier, RuleConflictResolver, RuleImportanceScorer,
    RuleMemoryMerger, WithFallback,
};

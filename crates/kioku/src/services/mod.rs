//! Decision services
//!
//! Each component has a rule engine and, where a model helps, a
//! model-backed strategy. [`fallback::WithFallback`] composes the two.

pub mod classifier;
pub mod conflict;
pub mod fallback;
pub mod forgetting;
pub mod importance;
pub mod merge;
pub mod text;

// Re-exports
pub use classifier::{Classifier, LlmClassifier, RuleClassifier};
pub use conflict::{
    ConflictDetector, ConflictResolver, LlmConflictResolver, RuleConflictResolver,
};
pub use fallback::WithFallback;
pub use forgetting::{ForgettingDecision, ForgettingManager};
pub use importance::{
    ImportanceScore, ImportanceScorer, LlmImportanceScorer, RuleImportanceScorer, ScoreBreakdown,
};
pub use merge::{LlmMemoryMerger, MemoryMerger, RuleMemoryMerger};

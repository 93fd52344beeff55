//! Classifier - assigns a semantic category to memory text
//!
//! - [`RuleClassifier`]: pattern groups, then keyword sets, then semantic
//! - [`LlmClassifier`]: asks a model for a single type token
//!
//! Compose them with [`WithFallback`] so model failures resolve to the
//! rule-engine answer.

mod llm;
mod rules;

pub use llm::*;
pub use rules::*;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{DomainError, MemoryContext, MemoryType};
use crate::services::fallback::{try_primary, WithFallback};

/// Classification strategy
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Assign a type. Blank content is always semantic.
    async fn classify(
        &self,
        content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryType, DomainError>;

    /// Tags for content of the given type (always includes the type name)
    fn score_tags(&self, content: &str, memory_type: MemoryType) -> BTreeSet<String>;

    /// Names, emails, phone numbers and dates mentioned in the content
    fn extract_entities(&self, content: &str) -> BTreeSet<String>;
}

#[async_trait]
impl<P, F> Classifier for WithFallback<P, F>
where
    P: Classifier,
    F: Classifier,
{
    async fn classify(
        &self,
        content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryType, DomainError> {
        try_primary!(
            "classifier",
            self.primary().classify(content, context),
            self.fallback().classify(content, context)
        )
    }

    fn score_tags(&self, content: &str, memory_type: MemoryType) -> BTreeSet<String> {
        self.fallback().score_tags(content, memory_type)
    }

    fn extract_entities(&self, content: &str) -> BTreeSet<String> {
        self.fallback().extract_entities(content)
    }
}

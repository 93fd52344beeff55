//! Model-backed classifier

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Classifier, RuleClassifier};
use crate::domain::{DomainError, MemoryContext, MemoryType};
use crate::ports::{ChatMessage, CompletionOptions, LlmProvider};
use crate::services::text::{truncate_chars, words};

const SYSTEM_PROMPT: &str = "You classify entries of an AI assistant's long-term memory. \
Reply with exactly one word: the memory type.";

/// Classifier that asks a language model for the type token.
///
/// Fails on provider errors and unparsable replies; wrap it in
/// `WithFallback` with a [`RuleClassifier`] for an infallible classifier.
pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    rules: RuleClassifier,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            rules: RuleClassifier::new(),
        }
    }

    fn build_prompt(content: &str, context: &MemoryContext) -> String {
        let types = MemoryType::ALL
            .iter()
            .map(|t| format!("- {}: {}", t, t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let context_block = if context.is_empty() {
            "(none)".to_string()
        } else {
            context
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "## Memory types\n{}\n\n## Context\n{}\n\n## Memory\n\"{}\"\n\nType:",
            types,
            context_block,
            truncate_chars(content, 2000)
        )
    }
}

/// Parse a model reply into a type: a type name, or a 1-based ordinal
pub fn parse_type_reply(reply: &str) -> Result<MemoryType, DomainError> {
    let cleaned = reply
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    if let Ok(t) = cleaned.parse::<MemoryType>() {
        return Ok(t);
    }
    if let Ok(n) = cleaned.parse::<usize>() {
        if (1..=MemoryType::ALL.len()).contains(&n) {
            return Ok(MemoryType::ALL[n - 1]);
        }
    }

    let mentioned: BTreeSet<MemoryType> = words(reply)
        .iter()
        .filter_map(|w| w.parse::<MemoryType>().ok())
        .collect();
    match mentioned.len() {
        1 => Ok(*mentioned.iter().next().unwrap_or(&MemoryType::Semantic)),
        0 => Err(DomainError::parse(format!(
            "no memory type in reply: {}",
            truncate_chars(reply, 80)
        ))),
        _ => Err(DomainError::parse(format!(
            "ambiguous memory type in reply: {}",
            truncate_chars(reply, 80)
        ))),
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(
        &self,
        content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryType, DomainError> {
        if content.trim().is_empty() {
            return Ok(MemoryType::Semantic);
        }

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(content, context)),
        ];
        let response = self
            .provider
            .complete(&messages, &CompletionOptions::with(16, 0.1))
            .await?;

        let memory_type = parse_type_reply(&response.content)?;
        tracing::debug!(
            provider = self.provider.provider_name(),
            memory_type = %memory_type,
            "model classification"
        );
        Ok(memory_type)
    }

    fn score_tags(&self, content: &str, memory_type: MemoryType) -> BTreeSet<String> {
        self.rules.tags_for(content, memory_type)
    }

    fn extract_entities(&self, content: &str) -> BTreeSet<String> {
        self.rules.entities_in(content)
    }
}

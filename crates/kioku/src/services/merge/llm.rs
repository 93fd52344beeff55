//! Model-backed merger

use std::sync::Arc;

use async_trait::async_trait;

use super::{apply_update, assemble_merged, MemoryMerger};
use crate::domain::{DecisionSource, DomainError, MemoryContext, MemoryRecord};
use crate::ports::{ChatMessage, CompletionOptions, LlmProvider};
use crate::services::text::truncate_chars;

const SYSTEM_PROMPT: &str = "You maintain an AI assistant's long-term memory about one user. \
Rewrite memories into a single self-contained memory. Keep every distinct fact, drop \
repetition, and reply with the memory text only.";

pub struct LlmMemoryMerger {
    provider: Arc<dyn LlmProvider>,
}

impl LlmMemoryMerger {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    async fn synthesize(&self, prompt: String) -> Result<String, DomainError> {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let response = self
            .provider
            .complete(&messages, &CompletionOptions::with(1024, 0.2))
            .await?;

        let content = response
            .content
            .trim()
            .trim_matches('"')
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(DomainError::parse("empty merge reply"));
        }
        Ok(content)
    }
}

#[async_trait]
impl MemoryMerger for LlmMemoryMerger {
    async fn merge(&self, records: &[MemoryRecord]) -> Result<MemoryRecord, DomainError> {
        match records {
            [] => Err(DomainError::Validation("nothing to merge".to_string())),
            [single] => Ok(single.clone()),
            _ => {
                let listing = records
                    .iter()
                    .enumerate()
                    .map(|(i, r)| {
                        format!(
                            "{}. [{}] {}",
                            i + 1,
                            r.memory_type(),
                            truncate_chars(r.content(), 1000)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let content = self
                    .synthesize(format!("## Memories to merge\n{}\n\nMerged memory:", listing))
                    .await?;
                Ok(assemble_merged(records, content, DecisionSource::Model))
            }
        }
    }

    async fn update(
        &self,
        record: &MemoryRecord,
        new_content: &str,
        _context: &MemoryContext,
    ) -> Result<MemoryRecord, DomainError> {
        if new_content.trim().is_empty() {
            return Ok(record.clone());
        }
        let content = self
            .synthesize(format!(
                "## Current memory\n{}\n\n## New information\n{}\n\n\
                 Updated memory (new information wins where they disagree):",
                truncate_chars(record.content(), 2000),
                truncate_chars(new_content, 2000)
            ))
            .await?;
        Ok(apply_update(record, content, "synthesized", DecisionSource::Model))
    }
}

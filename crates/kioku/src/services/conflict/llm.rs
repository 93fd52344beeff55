//! Model-backed conflict resolver

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::ConflictResolver;
use crate::domain::{Conflict, DecisionSource, DomainError, Resolution, ResolutionStrategy};
use crate::ports::{ChatMessage, CompletionOptions, LlmProvider};
use crate::services::text::{extract_json_object, truncate_chars};

const SYSTEM_PROMPT: &str = "You reconcile conflicting entries in an AI assistant's \
long-term memory about one user. Reply with JSON only.";

#[derive(Debug, Deserialize)]
struct ResolutionReply {
    strategy: String,
    #[serde(default)]
    merged_content: Option<String>,
    #[serde(default)]
    reason: String,
}

pub struct LlmConflictResolver {
    provider: Arc<dyn LlmProvider>,
}

impl LlmConflictResolver {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    fn build_prompt(conflict: &Conflict) -> String {
        format!(
            "## Conflict\nType: {} (confidence {:.2})\nDetected because: {}\n\n\
             ## First (new) memory\n\"{}\"\n\n## Second (existing) memory\n\"{}\"\n\n\
             Choose one strategy: keep_first, keep_second, merge, keep_both, delete_both.\n\
             When merging, write the merged memory as one self-contained statement.\n\
             Respond as {{\"strategy\": \"...\", \"merged_content\": \"...\" or null, \"reason\": \"...\"}}",
            conflict.conflict_type,
            conflict.confidence,
            conflict.reason,
            truncate_chars(conflict.new_memory.content(), 1500),
            truncate_chars(conflict.existing_memory.content(), 1500),
        )
    }
}

/// Parse and validate a `{strategy, merged_content, reason}` reply
pub fn parse_resolution_reply(reply: &str) -> Result<Resolution, DomainError> {
    let json = extract_json_object(reply).ok_or_else(|| {
        DomainError::parse(format!(
            "no JSON in resolution reply: {}",
            truncate_chars(reply, 80)
        ))
    })?;
    let parsed: ResolutionReply = serde_json::from_str(json)?;
    let strategy: ResolutionStrategy = parsed.strategy.parse().map_err(DomainError::Parse)?;

    let merged_content = parsed
        .merged_content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if strategy == ResolutionStrategy::Merge && merged_content.is_none() {
        return Err(DomainError::parse("merge resolution without merged content"));
    }

    Ok(Resolution {
        strategy,
        merged_content: if strategy == ResolutionStrategy::Merge {
            merged_content
        } else {
            None
        },
        reason: parsed.reason,
        source: DecisionSource::Model,
    })
}

#[async_trait]
impl ConflictResolver for LlmConflictResolver {
    async fn resolve(&self, conflict: &Conflict) -> Result<Resolution, DomainError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(conflict)),
        ];
        let response = self
            .provider
            .complete(&messages, &CompletionOptions::with(512, 0.1))
            .await?;
        let resolution = parse_resolution_reply(&response.content)?;
        tracing::debug!(
            new_id = conflict.new_memory.id(),
            existing_id = conflict.existing_memory.id(),
            strategy = %resolution.strategy,
            "model resolution"
        );
        Ok(resolution)
    }
}

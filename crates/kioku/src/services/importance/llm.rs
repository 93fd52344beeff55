//! Model-backed importance scorer

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    ImportanceScore, ImportanceScorer, ScoreBreakdown, MAX_SCORE, MAX_SCORE_CONFIDENCE, MIN_SCORE,
    MIN_SCORE_CONFIDENCE,
};
use crate::domain::{DecisionSource, DomainError, Importance, MemoryContext, MemoryRecord};
use crate::ports::{ChatMessage, CompletionOptions, LlmProvider};
use crate::services::text::{extract_json_object, truncate_chars};

const SYSTEM_PROMPT: &str = "You rate how important an entry of an AI assistant's \
long-term memory is for future conversations with its user. Reply with JSON only.";

#[derive(Debug, Deserialize)]
struct ScoreReply {
    score: f64,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Scorer that asks a language model for a 1-5 rating
pub struct LlmImportanceScorer {
    provider: Arc<dyn LlmProvider>,
}

impl LlmImportanceScorer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    fn build_prompt(record: &MemoryRecord, context: &MemoryContext) -> String {
        let mut lines = vec![
            format!("Type: {}", record.memory_type()),
            format!("Accessed: {} times", record.access_count()),
            format!("Consolidated: {}", record.is_consolidated()),
        ];
        if !record.tags.is_empty() {
            lines.push(format!(
                "Tags: {}",
                record.tags.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        for (key, value) in context {
            lines.push(format!("{}: {}", key, value));
        }

        format!(
            "## Memory\n\"{}\"\n\n## Details\n{}\n\n\
             Rate importance from 1 (trivia) to 5 (critical: safety, deadlines, credentials).\n\
             Respond as {{\"score\": <1-5>, \"confidence\": <0-1>, \"reasoning\": \"<one sentence>\"}}",
            truncate_chars(record.content(), 2000),
            lines.join("\n")
        )
    }
}

/// Parse and validate a `{score, confidence, reasoning}` reply
pub fn parse_score_reply(reply: &str) -> Result<(f64, f64, String), DomainError> {
    let json = extract_json_object(reply).ok_or_else(|| {
        DomainError::parse(format!("no JSON in score reply: {}", truncate_chars(reply, 80)))
    })?;
    let parsed: ScoreReply = serde_json::from_str(json)?;

    if !(MIN_SCORE..=MAX_SCORE).contains(&parsed.score) {
        return Err(DomainError::parse(format!(
            "score {} outside [{}, {}]",
            parsed.score, MIN_SCORE, MAX_SCORE
        )));
    }
    if !(0.0..=1.0).contains(&parsed.confidence) {
        return Err(DomainError::parse(format!(
            "confidence {} outside [0, 1]",
            parsed.confidence
        )));
    }
    Ok((parsed.score, parsed.confidence, parsed.reasoning))
}

#[async_trait]
impl ImportanceScorer for LlmImportanceScorer {
    async fn score(
        &self,
        record: &MemoryRecord,
        context: &MemoryContext,
    ) -> Result<ImportanceScore, DomainError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(record, context)),
        ];
        let response = self
            .provider
            .complete(&messages, &CompletionOptions::with(256, 0.1))
            .await?;

        let (total, confidence, reasoning) = parse_score_reply(&response.content)?;
        tracing::debug!(
            memory_id = record.id(),
            score = total,
            "model importance score"
        );

        Ok(ImportanceScore {
            total,
            confidence: confidence.clamp(MIN_SCORE_CONFIDENCE, MAX_SCORE_CONFIDENCE),
            importance: Importance::from_score(total),
            breakdown: ScoreBreakdown::default(),
            reasoning,
            source: DecisionSource::Model,
        })
    }
}

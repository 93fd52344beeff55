//! Test doubles for the ports

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::ports::{
    ChatMessage, CompletionOptions, CompletionResponse, EmbeddingService, LlmProvider, TokenUsage,
};

/// LLM that replays canned replies (the last one repeats) or always fails
pub struct ScriptedLlm {
    replies: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, DomainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        if self.fail || self.replies.is_empty() {
            return Err(DomainError::external("provider unavailable"));
        }
        let reply = &self.replies[call.min(self.replies.len() - 1)];
        Ok(CompletionResponse {
            content: reply.clone(),
            model: "scripted".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-1"
    }
}

/// Embedding service with fixed vectors per text. Unknown texts all map to
/// the third axis, orthogonal to the vectors from `vectors_with_similarity`.
pub struct FixedEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
    fail: bool,
}

impl FixedEmbeddings {
    pub fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: pairs
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            vectors: HashMap::new(),
            fail: true,
        }
    }
}

/// Unit vector pair with the given cosine similarity
pub fn vectors_with_similarity(similarity: f32) -> (Vec<f32>, Vec<f32>) {
    let other = (1.0 - similarity * similarity).max(0.0).sqrt();
    (vec![1.0, 0.0, 0.0], vec![similarity, other, 0.0])
}

#[async_trait]
impl EmbeddingService for FixedEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if self.fail {
            return Err(DomainError::external("embeddings unavailable"));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
    }
}

//! Rule-engine merger

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;

use super::MemoryMerger;
use crate::config::MergeConfig;
use crate::domain::{
    DecisionSource, DomainError, Importance, MemoryContext, MemoryRecord, MemoryType,
};
use crate::services::conflict::analysis::preferences;
use crate::services::text::{
    jaccard, join_statements, sentence_key, sentence_union, split_sentences,
};

static STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\d+[.):]|step\s+\d+|first(?:ly)?\b|then\b|next\b|after that\b|finally\b|lastly\b)|\bstep\b")
        .unwrap()
});

/// Index of the record that anchors a merge
///
/// Favours important, frequently accessed, recent and consolidated
/// records; the first one wins ties.
pub fn select_base(records: &[MemoryRecord], now: DateTime<Utc>) -> usize {
    let weight = |r: &MemoryRecord| {
        let mut w = r.importance().score() / 5.0
            + ((r.access_count() as f64) + 1.0).ln() / 10.0
            + 1.0 / (r.age_days(now) + 1.0);
        if r.is_consolidated() {
            w += 0.2;
        }
        w
    };

    let mut best = 0;
    let mut best_weight = f64::NEG_INFINITY;
    for (i, record) in records.iter().enumerate() {
        let w = weight(record);
        if w > best_weight {
            best = i;
            best_weight = w;
        }
    }
    best
}

/// Merged content for records anchored on a base of `base_type`
pub fn combine_contents(records: &[MemoryRecord], base_type: MemoryType) -> String {
    match base_type {
        MemoryType::Factual | MemoryType::Semantic => {
            join_statements(sentence_union(records.iter().map(|r| r.content())))
        }
        MemoryType::Preference => join_statements(one_per_preference(records)),
        MemoryType::Procedural => {
            let sentences = sentence_union(records.iter().map(|r| r.content()));
            let steps: Vec<&String> = sentences.iter().filter(|s| STEP.is_match(s)).collect();
            if steps.is_empty() {
                join_statements(&sentences)
            } else {
                join_statements(steps)
            }
        }
        MemoryType::Episodic | MemoryType::Temporal => {
            let mut ordered: Vec<&MemoryRecord> = records.iter().collect();
            ordered.sort_by_key(|r| r.created_at);
            join_statements(unique_statements(ordered.into_iter()))
        }
        MemoryType::Contextual | MemoryType::Relationship => {
            join_statements(unique_statements(records.iter()))
        }
    }
}

fn unique_statements<'a>(records: impl Iterator<Item = &'a MemoryRecord>) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .map(|r| r.content().trim())
        .filter(|c| !c.is_empty() && seen.insert(sentence_key(c)))
        .map(str::to_string)
        .collect()
}

/// Sentences with at most one statement per preference subject
fn one_per_preference(records: &[MemoryRecord]) -> Vec<String> {
    let mut subjects = HashSet::new();
    let mut keys = HashSet::new();
    let mut kept = Vec::new();

    for record in records {
        for sentence in split_sentences(record.content()) {
            if !keys.insert(sentence_key(&sentence)) {
                continue;
            }
            let stated = preferences(&sentence);
            if stated.is_empty() || stated.iter().all(|p| subjects.insert(p.subject.clone())) {
                kept.push(sentence);
            }
        }
    }
    kept
}

/// Build the merged record around `content`, carrying provenance.
///
/// Callers pass at least one record; the empty case is rejected in `merge`.
pub(crate) fn assemble_merged(
    records: &[MemoryRecord],
    content: String,
    source: DecisionSource,
) -> MemoryRecord {
    let now = Utc::now();
    let base = &records[select_base(records, now)];
    let count = records.len() as f64;

    let avg_level = records.iter().map(|r| r.importance().score()).sum::<f64>() / count;
    let avg_confidence = records.iter().map(|r| r.confidence()).sum::<f64>() / count;
    let access_total = records
        .iter()
        .fold(0u32, |acc, r| acc.saturating_add(r.access_count()));

    let mut merged = MemoryRecord::new(base.user_id.clone(), content)
        .with_type(base.memory_type())
        .with_importance(Importance::from_level(avg_level.ceil() as i64 + 1))
        .with_confidence((avg_confidence + 0.1).min(1.0))
        .with_access_count(access_total);
    merged.agent_id = base.agent_id.clone();
    merged.run_id = base.run_id.clone();
    merged.expires_at = base.expires_at;

    if let Some(created) = records.iter().map(|r| r.created_at).min() {
        merged.created_at = created;
    }
    if let Some(accessed) = records.iter().map(|r| r.last_accessed_at).max() {
        merged.last_accessed_at = accessed;
    }

    let source_ids: BTreeSet<&str> = records.iter().map(|r| r.id()).collect();
    for record in records {
        merged.tags.extend(record.tags.iter().cloned());
        merged.entities.extend(record.entities.iter().cloned());
        for (id, weight) in &record.related {
            if !source_ids.contains(id.as_str()) {
                merged.add_related(id.clone(), *weight);
            }
        }
        for (key, value) in &record.metadata {
            merged
                .metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    merged
        .metadata
        .insert("merge_source_count".to_string(), serde_json::json!(records.len()));
    merged
        .metadata
        .insert("merge_method".to_string(), serde_json::json!(source.to_string()));
    merged.metadata.insert(
        "merged_from".to_string(),
        serde_json::json!(records.iter().map(|r| r.id()).collect::<Vec<_>>()),
    );
    merged.consolidate();
    merged
}

/// How an update combines old and new content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Replace,
    Append,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Replace => "replace",
            UpdateMode::Append => "append",
        }
    }
}

/// Build the updated copy of a record, stamping how it was produced
pub fn apply_update(
    record: &MemoryRecord,
    content: String,
    method: &str,
    source: DecisionSource,
) -> MemoryRecord {
    let mut updated = record.clone();
    if content != record.content() {
        updated.record_update(content);
    }
    updated
        .metadata
        .insert("update_method".to_string(), serde_json::json!(method));
    updated
        .metadata
        .insert("update_source".to_string(), serde_json::json!(source.to_string()));
    updated
}

#[derive(Debug, Clone, Default)]
pub struct RuleMemoryMerger {
    config: MergeConfig,
}

impl RuleMemoryMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Replace on an explicit `mode=replace` or near-identical content
    pub fn update_mode(&self, old: &str, new: &str, context: &MemoryContext) -> UpdateMode {
        match context.get("mode").map(|m| m.trim().to_lowercase()).as_deref() {
            Some("replace") => UpdateMode::Replace,
            Some("append") => UpdateMode::Append,
            _ if jaccard(old, new) > self.config.replace_threshold => UpdateMode::Replace,
            _ => UpdateMode::Append,
        }
    }
}

#[async_trait]
impl MemoryMerger for RuleMemoryMerger {
    async fn merge(&self, records: &[MemoryRecord]) -> Result<MemoryRecord, DomainError> {
        match records {
            [] => Err(DomainError::Validation("nothing to merge".to_string())),
            [single] => Ok(single.clone()),
            _ => {
                let base = &records[select_base(records, Utc::now())];
                let content = combine_contents(records, base.memory_type());
                let merged = assemble_merged(records, content, DecisionSource::Rules);
                tracing::debug!(
                    merged_id = merged.id(),
                    sources = records.len(),
                    "rule merge"
                );
                Ok(merged)
            }
        }
    }

    async fn update(
        &self,
        record: &MemoryRecord,
        new_content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryRecord, DomainError> {
        let new_content = new_content.trim();
        if new_content.is_empty() {
            return Ok(record.clone());
        }

        let mode = self.update_mode(record.content(), new_content, context);
        let content = match mode {
            UpdateMode::Replace => new_content.to_string(),
            UpdateMode::Append => join_statements(sentence_union([record.content(), new_content])),
        };
        Ok(apply_update(record, content, mode.as_str(), DecisionSource::Rules))
    }
}

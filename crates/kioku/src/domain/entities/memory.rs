//! MemoryRecord - The unit of work flowing through every component
//!
//! Pure domain entity without infrastructure dependencies.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::value_objects::{Importance, MemoryType};

/// Access count at which LOW/MINIMAL records are lifted to MEDIUM
pub const PROMOTE_TO_MEDIUM_ACCESSES: u32 = 10;
/// Access count at which records are lifted to HIGH
pub const PROMOTE_TO_HIGH_ACCESSES: u32 = 25;

/// SHA-256 hex digest of memory content
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn one() -> u32 {
    1
}

fn default_confidence() -> f64 {
    0.5
}

/// MemoryRecord - A piece of stored knowledge attached to a user
///
/// Identity, content and the invariant-bearing scores are private and only
/// change through the methods below; timestamps and collections are plain
/// data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(default = "new_id")]
    id: String,
    /// Owning user
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Run / session the memory was captured in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    content: String,
    #[serde(default)]
    content_hash: String,
    #[serde(default)]
    memory_type: MemoryType,
    #[serde(default)]
    importance: Importance,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "one")]
    access_count: u32,
    #[serde(default)]
    pub update_count: u32,
    #[serde(default)]
    consolidated: bool,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub entities: BTreeSet<String>,
    /// Related record id -> similarity weight
    #[serde(default)]
    pub related: BTreeMap<String, f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl MemoryRecord {
    /// Create a new memory with generated ID and timestamps.
    ///
    /// The creation itself counts as the first access.
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: user_id.into(),
            agent_id: None,
            run_id: None,
            content_hash: content_hash(&content),
            content,
            memory_type: MemoryType::default(),
            importance: Importance::default(),
            confidence: default_confidence(),
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            expires_at: None,
            access_count: 1,
            update_count: 0,
            consolidated: false,
            deprecated: false,
            tags: BTreeSet::new(),
            entities: BTreeSet::new(),
            related: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.set_importance(importance);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.set_confidence(confidence);
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the access count directly (clamped to at least 1)
    pub fn with_access_count(mut self, access_count: u32) -> Self {
        self.access_count = access_count.max(1);
        self
    }

    /// Re-establish invariants on a record that came from outside
    /// (deserialized files, storage rows).
    pub fn normalized(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = new_id();
        }
        self.content_hash = content_hash(&self.content);
        self.access_count = self.access_count.max(1);
        self.confidence = clamp_unit(self.confidence);
        let importance = self.importance;
        self.set_importance(importance);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    pub fn importance(&self) -> Importance {
        self.importance
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn access_count(&self) -> u32 {
        self.access_count
    }

    pub fn is_consolidated(&self) -> bool {
        self.consolidated
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn set_type(&mut self, memory_type: MemoryType) {
        self.memory_type = memory_type;
    }

    /// Set importance, honouring the deprecated/consolidated floors
    pub fn set_importance(&mut self, importance: Importance) {
        self.importance = if self.deprecated {
            Importance::Minimal
        } else if self.consolidated {
            importance.max(Importance::High)
        } else {
            importance
        };
    }

    /// Set confidence, clamped into [0, 1]
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp_unit(confidence);
    }

    /// Count an access and auto-promote frequently used memories
    pub fn record_access(&mut self) {
        self.record_access_at(Utc::now());
    }

    pub fn record_access_at(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = now;

        let promoted = if self.access_count >= PROMOTE_TO_HIGH_ACCESSES {
            self.importance.max(Importance::High)
        } else if self.access_count >= PROMOTE_TO_MEDIUM_ACCESSES
            && self.importance.is_low_priority()
        {
            Importance::Medium
        } else {
            self.importance
        };
        self.set_importance(promoted);
    }

    /// Replace the content, recording the update
    pub fn record_update(&mut self, new_content: impl Into<String>) {
        let now = Utc::now();
        self.content = new_content.into();
        self.content_hash = content_hash(&self.content);
        self.update_count = self.update_count.saturating_add(1);
        self.updated_at = now;
        self.consolidated = false;
    }

    /// Mark as having survived a merge/confirmation cycle
    pub fn consolidate(&mut self) {
        self.consolidated = true;
        let importance = self.importance;
        self.set_importance(importance);
    }

    /// Mark for removal by the owning store
    pub fn deprecate(&mut self) {
        self.deprecated = true;
        self.importance = Importance::Minimal;
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn add_entity(&mut self, entity: impl Into<String>) {
        self.entities.insert(entity.into());
    }

    /// Link a related record, keeping the strongest weight seen
    pub fn add_related(&mut self, id: impl Into<String>, weight: f64) {
        let id = id.into();
        if id == self.id {
            return;
        }
        let weight = clamp_unit(weight);
        self.related
            .entry(id)
            .and_modify(|w| *w = w.max(weight))
            .or_insert(weight);
    }

    // ------------------------------------------------------------------
    // Time helpers
    // ------------------------------------------------------------------

    /// Fractional days since creation
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        days_between(self.created_at, now)
    }

    /// Fractional days since the last access
    pub fn days_since_access(&self, now: DateTime<Utc>) -> f64 {
        days_between(self.last_accessed_at, now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the expiry falls within `window` from `now` (and has not passed)
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at
            .is_some_and(|at| at > now && at - now <= window)
    }
}

impl PartialEq for MemoryRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MemoryRecord {}

impl std::hash::Hash for MemoryRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let secs = (to - from).num_seconds().max(0) as f64;
    secs / 86_400.0
}

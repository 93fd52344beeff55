//! Rule-engine classifier
//!
//! Pattern groups are tested first, in a fixed type order. When none match,
//! keyword sets are tested in priority order, and anything left over is
//! semantic.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::Classifier;
use crate::domain::{DomainError, MemoryContext, MemoryType};
use crate::services::text::{contains_any, find_dates};

struct PatternGroup {
    memory_type: MemoryType,
    patterns: Vec<Regex>,
}

fn group(memory_type: MemoryType, patterns: &[&str]) -> PatternGroup {
    PatternGroup {
        memory_type,
        patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
    }
}

static PATTERN_GROUPS: LazyLock<Vec<PatternGroup>> = LazyLock::new(|| {
    vec![
        group(
            MemoryType::Procedural,
            &[
                r"(?i)^\s*(how to|steps? (to|for))\b",
                r"(?i)\bstep\s+\d+\b",
                r"(?i)\b(first|then|next|finally|afterwards),?\s+(you\s+)?(open|click|run|install|add|mix|press|go|type|select|enter|set|use)\b",
                r"(?m)^\s*\d+[.)]\s+\w+",
                r"(?i)\bto\s+\w+\s+(a|an|the|your)\s+\w+,?\s+(you\s+)?(need|should|must|have)\s+to\b",
            ],
        ),
        group(
            MemoryType::Preference,
            &[
                r"(?i)\b(i|user|he|she|they|we)\s+(really\s+|also\s+|much\s+|strongly\s+)?(prefers?|likes?|loves?|enjoys?|hates?|dislikes?|adores?|can't stand)\b",
                r"(?i)\bfavou?rite\b",
                r"(?i)\bwould rather\b",
                r"(?i)\b(prefers?|likes?|loves?)\s+\w+(\s+\w+)?\s+(over|more than)\s+\w+",
            ],
        ),
        group(
            MemoryType::Relationship,
            &[
                r"(?i)\b(my|his|her|their|user's)\s+(wife|husband|partner|spouse|mother|father|mom|dad|son|daughter|friend|boss|manager|colleague|coworker|sister|brother|cousin|aunt|uncle|grandmother|grandfather|girlfriend|boyfriend|neighbor|roommate)\b",
                r"(?i)\b(is married to|is dating|works with|is friends with|is related to|reports to)\b",
            ],
        ),
        group(
            MemoryType::Episodic,
            &[
                r"(?i)\b(i|we|user)\s+(went|visited|met|saw|attended|traveled|travelled|watched|had|did|celebrated)\b",
                r"(?i)\b(remember when|that time|last time|back when)\b",
            ],
        ),
        group(
            MemoryType::Temporal,
            &[
                r"(?i)\b(tomorrow|tonight|yesterday|next\s+(week|month|year|monday|tuesday|wednesday|thursday|friday|saturday|sunday)|this\s+(weekend|evening|afternoon))\b",
                r"(?i)\b(on|by|until|before|after)\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
                r"(?i)\b\d{1,2}(:\d{2})?\s*(am|pm)\b",
                r"\b\d{1,2}:\d{2}\b",
                r"\b\d{4}-\d{2}-\d{2}\b",
                r"(?i)\b(deadline|due (on|by|date)|scheduled (for|at))\b",
            ],
        ),
        group(
            MemoryType::Factual,
            &[
                r"(?i)\b(is|are|was|were)\s+(located|born|founded|built|called|named|made)\b",
                r"(?i)\b(capital|population|height|weight|birthday|address|phone number)\s+(of|is)\b",
                r"(?i)\b(is|are)\s+\d+(\.\d+)?\s*(years?|km|kg|meters?|miles?|%|percent)\b",
            ],
        ),
        group(
            MemoryType::Contextual,
            &[r"(?i)\b(currently|right now|at the moment|for now|in this (conversation|session|chat))\b"],
        ),
    ]
});

const EPISODIC_CUES: &[&str] = &[
    "happened", "experience", "experienced", "went", "visited", "remember when",
    "last time", "trip", "vacation", "i was", "we were", "once",
];
const FACTUAL_CUES: &[&str] = &[
    "fact", "is located", "population", "capital", "definition", "according to",
    "statistics", "percent", "born in", "founded", "measures",
];
const PROCEDURAL_KEYWORDS: &[&str] = &[
    "how to", "step", "steps", "instructions", "procedure", "process", "guide",
    "tutorial", "recipe", "method", "install", "configure",
];
const PREFERENCE_KEYWORDS: &[&str] = &[
    "prefer", "prefers", "like", "likes", "love", "loves", "enjoy", "enjoys",
    "favorite", "favourite", "hate", "hates", "dislike", "dislikes", "rather", "wish",
];
const RELATIONSHIP_KEYWORDS: &[&str] = &[
    "friend", "friends", "family", "wife", "husband", "partner", "colleague", "boss",
    "mother", "father", "brother", "sister", "married", "relationship", "team",
];
const TEMPORAL_CUES: &[&str] = &[
    "today", "tomorrow", "yesterday", "tonight", "schedule", "scheduled", "deadline",
    "appointment", "calendar", "week", "month", "morning", "evening", "o'clock",
];
const TEMPORAL_CONTEXT_KEYS: &[&str] = &["deadline", "due_date", "scheduled_at", "time", "date"];

static TEMPORAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}\b|\b\d{4}-\d{2}-\d{2}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b").unwrap()
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?\(?\b\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b").unwrap()
});

static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z'-]*(?:\s+[A-Z][a-zA-Z'-]*)*\b").unwrap()
});

const ENTITY_STOPWORDS: &[&str] = &[
    "i", "i'm", "i've", "i'll", "the", "a", "an", "this", "that", "these", "those", "it",
    "he", "she", "we", "they", "you", "my", "your", "our", "his", "her", "their", "user",
    "yes", "no", "and", "but", "or", "if", "when", "then", "also", "remember", "please",
];

const TAG_RULES: &[(&str, &[&str])] = &[
    (
        "preference",
        &[
            "prefer", "prefers", "like", "likes", "love", "loves", "favorite", "favourite", "hate",
            "hates", "dislike", "enjoy",
        ],
    ),
    (
        "temporal",
        &[
            "today", "tomorrow", "yesterday", "schedule", "deadline", "appointment", "date", "time",
            "week", "month",
        ],
    ),
    (
        "social",
        &[
            "friend", "friends", "family", "party", "wife", "husband", "partner", "sister",
            "brother", "mother", "father", "colleague",
        ],
    ),
    (
        "work",
        &["work", "job", "project", "meeting", "office", "client", "boss", "career", "deadline"],
    ),
    ("personal", &["my", "i", "me", "mine", "myself"]),
    (
        "learning",
        &[
            "learn", "learned", "learning", "study", "course", "read", "book", "tutorial", "lesson",
            "class",
        ],
    ),
];

/// Deterministic classifier over static pattern and keyword tables
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous classification, shared with the model-backed strategy
    pub fn classify_text(&self, content: &str, context: &MemoryContext) -> MemoryType {
        if content.trim().is_empty() {
            return MemoryType::Semantic;
        }

        if let Some(group) = PATTERN_GROUPS
            .iter()
            .find(|g| g.patterns.iter().any(|p| p.is_match(content)))
        {
            return group.memory_type;
        }

        if contains_any(content, EPISODIC_CUES) {
            MemoryType::Episodic
        } else if contains_any(content, FACTUAL_CUES) {
            MemoryType::Factual
        } else if contains_any(content, PROCEDURAL_KEYWORDS) {
            MemoryType::Procedural
        } else if contains_any(content, PREFERENCE_KEYWORDS) {
            MemoryType::Preference
        } else if contains_any(content, RELATIONSHIP_KEYWORDS) {
            MemoryType::Relationship
        } else if contains_any(content, TEMPORAL_CUES)
            || TEMPORAL_PATTERN.is_match(content)
            || TEMPORAL_CONTEXT_KEYS.iter().any(|k| context.contains_key(*k))
        {
            MemoryType::Temporal
        } else {
            MemoryType::Semantic
        }
    }

    pub fn tags_for(&self, content: &str, memory_type: MemoryType) -> BTreeSet<String> {
        let mut tags = BTreeSet::new();
        tags.insert(memory_type.to_string());
        for (tag, keywords) in TAG_RULES {
            if contains_any(content, keywords) {
                tags.insert(tag.to_string());
            }
        }
        tags
    }

    pub fn entities_in(&self, content: &str) -> BTreeSet<String> {
        let mut entities = BTreeSet::new();

        for m in EMAIL.find_iter(content) {
            entities.insert(m.as_str().to_string());
        }
        for m in PHONE.find_iter(content) {
            entities.insert(m.as_str().trim().to_string());
        }
        entities.extend(find_dates(content));

        let without_emails = EMAIL.replace_all(content, " ");
        for m in CAPITALIZED_PHRASE.find_iter(&without_emails) {
            if let Some(phrase) = strip_stopwords(m.as_str()) {
                entities.insert(phrase);
            }
        }

        entities
    }
}

/// Drop leading/trailing stopwords from a capitalized phrase
fn strip_stopwords(phrase: &str) -> Option<String> {
    let is_stop = |w: &&str| ENTITY_STOPWORDS.contains(&w.to_lowercase().as_str());
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let start = words.iter().position(|w| !is_stop(w))?;
    let end = words.iter().rposition(|w| !is_stop(w))?;
    let kept = words[start..=end].join(" ");
    if kept.chars().count() < 2 {
        None
    } else {
        Some(kept)
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(
        &self,
        content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryType, DomainError> {
        Ok(self.classify_text(content, context))
    }

    fn score_tags(&self, content: &str, memory_type: MemoryType) -> BTreeSet<String> {
        self.tags_for(content, memory_type)
    }

    fn extract_entities(&self, content: &str) -> BTreeSet<String> {
        self.entities_in(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> MemoryType {
        RuleClassifier::new().classify_text(text, &MemoryContext::new())
    }

    #[test]
    fn test_blank_is_semantic() {
        assert_eq!(classify(""), MemoryType::Semantic);
        assert_eq!(classify("   \n\t"), MemoryType::Semantic);
    }

    #[test]
    fn test_pattern_groups() {
        assert_eq!(classify("I prefer tea over coffee"), MemoryType::Preference);
        assert_eq!(classify("How to reset the router: unplug it"), MemoryType::Procedural);
        assert_eq!(classify("My sister lives in Berlin"), MemoryType::Relationship);
        assert_eq!(classify("We visited the Louvre in spring"), MemoryType::Episodic);
        assert_eq!(classify("Dentist appointment tomorrow at 3pm"), MemoryType::Temporal);
        assert_eq!(classify("The Eiffel Tower was built in 1889"), MemoryType::Factual);
        assert_eq!(classify("Currently debugging the login flow"), MemoryType::Contextual);
    }

    #[test]
    fn test_keyword_fallback_order() {
        // no pattern matches, episodic cue wins over the preference keyword
        assert_eq!(classify("That trip was something I'd like again"), MemoryType::Episodic);
        assert_eq!(classify("Statistics say most people sleep badly"), MemoryType::Factual);
        assert_eq!(classify("Follow the recipe exactly"), MemoryType::Procedural);
        assert_eq!(classify("Jazz is something they love"), MemoryType::Preference);
        assert_eq!(classify("The team is growing"), MemoryType::Relationship);
        assert_eq!(classify("Quarterly review this month"), MemoryType::Temporal);
        assert_eq!(classify("Rust has a borrow checker"), MemoryType::Semantic);
    }

    #[test]
    fn test_temporal_context_keys() {
        let mut context = MemoryContext::new();
        context.insert("due_date".to_string(), "2025-01-01".to_string());
        let t = RuleClassifier::new().classify_text("Submit the report", &context);
        assert_eq!(t, MemoryType::Temporal);
    }

    #[test]
    fn test_tags_include_type_and_content_tags() {
        let classifier = RuleClassifier::new();
        let tags = classifier.tags_for("I prefer tea over coffee", MemoryType::Preference);
        assert!(tags.contains("preference"));
        assert!(tags.contains("personal"));

        let tags = classifier.tags_for("Project meeting with my boss", MemoryType::Temporal);
        assert!(tags.contains("temporal"));
        assert!(tags.contains("work"));
    }

    #[test]
    fn test_entities() {
        let entities = RuleClassifier::new().entities_in(
            "The meeting with Alice Smith is on 2024-05-01. \
             Email alice@example.com or call 555-123-4567.",
        );
        assert!(entities.contains("Alice Smith"), "{entities:?}");
        assert!(entities.contains("alice@example.com"));
        assert!(entities.contains("2024-05-01"));
        assert!(entities.contains("555-123-4567"));
        assert!(!entities.contains("The"));
    }

    #[test]
    fn test_entities_skip_stopwords_only_phrases() {
        let entities = RuleClassifier::new().entities_in("I think so. Yes.");
        assert!(entities.is_empty(), "{entities:?}");
    }
}

//! MemoryType - Semantic category of memory content

use serde::{Deserialize, Serialize};

/// Memory type classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// General knowledge and concepts
    #[default]
    Semantic,
    /// Experiences and events the user lived through
    Episodic,
    /// How-to knowledge and step sequences
    Procedural,
    /// Verifiable facts with concrete values
    Factual,
    /// Situational, session-bound information
    Contextual,
    /// Likes, dislikes and choices
    Preference,
    /// People and how they relate to the user
    Relationship,
    /// Time-bound information: schedules, deadlines, dates
    Temporal,
}

impl MemoryType {
    /// All variants in ordinal order
    pub const ALL: [MemoryType; 8] = [
        MemoryType::Semantic,
        MemoryType::Episodic,
        MemoryType::Procedural,
        MemoryType::Factual,
        MemoryType::Contextual,
        MemoryType::Preference,
        MemoryType::Relationship,
        MemoryType::Temporal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Semantic => "semantic",
            MemoryType::Episodic => "episodic",
            MemoryType::Procedural => "procedural",
            MemoryType::Factual => "factual",
            MemoryType::Contextual => "contextual",
            MemoryType::Preference => "preference",
            MemoryType::Relationship => "relationship",
            MemoryType::Temporal => "temporal",
        }
    }

    /// Short description used when asking a model to classify
    pub fn description(&self) -> &'static str {
        match self {
            MemoryType::Semantic => "general knowledge, concepts and meanings",
            MemoryType::Episodic => "personal experiences and events that happened",
            MemoryType::Procedural => "instructions, steps and how-to knowledge",
            MemoryType::Factual => "concrete verifiable facts such as numbers, names and places",
            MemoryType::Contextual => "situational information about the current session",
            MemoryType::Preference => "likes, dislikes, favorites and choices",
            MemoryType::Relationship => "people and their relation to the user",
            MemoryType::Temporal => "schedules, deadlines, dates and times",
        }
    }

    /// Whether two types may describe the same piece of knowledge
    pub fn is_compatible_with(&self, other: MemoryType) -> bool {
        use MemoryType::*;
        *self == other
            || matches!(
                (*self, other),
                (Factual, Semantic)
                    | (Semantic, Factual)
                    | (Preference, Contextual)
                    | (Contextual, Preference)
            )
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic" => Ok(MemoryType::Semantic),
            "episodic" => Ok(MemoryType::Episodic),
            "procedural" => Ok(MemoryType::Procedural),
            "factual" => Ok(MemoryType::Factual),
            "contextual" => Ok(MemoryType::Contextual),
            "preference" => Ok(MemoryType::Preference),
            "relationship" => Ok(MemoryType::Relationship),
            "temporal" => Ok(MemoryType::Temporal),
            _ => Err(format!("Unknown memory type: {}", s)),
        }
    }
}

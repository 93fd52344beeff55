//! PruneStrategy - Ordering used to cut a record set down to size

use serde::{Deserialize, Serialize};

/// Which records are dropped first when pruning
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PruneStrategy {
    /// Keep the most recently accessed
    LeastRecentlyUsed,
    /// Keep the highest importance
    LeastImportant,
    /// Keep the newest created
    Oldest,
    /// Keep the lowest decay score
    HighestDecay,
    /// Weighted blend of importance, recency, access and decay
    #[default]
    Balanced,
}

impl std::fmt::Display for PruneStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneStrategy::LeastRecentlyUsed => write!(f, "least_recently_used"),
            PruneStrategy::LeastImportant => write!(f, "least_important"),
            PruneStrategy::Oldest => write!(f, "oldest"),
            PruneStrategy::HighestDecay => write!(f, "highest_decay"),
            PruneStrategy::Balanced => write!(f, "balanced"),
        }
    }
}

impl std::str::FromStr for PruneStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "least_recently_used" | "lru" => Ok(PruneStrategy::LeastRecentlyUsed),
            "least_important" => Ok(PruneStrategy::LeastImportant),
            "oldest" => Ok(PruneStrategy::Oldest),
            "highest_decay" => Ok(PruneStrategy::HighestDecay),
            "balanced" => Ok(PruneStrategy::Balanced),
            _ => Err(format!("Unknown prune strategy: {}", s)),
        }
    }
}

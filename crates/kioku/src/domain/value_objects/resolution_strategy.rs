//! ResolutionStrategy - How a conflict is reconciled

use serde::{Deserialize, Serialize};

/// Strategy for resolving a conflict.
///
/// "First" is the incoming memory, "second" the one already stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    KeepFirst,
    KeepSecond,
    Merge,
    KeepBoth,
    DeleteBoth,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionStrategy::KeepFirst => write!(f, "keep_first"),
            ResolutionStrategy::KeepSecond => write!(f, "keep_second"),
            ResolutionStrategy::Merge => write!(f, "merge"),
            ResolutionStrategy::KeepBoth => write!(f, "keep_both"),
            ResolutionStrategy::DeleteBoth => write!(f, "delete_both"),
        }
    }
}

impl std::str::FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "keep_first" | "keep_new" | "first" => Ok(ResolutionStrategy::KeepFirst),
            "keep_second" | "keep_existing" | "keep_old" | "second" => {
                Ok(ResolutionStrategy::KeepSecond)
            }
            "merge" => Ok(ResolutionStrategy::Merge),
            "keep_both" | "both" => Ok(ResolutionStrategy::KeepBoth),
            "delete_both" => Ok(ResolutionStrategy::DeleteBoth),
            _ => Err(format!("Unknown resolution strategy: {}", s)),
        }
    }
}

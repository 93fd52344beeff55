//! Importance - Ordinal priority of a memory

use serde::{Deserialize, Serialize};

/// Importance level, ordered MINIMAL < LOW < MEDIUM < HIGH < CRITICAL
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Minimal = 1,
    Low = 2,
    #[default]
    Medium = 3,
    High = 4,
    Critical = 5,
}

impl Importance {
    /// Build from an integer level, clamped into 1..=5
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Importance::Minimal,
            2 => Importance::Low,
            3 => Importance::Medium,
            4 => Importance::High,
            _ => Importance::Critical,
        }
    }

    /// Build from a real-valued score, rounded to the nearest level
    pub fn from_score(score: f64) -> Self {
        if score.is_nan() {
            return Importance::Medium;
        }
        Self::from_level(score.round() as i64)
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn score(&self) -> f64 {
        self.level() as f64
    }

    pub fn is_high_priority(&self) -> bool {
        matches!(self, Importance::Critical | Importance::High)
    }

    pub fn is_low_priority(&self) -> bool {
        matches!(self, Importance::Low | Importance::Minimal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Minimal => "minimal",
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
            Importance::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Ok(level) = s.parse::<i64>() {
            return Ok(Self::from_level(level));
        }
        match s.as_str() {
            "minimal" => Ok(Importance::Minimal),
            "low" => Ok(Importance::Low),
            "medium" => Ok(Importance::Medium),
            "high" => Ok(Importance::High),
            "critical" => Ok(Importance::Critical),
            _ => Err(format!("Unknown importance: {}", s)),
        }
    }
}

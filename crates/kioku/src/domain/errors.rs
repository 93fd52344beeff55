//! Domain Errors
//!
//! Error types for domain operations.

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl DomainError {
    /// Wrap a failure reported by an external provider
    pub fn external(err: impl std::fmt::Display) -> Self {
        Self::ExternalService(err.to_string())
    }

    /// Wrap an unusable model reply
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

//! Domain errors
//!
//! Platform rejections, transport failures and local validation problems are
//! kept apart: a network failure means "unknown outcome", never "rejected",
//! and is never folded into entity projections.

use thiserror::Error;

/// Error body returned by the platform when it refuses a command.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlatformRejection {
    pub code: String,
    pub title: String,
    pub detail: String,
}

impl std::fmt::Display for PlatformRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.title, self.detail)
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    /// The platform refused the command synchronously (wrong state, queue
    /// full, fax limits exceeded, malformed input). Never retried here.
    #[error("command rejected: {0}")]
    Rejected(PlatformRejection),

    /// The transport failed before a definitive answer arrived. The command
    /// may or may not have executed; nothing is projected.
    #[error("command outcome unknown: {0}")]
    UnknownOutcome(#[source] anyhow::Error),

    /// A webhook payload is missing required identity fields or cannot be
    /// decoded. The event is dropped without touching other projections.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    pub fn rejected(code: &str, title: &str, detail: &str) -> Self {
        DomainError::Rejected(PlatformRejection {
            code: code.to_string(),
            title: title.to_string(),
            detail: detail.to_string(),
        })
    }
}

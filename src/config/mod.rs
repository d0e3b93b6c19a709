//! Engine configuration
//!
//! All values have working defaults; callers override fields as needed and
//! the engine validates the combination once at construction.

use serde::{Deserialize, Serialize};

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;

/// Tunables for the correlation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard conference lifetime in seconds. The platform enforces four
    /// hours; the local projection expires on the same clock so a lost
    /// `conference.ended` webhook cannot leave a conference open forever.
    pub conference_ttl_secs: u64,
    /// Page size applied when a list query does not name one.
    pub default_page_size: u32,
    /// Upper bound accepted for a requested page size.
    pub max_page_size: u32,
    /// Queue capacity assumed for queues seen before any reconciliation.
    pub default_queue_max_size: u32,
    /// Reject fax cancellations locally when the projected status is already
    /// terminal, instead of spending a round trip on a guaranteed rejection.
    pub preflight_fax_cancel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conference_ttl_secs: 4 * 60 * 60,
            default_page_size: 20,
            max_page_size: 250,
            default_queue_max_size: 100,
            preflight_fax_cancel: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(DomainError::Validation(
                "page sizes must be at least 1".to_string(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(DomainError::Validation(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.conference_ttl_secs == 0 {
            return Err(DomainError::Validation(
                "conference_ttl_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn conference_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.conference_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_page_size, 250);
        assert_eq!(config.conference_ttl().num_hours(), 4);
    }

    #[test]
    fn test_rejects_inconsistent_page_sizes() {
        let config = EngineConfig {
            default_page_size: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_override_from_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"default_page_size": 50}"#).unwrap();
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.max_page_size, 250);
    }
}

//! Pagination descriptors and list filters
//!
//! List queries carry a page descriptor and an optional filter. Both are
//! validated once at construction and rendered into query parameters in a
//! fixed order, so the same logical query always produces the same URL.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::conference::ConferenceStatus;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;

/// Validated page request. `number` is 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    number: u32,
    size: u32,
}

impl PageDescriptor {
    /// Build a descriptor, filling gaps from the config and rejecting
    /// out-of-range values instead of clamping them.
    pub fn new(number: Option<u32>, size: Option<u32>, config: &EngineConfig) -> Result<Self> {
        let number = number.unwrap_or(1);
        if number == 0 {
            return Err(DomainError::Validation(
                "page number must be at least 1".to_string(),
            ));
        }
        let size = size.unwrap_or(config.default_page_size);
        if size == 0 || size > config.max_page_size {
            return Err(DomainError::Validation(format!(
                "page size {size} outside 1..={}",
                config.max_page_size
            )));
        }
        Ok(Self { number, size })
    }

    pub fn first(config: &EngineConfig) -> Self {
        Self {
            number: 1,
            size: config.default_page_size,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Query parameters in a fixed order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        vec![
            ("page[number]".to_string(), self.number.to_string()),
            ("page[size]".to_string(), self.size.to_string()),
        ]
    }

    /// Slice a locally held list the way the platform would page it.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.number as usize - 1).saturating_mul(self.size as usize);
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.size as usize).min(items.len());
        &items[start..end]
    }
}

/// Filter for conference listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConferenceFilter {
    pub name: Option<String>,
    pub status: Option<ConferenceStatus>,
}

impl ConferenceFilter {
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(name) = &self.name {
            params.push(("filter[name]".to_string(), name.clone()));
        }
        if let Some(status) = &self.status {
            let value = match status {
                ConferenceStatus::Init => "init",
                ConferenceStatus::InProgress => "in_progress",
                ConferenceStatus::Completed => "completed",
                ConferenceStatus::Unrecognized(s) => s.as_str(),
            };
            params.push(("filter[status]".to_string(), value.to_string()));
        }
        params
    }
}

/// Filter for participant listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantFilter {
    pub muted: Option<bool>,
    pub on_hold: Option<bool>,
    pub whispering: Option<bool>,
}

impl ParticipantFilter {
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(muted) = self.muted {
            params.push(("filter[muted]".to_string(), muted.to_string()));
        }
        if let Some(on_hold) = self.on_hold {
            params.push(("filter[on_hold]".to_string(), on_hold.to_string()));
        }
        if let Some(whispering) = self.whispering {
            params.push(("filter[whispering]".to_string(), whispering.to_string()));
        }
        params
    }
}

/// Page metadata echoed by list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        let page = PageDescriptor::new(None, None, &config).unwrap();
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), 20);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = EngineConfig::default();
        assert!(PageDescriptor::new(Some(0), None, &config).is_err());
        assert!(PageDescriptor::new(None, Some(0), &config).is_err());
        assert!(PageDescriptor::new(None, Some(251), &config).is_err());
        assert!(PageDescriptor::new(None, Some(250), &config).is_ok());
    }

    #[test]
    fn test_query_params_are_deterministic() {
        let config = EngineConfig::default();
        let page = PageDescriptor::new(Some(3), Some(50), &config).unwrap();
        assert_eq!(
            page.query_params(),
            vec![
                ("page[number]".to_string(), "3".to_string()),
                ("page[size]".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_apply_slices_locally() {
        let config = EngineConfig::default();
        let items: Vec<u32> = (0..45).collect();

        let page = PageDescriptor::new(Some(2), Some(20), &config).unwrap();
        assert_eq!(page.apply(&items), &items[20..40]);

        let page = PageDescriptor::new(Some(3), Some(20), &config).unwrap();
        assert_eq!(page.apply(&items), &items[40..45]);

        let page = PageDescriptor::new(Some(4), Some(20), &config).unwrap();
        assert!(page.apply(&items).is_empty());
    }

    #[test]
    fn test_filter_params() {
        let filter = ConferenceFilter {
            name: Some("standup".to_string()),
            status: Some(ConferenceStatus::InProgress),
        };
        assert_eq!(
            filter.query_params(),
            vec![
                ("filter[name]".to_string(), "standup".to_string()),
                ("filter[status]".to_string(), "in_progress".to_string()),
            ]
        );

        let filter = ParticipantFilter {
            muted: Some(true),
            ..Default::default()
        };
        assert_eq!(
            filter.query_params(),
            vec![("filter[muted]".to_string(), "true".to_string())]
        );
    }
}

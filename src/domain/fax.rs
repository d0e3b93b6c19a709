//! Fax projection
//!
//! Fax status progresses linearly per direction. The projector does not gate
//! commands on status; the platform reports invalid cancellations itself.
//! The correlation engine can optionally pre-flight `cancel` as a
//! best-effort convenience.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::value_objects::{ConnectionId, FaxId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaxDirection {
    Inbound,
    Outbound,
    #[serde(untagged)]
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaxStatus {
    #[serde(rename = "queued")]
    Queued,
    #[serde(rename = "media.processing")]
    MediaProcessing,
    #[serde(rename = "media.processed")]
    MediaProcessed,
    #[serde(rename = "originated")]
    Originated,
    #[serde(rename = "sending")]
    Sending,
    #[serde(rename = "delivered")]
    Delivered,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "initiated")]
    Initiated,
    #[serde(rename = "receiving")]
    Receiving,
    #[serde(rename = "received")]
    Received,
    #[serde(untagged)]
    Unrecognized(String),
}

impl FaxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FaxStatus::Delivered | FaxStatus::Failed | FaxStatus::Received
        )
    }

    /// Whether the platform accepts a cancel in this status. Best-effort:
    /// the platform remains authoritative.
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            FaxStatus::Queued
                | FaxStatus::MediaProcessed
                | FaxStatus::Originated
                | FaxStatus::Sending
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaxQuality {
    Normal,
    High,
    VeryHigh,
    #[serde(untagged)]
    Unrecognized(String),
}

/// Fax projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fax {
    pub id: FaxId,
    pub connection_id: ConnectionId,
    pub direction: FaxDirection,
    pub status: FaxStatus,
    pub from: String,
    pub to: String,
    pub quality: FaxQuality,
    pub store_media: bool,
    /// Present only when `store_media` was requested; the link itself is
    /// only valid for ten minutes after the platform minted it.
    pub stored_media_url: Option<String>,
    pub media_url: Option<String>,
    pub media_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fax {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Adopt the status the platform reports. Terminal statuses absorb.
    pub fn update_status(&mut self, status: FaxStatus) -> bool {
        if self.status.is_terminal() || self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_fax(status: FaxStatus) -> Fax {
        Fax {
            id: FaxId::new("fax-1"),
            connection_id: ConnectionId::new("c1"),
            direction: FaxDirection::Outbound,
            status,
            from: "+18005550101".to_string(),
            to: "+18005550100".to_string(),
            quality: FaxQuality::High,
            store_media: false,
            stored_media_url: None,
            media_url: Some("https://example.com/doc.pdf".to_string()),
            media_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cancelable_statuses() {
        assert!(FaxStatus::Queued.is_cancelable());
        assert!(FaxStatus::MediaProcessed.is_cancelable());
        assert!(FaxStatus::Originated.is_cancelable());
        assert!(FaxStatus::Sending.is_cancelable());
        assert!(!FaxStatus::MediaProcessing.is_cancelable());
        assert!(!FaxStatus::Delivered.is_cancelable());
        assert!(!FaxStatus::Failed.is_cancelable());
    }

    #[test]
    fn test_terminal_absorbs_updates() {
        let mut fax = test_fax(FaxStatus::Delivered);
        assert!(!fax.update_status(FaxStatus::Sending));
        assert_eq!(fax.status, FaxStatus::Delivered);
    }

    #[test]
    fn test_status_progression() {
        let mut fax = test_fax(FaxStatus::Queued);
        assert!(fax.update_status(FaxStatus::MediaProcessed));
        assert!(fax.update_status(FaxStatus::Originated));
        assert!(fax.update_status(FaxStatus::Sending));
        assert!(fax.update_status(FaxStatus::Delivered));
        assert!(fax.is_terminal());
    }

    #[test]
    fn test_dotted_status_serde() {
        let status: FaxStatus = serde_json::from_str("\"media.processing\"").unwrap();
        assert_eq!(status, FaxStatus::MediaProcessing);
        assert_eq!(
            serde_json::to_string(&FaxStatus::MediaProcessed).unwrap(),
            "\"media.processed\""
        );
    }
}

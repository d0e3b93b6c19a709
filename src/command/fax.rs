//! Fax commands
//!
//! Faxes are programs too, but a much smaller surface: send, cancel,
//! refresh (retry a failed fax with its original parameters) and delete.
//! The platform does not accept idempotency keys on fax operations.

use serde::{Deserialize, Serialize};

use crate::command::{encode_body, CommandSpec, Method};
use crate::domain::fax::FaxQuality;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CommandId, ConnectionId, FaxId, ResourceId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendFaxRequest {
    pub connection_id: ConnectionId,
    pub from: String,
    pub to: String,
    /// Exactly one of `media_url` and `media_name` must be set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<FaxQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monochrome: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_media: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t38_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl SendFaxRequest {
    pub fn new(
        connection_id: ConnectionId,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            connection_id,
            from: from.into(),
            to: to.into(),
            media_url: None,
            media_name: None,
            quality: None,
            monochrome: None,
            store_media: None,
            t38_enabled: None,
            webhook_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FaxCommand {
    Send(SendFaxRequest),
    Cancel { fax_id: FaxId },
    Refresh { fax_id: FaxId },
    Delete { fax_id: FaxId },
}

impl FaxCommand {
    pub fn name(&self) -> &'static str {
        match self {
            FaxCommand::Send(_) => "send_fax",
            FaxCommand::Cancel { .. } => "cancel_fax",
            FaxCommand::Refresh { .. } => "refresh_fax",
            FaxCommand::Delete { .. } => "delete_fax",
        }
    }

    pub fn fax_id(&self) -> Option<&FaxId> {
        match self {
            FaxCommand::Send(_) => None,
            FaxCommand::Cancel { fax_id }
            | FaxCommand::Refresh { fax_id }
            | FaxCommand::Delete { fax_id } => Some(fax_id),
        }
    }

    pub fn target(&self) -> Option<ResourceId> {
        self.fax_id().map(|id| ResourceId::Fax(id.clone()))
    }

    pub fn command_id(&self) -> Option<&CommandId> {
        None
    }

    pub fn spec(&self) -> Result<CommandSpec> {
        let spec = match self {
            FaxCommand::Send(r) => CommandSpec::post("/faxes", encode_body(r)?),
            FaxCommand::Cancel { fax_id } => CommandSpec::post(
                format!("/faxes/{fax_id}/actions/cancel"),
                serde_json::json!({}),
            ),
            FaxCommand::Refresh { fax_id } => CommandSpec::post(
                format!("/faxes/{fax_id}/actions/refresh"),
                serde_json::json!({}),
            ),
            FaxCommand::Delete { fax_id } => CommandSpec {
                method: Method::Delete,
                path: format!("/faxes/{fax_id}"),
                query: Vec::new(),
                body: None,
            },
        };
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_spec() {
        let mut request =
            SendFaxRequest::new(ConnectionId::new("c1"), "+18005550101", "+18005550100");
        request.media_url = Some("https://example.com/doc.pdf".to_string());

        let spec = FaxCommand::Send(request).spec().unwrap();
        assert_eq!(spec.method, Method::Post);
        assert_eq!(spec.path, "/faxes");
        assert_eq!(spec.body.unwrap()["media_url"], "https://example.com/doc.pdf");
    }

    #[test]
    fn test_cancel_and_delete_paths() {
        let cancel = FaxCommand::Cancel {
            fax_id: FaxId::new("fax-1"),
        };
        assert_eq!(cancel.spec().unwrap().path, "/faxes/fax-1/actions/cancel");

        let delete = FaxCommand::Delete {
            fax_id: FaxId::new("fax-1"),
        };
        let spec = delete.spec().unwrap();
        assert_eq!(spec.method, Method::Delete);
        assert_eq!(spec.path, "/faxes/fax-1");
        assert!(spec.body.is_none());
    }
}

//! Command surface
//!
//! Every platform operation is expressed as a [`Command`] value that knows
//! its HTTP rendering ([`CommandSpec`]), its target resource, and the
//! idempotency key and client state it carries. The engine never builds URLs
//! anywhere else.

pub mod ack;
pub mod call;
pub mod conference;
pub mod fax;
pub mod query;

use serde::{Deserialize, Serialize};

use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{ClientState, CommandId, ResourceId};

pub use ack::Acknowledgment;
pub use call::CallCommand;
pub use conference::ConferenceCommand;
pub use fax::FaxCommand;
pub use query::Query;

/// HTTP verb of a rendered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Wire rendering of a command, independent of any HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub method: Method,
    /// Path relative to the API base, e.g. `/calls/{id}/actions/answer`.
    pub path: String,
    /// Query parameters in their rendered order.
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl CommandSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Custom SIP header attached to an INVITE or its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipHeader {
    pub name: String,
    pub value: String,
}

/// A command against the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    Call(CallCommand),
    Conference(ConferenceCommand),
    Fax(FaxCommand),
    Query(Query),
}

impl Command {
    /// The resource this command addresses. `None` for commands that create
    /// a resource whose identifier the platform has not minted yet.
    pub fn target(&self) -> Option<ResourceId> {
        match self {
            Command::Call(c) => c.target(),
            Command::Conference(c) => c.target(),
            Command::Fax(c) => c.target(),
            Command::Query(q) => q.target(),
        }
    }

    pub fn command_id(&self) -> Option<&CommandId> {
        match self {
            Command::Call(c) => c.command_id(),
            Command::Conference(c) => c.command_id(),
            Command::Fax(c) => c.command_id(),
            Command::Query(_) => None,
        }
    }

    pub fn client_state(&self) -> Option<&ClientState> {
        match self {
            Command::Call(c) => c.client_state(),
            Command::Conference(c) => c.client_state(),
            Command::Fax(_) => None,
            Command::Query(_) => None,
        }
    }

    /// Render the HTTP shape of the command.
    pub fn spec(&self) -> Result<CommandSpec> {
        match self {
            Command::Call(c) => c.spec(),
            Command::Conference(c) => c.spec(),
            Command::Fax(c) => c.spec(),
            Command::Query(q) => Ok(q.spec()),
        }
    }

    /// Human-readable operation name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Call(c) => c.name(),
            Command::Conference(c) => c.name(),
            Command::Fax(c) => c.name(),
            Command::Query(q) => q.name(),
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Command::Query(_))
    }
}

pub(crate) fn encode_body<T: Serialize>(request: &T) -> Result<serde_json::Value> {
    serde_json::to_value(request).map_err(|e| {
        crate::domain::shared::error::DomainError::Validation(format!(
            "unserializable command body: {e}"
        ))
    })
}

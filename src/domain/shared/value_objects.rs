//! Shared value objects used across multiple bounded contexts
//!
//! Platform-issued identifiers are opaque tokens; they are wrapped in
//! newtypes so a conference id can never be passed where a call control id
//! is expected.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Capability token identifying (and authorizing control of) a call leg.
    /// Unique and immutable for the life of the leg.
    CallControlId
);
opaque_id!(
    /// Identifier unique to one call leg, used to correlate webhook events.
    CallLegId
);
opaque_id!(
    /// Identifier shared by related call legs, e.g. both sides of a bridge.
    CallSessionId
);
opaque_id!(
    /// Call Control App (connection) identifier.
    ConnectionId
);
opaque_id!(
    /// Conference identifier.
    ConferenceId
);
opaque_id!(
    /// Fax resource identifier.
    FaxId
);
opaque_id!(
    /// Queue name. Queues are created implicitly on first enqueue, so the
    /// name doubles as the identifier.
    QueueName
);

/// Caller-supplied idempotency key. Two commands carrying the same id against
/// the same resource are one logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(String);

impl CommandId {
    /// Generate a fresh random key.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Webhook event identifier, the dedup key for at-least-once delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque caller-supplied state, echoed byte-for-byte on every webhook tied
/// to the leg until overwritten by a later state-bearing command. The wire
/// representation is Base-64; the contents are never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientState(String);

impl ClientState {
    /// Wrap an already Base-64 encoded string, validating the encoding.
    pub fn from_encoded(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        base64::engine::general_purpose::STANDARD
            .decode(&value)
            .map_err(|e| DomainError::Validation(format!("client_state is not valid Base-64: {e}")))?;
        Ok(Self(value))
    }

    /// Encode raw bytes as client state.
    pub fn encode(bytes: &[u8]) -> Self {
        Self(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Decode back to the caller's raw bytes.
    pub fn decode(&self) -> Vec<u8> {
        // Validated on construction; an empty vec is the safe fallback for
        // values that arrived from the wire unvalidated.
        base64::engine::general_purpose::STANDARD
            .decode(&self.0)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of the projection arena. Every projected entity is owned by exactly
/// one resource identifier, and mutations are serialized per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ResourceId {
    Call(CallControlId),
    Conference(ConferenceId),
    Queue(QueueName),
    Fax(FaxId),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Call(id) => write!(f, "call:{id}"),
            ResourceId::Conference(id) => write!(f, "conference:{id}"),
            ResourceId::Queue(name) => write!(f, "queue:{name}"),
            ResourceId::Fax(id) => write!(f, "fax:{id}"),
        }
    }
}

//! Command acknowledgments
//!
//! Typed bodies of successful synchronous responses. Action commands echo
//! `{"result": "ok"}`; creations and queries return resource snapshots under
//! a `data` wrapper. [`Acknowledgment::parse`] picks the right shape from the
//! command that produced the response.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::pagination::PageMeta;
use crate::command::{CallCommand, Command, ConferenceCommand, FaxCommand, Query};
use crate::domain::call::CallState;
use crate::domain::conference::{ConferenceEndReason, ConferenceStatus, ParticipantStatus};
use crate::domain::fax::{FaxDirection, FaxQuality, FaxStatus};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallControlId, CallLegId, CallSessionId, ClientState, ConferenceId, ConnectionId, FaxId,
    QueueName,
};

/// Call snapshot returned by `dial` and `get_call_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallData {
    pub call_control_id: CallControlId,
    pub call_leg_id: CallLegId,
    pub call_session_id: CallSessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    /// `false` on a dial acknowledgment; the leg is not up until events say
    /// otherwise.
    pub is_alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<CallState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferenceData {
    pub id: ConferenceId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConferenceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<ConferenceEndReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Conference identity carried inside a participant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferenceRef {
    pub id: ConferenceId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantData {
    pub id: String,
    pub call_control_id: CallControlId,
    pub call_leg_id: CallLegId,
    pub conference: ConferenceRef,
    pub status: ParticipantStatus,
    pub muted: bool,
    pub on_hold: bool,
    pub end_conference_on_exit: bool,
    pub soft_end_conference_on_exit: bool,
    #[serde(default)]
    pub whisper_call_control_ids: Vec<CallControlId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueData {
    pub id: String,
    pub name: QueueName,
    pub current_size: u32,
    pub max_size: u32,
    pub average_wait_time_secs: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCallData {
    pub call_control_id: CallControlId,
    pub call_leg_id: CallLegId,
    pub call_session_id: CallSessionId,
    pub connection_id: ConnectionId,
    pub queue_id: String,
    pub queue_position: u32,
    pub from: String,
    pub to: String,
    pub enqueued_at: DateTime<Utc>,
    pub wait_time_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaxData {
    pub id: FaxId,
    pub connection_id: ConnectionId,
    pub direction: FaxDirection,
    pub status: FaxStatus,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<FaxQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(default)]
    pub store_media: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Successful synchronous response to a command, parsed by command kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Acknowledgment {
    /// `{"result": "ok"}`; the real outcome arrives via webhooks.
    Ok,
    Call(CallData),
    Calls {
        data: Vec<CallData>,
        meta: PageMeta,
    },
    Conference(ConferenceData),
    Conferences {
        data: Vec<ConferenceData>,
        meta: PageMeta,
    },
    Participants {
        data: Vec<ParticipantData>,
        meta: PageMeta,
    },
    Queue(QueueData),
    QueueCall(QueueCallData),
    QueueCalls {
        data: Vec<QueueCallData>,
        meta: PageMeta,
    },
    Fax(FaxData),
    /// DELETE responses carry no body.
    Deleted,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    data: T,
}

#[derive(Deserialize)]
struct Listed<T> {
    data: Vec<T>,
    meta: PageMeta,
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| DomainError::UnknownOutcome(anyhow!("undecodable {kind} response: {e}")))
}

impl Acknowledgment {
    /// Parse a raw response body according to the command that was sent.
    pub fn parse(command: &Command, body: serde_json::Value) -> Result<Self> {
        let ack = match command {
            Command::Call(CallCommand::Dial(_)) => {
                let w: Wrapped<CallData> = decode("dial", body)?;
                Acknowledgment::Call(w.data)
            }
            Command::Call(_) => {
                // Everything else on a leg acknowledges with {"result": "ok"}.
                #[derive(Deserialize)]
                struct CommandResult {
                    result: String,
                }
                let r: CommandResult = decode(command.name(), body)?;
                if r.result != "ok" {
                    return Err(DomainError::UnknownOutcome(anyhow!(
                        "unexpected result {:?} for {}",
                        r.result,
                        command.name()
                    )));
                }
                Acknowledgment::Ok
            }
            Command::Conference(ConferenceCommand::Create(_)) => {
                let w: Wrapped<ConferenceData> = decode("create_conference", body)?;
                Acknowledgment::Conference(w.data)
            }
            Command::Conference(_) => {
                // Participant actions also answer {"result": "ok"}, but some
                // deployments omit the body entirely.
                if body.is_null() {
                    Acknowledgment::Ok
                } else {
                    #[derive(Deserialize)]
                    struct CommandResult {
                        result: String,
                    }
                    let r: CommandResult = decode(command.name(), body)?;
                    if r.result != "ok" {
                        return Err(DomainError::UnknownOutcome(anyhow!(
                            "unexpected result {:?} for {}",
                            r.result,
                            command.name()
                        )));
                    }
                    Acknowledgment::Ok
                }
            }
            Command::Fax(FaxCommand::Send(_)) => {
                let w: Wrapped<FaxData> = decode("send_fax", body)?;
                Acknowledgment::Fax(w.data)
            }
            Command::Fax(FaxCommand::Delete { .. }) => Acknowledgment::Deleted,
            Command::Fax(_) => Acknowledgment::Ok,
            Command::Query(Query::GetCallStatus { .. }) => {
                let w: Wrapped<CallData> = decode("get_call_status", body)?;
                Acknowledgment::Call(w.data)
            }
            Command::Query(Query::ListCalls { .. }) => {
                let l: Listed<CallData> = decode("list_calls", body)?;
                Acknowledgment::Calls {
                    data: l.data,
                    meta: l.meta,
                }
            }
            Command::Query(Query::ListConferences { .. }) => {
                let l: Listed<ConferenceData> = decode("list_conferences", body)?;
                Acknowledgment::Conferences {
                    data: l.data,
                    meta: l.meta,
                }
            }
            Command::Query(Query::ListConferenceParticipants { .. }) => {
                let l: Listed<ParticipantData> = decode("list_conference_participants", body)?;
                Acknowledgment::Participants {
                    data: l.data,
                    meta: l.meta,
                }
            }
            Command::Query(Query::GetQueue { .. }) => {
                let w: Wrapped<QueueData> = decode("get_queue", body)?;
                Acknowledgment::Queue(w.data)
            }
            Command::Query(Query::GetQueueCall { .. }) => {
                let w: Wrapped<QueueCallData> = decode("get_queue_call", body)?;
                Acknowledgment::QueueCall(w.data)
            }
            Command::Query(Query::ListQueueCalls { .. }) => {
                let l: Listed<QueueCallData> = decode("list_queue_calls", body)?;
                Acknowledgment::QueueCalls {
                    data: l.data,
                    meta: l.meta,
                }
            }
            Command::Query(Query::GetFax { .. }) => {
                let w: Wrapped<FaxData> = decode("get_fax", body)?;
                Acknowledgment::Fax(w.data)
            }
        };
        Ok(ack)
    }
}

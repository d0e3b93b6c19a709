//! Event model - typed webhook notifications
//!
//! The platform delivers events at-least-once and without ordering
//! guarantees. Every event carries an `id` (the dedup key), an `occurred_at`
//! timestamp, and a payload with the common call identity fields. Parsing is
//! strict about identity (a payload without `call_control_id` is malformed
//! and dropped) and lenient about everything else: unrecognized event types
//! become [`EventKind::Unknown`] instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::call::{CallDirection, CallState, HangupCause, HangupSource};
use crate::domain::queue::DequeueReason;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallControlId, CallLegId, CallSessionId, ClientState, ConnectionId, EventId, QueueName,
};

/// Common identity fields present on every call-scoped webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallIdentity {
    pub call_control_id: CallControlId,
    pub call_leg_id: CallLegId,
    pub call_session_id: CallSessionId,
    pub connection_id: ConnectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
}

/// Links recorded media by format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wav: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionData {
    pub transcript: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
}

/// Event families, used when deciding whether a late-arriving event may
/// regress state: ordering is only compared within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Lifecycle,
    Queue,
    Dtmf,
    Media,
    Recording,
    Refer,
    Streaming,
    Transcription,
    Other,
}

/// Typed body of a webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventKind {
    Initiated {
        direction: CallDirection,
        from: String,
        to: String,
        state: CallState,
    },
    Answered {
        state: CallState,
    },
    Bridged {
        state: CallState,
    },
    Hangup {
        hangup_cause: Option<HangupCause>,
        hangup_source: Option<HangupSource>,
        sip_hangup_cause: Option<String>,
    },
    Enqueued {
        queue: QueueName,
        current_position: u32,
    },
    Dequeued {
        queue: QueueName,
        queue_position: u32,
        reason: DequeueReason,
    },
    DtmfReceived {
        digit: String,
    },
    GatherEnded {
        digits: String,
        status: Option<String>,
    },
    ForkStarted,
    ForkStopped,
    PlaybackStarted {
        media_url: Option<String>,
    },
    PlaybackEnded {
        media_url: Option<String>,
        status: Option<String>,
    },
    SpeakStarted,
    SpeakEnded {
        status: Option<String>,
    },
    RecordingSaved {
        recording_urls: RecordingUrls,
        public_recording_urls: RecordingUrls,
    },
    RecordingError {
        reason: Option<String>,
    },
    ReferStarted,
    ReferCompleted,
    ReferFailed {
        sip_notify_response: Option<i64>,
    },
    Transcription {
        transcription_data: TranscriptionData,
    },
    StreamingStarted,
    StreamingStopped,
    /// Event type this model does not recognize. Accepted and logged; never
    /// drives a state machine.
    Unknown {
        event_type: String,
    },
}

impl EventKind {
    pub fn event_type(&self) -> &str {
        match self {
            EventKind::Initiated { .. } => "call.initiated",
            EventKind::Answered { .. } => "call.answered",
            EventKind::Bridged { .. } => "call.bridged",
            EventKind::Hangup { .. } => "call.hangup",
            EventKind::Enqueued { .. } => "call.enqueued",
            EventKind::Dequeued { .. } => "call.dequeued",
            EventKind::DtmfReceived { .. } => "call.dtmf.received",
            EventKind::GatherEnded { .. } => "call.gather.ended",
            EventKind::ForkStarted => "call.fork.started",
            EventKind::ForkStopped => "call.fork.stopped",
            EventKind::PlaybackStarted { .. } => "call.playback.started",
            EventKind::PlaybackEnded { .. } => "call.playback.ended",
            EventKind::SpeakStarted => "call.speak.started",
            EventKind::SpeakEnded { .. } => "call.speak.ended",
            EventKind::RecordingSaved { .. } => "call.recording.saved",
            EventKind::RecordingError { .. } => "call.recording.error",
            EventKind::ReferStarted => "call.refer.started",
            EventKind::ReferCompleted => "call.refer.completed",
            EventKind::ReferFailed { .. } => "call.refer.failed",
            EventKind::Transcription { .. } => "call.transcription",
            EventKind::StreamingStarted => "streaming.started",
            EventKind::StreamingStopped => "streaming.stopped",
            EventKind::Unknown { event_type } => event_type,
        }
    }

    pub fn family(&self) -> EventFamily {
        match self {
            EventKind::Initiated { .. }
            | EventKind::Answered { .. }
            | EventKind::Bridged { .. }
            | EventKind::Hangup { .. } => EventFamily::Lifecycle,
            EventKind::Enqueued { .. } | EventKind::Dequeued { .. } => EventFamily::Queue,
            EventKind::DtmfReceived { .. } | EventKind::GatherEnded { .. } => EventFamily::Dtmf,
            EventKind::ForkStarted
            | EventKind::ForkStopped
            | EventKind::PlaybackStarted { .. }
            | EventKind::PlaybackEnded { .. }
            | EventKind::SpeakStarted
            | EventKind::SpeakEnded { .. } => EventFamily::Media,
            EventKind::RecordingSaved { .. } | EventKind::RecordingError { .. } => {
                EventFamily::Recording
            }
            EventKind::ReferStarted | EventKind::ReferCompleted | EventKind::ReferFailed { .. } => {
                EventFamily::Refer
            }
            EventKind::StreamingStarted | EventKind::StreamingStopped => EventFamily::Streaming,
            EventKind::Transcription { .. } => EventFamily::Transcription,
            EventKind::Unknown { .. } => EventFamily::Other,
        }
    }

    /// Whether this event can create a Call projection on its own. Only
    /// `call.initiated` bootstraps inbound calls the client did not dial.
    pub fn may_create_call(&self) -> bool {
        matches!(self, EventKind::Initiated { .. })
    }
}

/// A fully parsed webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub identity: CallIdentity,
    pub kind: EventKind,
}

impl EventEnvelope {
    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }

    /// Parse a raw webhook body. Accepts both the enveloped form
    /// (`{"data": {...}}`) and the bare event object.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let data = match value.get("data") {
            Some(inner) => inner.clone(),
            None => value,
        };
        let raw: RawEvent = serde_json::from_value(data)
            .map_err(|e| DomainError::MalformedEvent(format!("undecodable envelope: {e}")))?;

        let identity: CallIdentity =
            serde_json::from_value(raw.payload.clone()).map_err(|e| {
                DomainError::MalformedEvent(format!(
                    "event {} ({}) missing identity fields: {e}",
                    raw.id, raw.event_type
                ))
            })?;

        let kind = parse_kind(&raw.event_type, raw.payload)?;

        Ok(EventEnvelope {
            id: EventId::from_uuid(raw.id),
            occurred_at: raw.occurred_at,
            identity,
            kind,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: Uuid,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: serde_json::Value,
}

fn detail<T: serde::de::DeserializeOwned>(
    event_type: &str,
    payload: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| DomainError::MalformedEvent(format!("{event_type} payload: {e}")))
}

fn parse_kind(event_type: &str, payload: serde_json::Value) -> Result<EventKind> {
    #[derive(Deserialize)]
    struct Initiated {
        direction: CallDirection,
        from: String,
        to: String,
        state: CallState,
    }
    #[derive(Deserialize)]
    struct Stateful {
        state: CallState,
    }
    #[derive(Deserialize)]
    struct Hangup {
        hangup_cause: Option<HangupCause>,
        hangup_source: Option<HangupSource>,
        sip_hangup_cause: Option<String>,
    }
    #[derive(Deserialize)]
    struct Enqueued {
        queue: QueueName,
        current_position: u32,
    }
    #[derive(Deserialize)]
    struct Dequeued {
        queue: QueueName,
        queue_position: u32,
        reason: DequeueReason,
    }
    #[derive(Deserialize)]
    struct Dtmf {
        digit: String,
    }
    #[derive(Deserialize)]
    struct Gather {
        digits: String,
        status: Option<String>,
    }
    #[derive(Deserialize)]
    struct Playback {
        media_url: Option<String>,
        status: Option<String>,
    }
    #[derive(Deserialize)]
    struct Speak {
        status: Option<String>,
    }
    #[derive(Deserialize)]
    struct Recording {
        #[serde(default)]
        recording_urls: RecordingUrls,
        #[serde(default)]
        public_recording_urls: RecordingUrls,
    }
    #[derive(Deserialize)]
    struct RecordingFailure {
        reason: Option<String>,
    }
    #[derive(Deserialize)]
    struct ReferFailure {
        sip_notify_response: Option<i64>,
    }
    #[derive(Deserialize)]
    struct Transcribed {
        transcription_data: TranscriptionData,
    }

    let kind = match event_type {
        "call.initiated" => {
            let d: Initiated = detail(event_type, payload)?;
            EventKind::Initiated {
                direction: d.direction,
                from: d.from,
                to: d.to,
                state: d.state,
            }
        }
        "call.answered" => {
            let d: Stateful = detail(event_type, payload)?;
            EventKind::Answered { state: d.state }
        }
        "call.bridged" => {
            let d: Stateful = detail(event_type, payload)?;
            EventKind::Bridged { state: d.state }
        }
        "call.hangup" => {
            let d: Hangup = detail(event_type, payload)?;
            EventKind::Hangup {
                hangup_cause: d.hangup_cause,
                hangup_source: d.hangup_source,
                sip_hangup_cause: d.sip_hangup_cause,
            }
        }
        "call.enqueued" => {
            let d: Enqueued = detail(event_type, payload)?;
            EventKind::Enqueued {
                queue: d.queue,
                current_position: d.current_position,
            }
        }
        "call.dequeued" => {
            let d: Dequeued = detail(event_type, payload)?;
            EventKind::Dequeued {
                queue: d.queue,
                queue_position: d.queue_position,
                reason: d.reason,
            }
        }
        "call.dtmf.received" => {
            let d: Dtmf = detail(event_type, payload)?;
            EventKind::DtmfReceived { digit: d.digit }
        }
        "call.gather.ended" => {
            let d: Gather = detail(event_type, payload)?;
            EventKind::GatherEnded {
                digits: d.digits,
                status: d.status,
            }
        }
        "call.fork.started" => EventKind::ForkStarted,
        "call.fork.stopped" => EventKind::ForkStopped,
        "call.playback.started" => {
            let d: Playback = detail(event_type, payload)?;
            EventKind::PlaybackStarted {
                media_url: d.media_url,
            }
        }
        "call.playback.ended" => {
            let d: Playback = detail(event_type, payload)?;
            EventKind::PlaybackEnded {
                media_url: d.media_url,
                status: d.status,
            }
        }
        "call.speak.started" => EventKind::SpeakStarted,
        "call.speak.ended" => {
            let d: Speak = detail(event_type, payload)?;
            EventKind::SpeakEnded { status: d.status }
        }
        "call.recording.saved" => {
            let d: Recording = detail(event_type, payload)?;
            EventKind::RecordingSaved {
                recording_urls: d.recording_urls,
                public_recording_urls: d.public_recording_urls,
            }
        }
        "call.recording.error" => {
            let d: RecordingFailure = detail(event_type, payload)?;
            EventKind::RecordingError { reason: d.reason }
        }
        "call.refer.started" => EventKind::ReferStarted,
        "call.refer.completed" => EventKind::ReferCompleted,
        "call.refer.failed" => {
            let d: ReferFailure = detail(event_type, payload)?;
            EventKind::ReferFailed {
                sip_notify_response: d.sip_notify_response,
            }
        }
        "call.transcription" => {
            let d: Transcribed = detail(event_type, payload)?;
            EventKind::Transcription {
                transcription_data: d.transcription_data,
            }
        }
        "streaming.started" => EventKind::StreamingStarted,
        "streaming.stopped" => EventKind::StreamingStopped,
        other => EventKind::Unknown {
            event_type: other.to_string(),
        },
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_payload() -> serde_json::Value {
        json!({
            "call_control_id": "v3:leg-a",
            "call_leg_id": "leg-a",
            "call_session_id": "session-1",
            "connection_id": "c1",
            "client_state": "aGVsbG8="
        })
    }

    fn envelope(event_type: &str, mut payload: serde_json::Value) -> serde_json::Value {
        for (k, v) in base_payload().as_object().unwrap() {
            payload[k] = v.clone();
        }
        json!({
            "data": {
                "id": "428c31b6-7af4-4bcb-b68e-5013ef9657c1",
                "event_type": event_type,
                "occurred_at": "2024-05-01T12:00:00Z",
                "record_type": "event",
                "payload": payload
            }
        })
    }

    #[test]
    fn test_parse_answered() {
        let event =
            EventEnvelope::from_json(envelope("call.answered", json!({"state": "answered"})))
                .unwrap();
        assert_eq!(event.event_type(), "call.answered");
        assert_eq!(event.identity.call_control_id.as_str(), "v3:leg-a");
        assert!(matches!(
            event.kind,
            EventKind::Answered {
                state: CallState::Answered
            }
        ));
    }

    #[test]
    fn test_parse_hangup() {
        let event = EventEnvelope::from_json(envelope(
            "call.hangup",
            json!({"hangup_cause": "normal_clearing", "hangup_source": "callee"}),
        ))
        .unwrap();
        match event.kind {
            EventKind::Hangup {
                hangup_cause,
                hangup_source,
                ..
            } => {
                assert_eq!(hangup_cause, Some(HangupCause::NormalClearing));
                assert_eq!(hangup_source, Some(HangupSource::Callee));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_parse_dequeued() {
        let event = EventEnvelope::from_json(envelope(
            "call.dequeued",
            json!({"queue": "support", "queue_position": 1, "reason": "bridged"}),
        ))
        .unwrap();
        assert!(matches!(
            event.kind,
            EventKind::Dequeued {
                reason: DequeueReason::Bridged,
                queue_position: 1,
                ..
            }
        ));
        assert_eq!(event.kind.family(), EventFamily::Queue);
    }

    #[test]
    fn test_unknown_event_type_is_accepted() {
        let event =
            EventEnvelope::from_json(envelope("call.machine.detection.ended", json!({})))
                .unwrap();
        assert!(matches!(event.kind, EventKind::Unknown { .. }));
        assert_eq!(event.event_type(), "call.machine.detection.ended");
    }

    #[test]
    fn test_missing_identity_is_malformed() {
        let raw = json!({
            "data": {
                "id": "428c31b6-7af4-4bcb-b68e-5013ef9657c1",
                "event_type": "call.answered",
                "occurred_at": "2024-05-01T12:00:00Z",
                "payload": { "state": "answered" }
            }
        });
        let err = EventEnvelope::from_json(raw).unwrap_err();
        assert!(matches!(err, DomainError::MalformedEvent(_)));
    }

    #[test]
    fn test_bare_event_without_data_wrapper() {
        let mut payload = base_payload();
        payload["hangup_cause"] = json!("timeout");
        let raw = json!({
            "id": "428c31b6-7af4-4bcb-b68e-5013ef9657c1",
            "event_type": "call.hangup",
            "occurred_at": "2024-05-01T12:00:00Z",
            "payload": payload
        });
        let event = EventEnvelope::from_json(raw).unwrap();
        assert!(matches!(event.kind, EventKind::Hangup { .. }));
    }

    #[test]
    fn test_only_initiated_creates_calls() {
        let initiated = EventEnvelope::from_json(envelope(
            "call.initiated",
            json!({"direction": "incoming", "from": "+15550001", "to": "+15550002", "state": "parked"}),
        ))
        .unwrap();
        assert!(initiated.kind.may_create_call());

        let answered =
            EventEnvelope::from_json(envelope("call.answered", json!({"state": "answered"})))
                .unwrap();
        assert!(!answered.kind.may_create_call());
    }
}

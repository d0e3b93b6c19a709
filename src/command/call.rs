//! Call leg commands
//!
//! One request struct per operation, mirroring the platform's body shapes.
//! Optional fields are omitted from the serialized body rather than sent as
//! null. `command_id` and `client_state` ride inside the body on every
//! operation that supports them.

use serde::{Deserialize, Serialize};

use crate::command::{encode_body, CommandSpec, Method, SipHeader};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallControlId, ClientState, CommandId, ConnectionId, QueueName, ResourceId,
};

/// Destination of a dial; the platform accepts a single URI or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DialTarget {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for DialTarget {
    fn from(value: &str) -> Self {
        DialTarget::One(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsweringMachineDetection {
    Premium,
    Detect,
    DetectBeep,
    DetectWords,
    GreetingEnd,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTrack {
    InboundTrack,
    OutboundTrack,
    BothTracks,
}

/// Cause sent when rejecting an unanswered incoming call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectCause {
    CallRejected,
    UserBusy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingChannels {
    Single,
    Dual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingFormat {
    Wav,
    Mp3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialRequest {
    pub to: DialTarget,
    pub from: String,
    pub connection_id: ConnectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_codecs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answering_machine_detection: Option<AnsweringMachineDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<SipHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_headers: Option<Vec<SipHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_track: Option<StreamTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

impl DialRequest {
    pub fn new(connection_id: ConnectionId, from: impl Into<String>, to: DialTarget) -> Self {
        Self {
            to,
            from: from.into(),
            connection_id,
            from_display_name: None,
            audio_url: None,
            media_name: None,
            preferred_codecs: None,
            timeout_secs: None,
            time_limit_secs: None,
            answering_machine_detection: None,
            custom_headers: None,
            sip_headers: None,
            stream_url: None,
            stream_track: None,
            webhook_url: None,
            client_state: None,
            command_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<SipHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_headers: Option<Vec<SipHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_track: Option<StreamTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Bridge to another leg, or to the head of a queue. The two targets are
/// mutually exclusive; the platform rejects a request naming both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_control_id: Option<CallControlId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub park_after_unbridge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub queue_name: QueueName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_time_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

impl EnqueueRequest {
    pub fn new(queue_name: QueueName) -> Self {
        Self {
            queue_name,
            max_size: None,
            max_wait_time_secs: None,
            client_state: None,
            command_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HangupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaveQueueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub cause: RejectCause,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answering_machine_detection: Option<AnsweringMachineDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_auth_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_auth_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<SipHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_headers: Option<Vec<SipHeader>>,
    /// Client state seeded onto the new leg created by the transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_leg_client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

impl TransferRequest {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: None,
            from_display_name: None,
            audio_url: None,
            media_name: None,
            timeout_secs: None,
            time_limit_secs: None,
            answering_machine_detection: None,
            sip_auth_username: None,
            sip_auth_password: None,
            custom_headers: None,
            sip_headers: None,
            target_leg_client_state: None,
            webhook_url: None,
            client_state: None,
            command_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferRequest {
    pub sip_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_auth_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_auth_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<Vec<SipHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendDtmfRequest {
    /// Digits 0-9, A-D, * and #, with w/W for half and full second pauses.
    pub digits: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayAudioRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_content: Option<String>,
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_legs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopAudioRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakTextRequest {
    pub language: String,
    pub voice: String,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatherRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminating_digit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_digits: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_digit_timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatherUsingAudioRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_tries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminating_digit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_digits: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_digit_timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherUsingSpeakRequest {
    pub language: String,
    pub voice: String,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_tries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminating_digit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_digits: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_digit_timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatherStopRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForkStartRequest {
    /// Address where the forked RTP of the inbound track is sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx: Option<String>,
    /// Address where the forked RTP of the outbound track is sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForkStopRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRecordingRequest {
    pub channels: RecordingChannels,
    pub format: RecordingFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_beep: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopRecordingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PauseRecordingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeRecordingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartStreamRequest {
    pub stream_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_track: Option<StreamTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopStreamRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartTranscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interim_results: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_tracks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopTranscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

/// Replaces the leg's client state. Unlike every other command this one has
/// no optional fields: the new state is the whole point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStateRequest {
    pub client_state: ClientState,
}

/// A command addressed to a call leg, or a dial that creates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallCommand {
    Dial(DialRequest),
    Answer {
        call_control_id: CallControlId,
        request: AnswerRequest,
    },
    Bridge {
        call_control_id: CallControlId,
        request: BridgeRequest,
    },
    Enqueue {
        call_control_id: CallControlId,
        request: EnqueueRequest,
    },
    Hangup {
        call_control_id: CallControlId,
        request: HangupRequest,
    },
    LeaveQueue {
        call_control_id: CallControlId,
        request: LeaveQueueRequest,
    },
    Reject {
        call_control_id: CallControlId,
        request: RejectRequest,
    },
    Transfer {
        call_control_id: CallControlId,
        request: TransferRequest,
    },
    Refer {
        call_control_id: CallControlId,
        request: ReferRequest,
    },
    SendDtmf {
        call_control_id: CallControlId,
        request: SendDtmfRequest,
    },
    PlaybackStart {
        call_control_id: CallControlId,
        request: PlayAudioRequest,
    },
    PlaybackStop {
        call_control_id: CallControlId,
        request: StopAudioRequest,
    },
    Speak {
        call_control_id: CallControlId,
        request: SpeakTextRequest,
    },
    Gather {
        call_control_id: CallControlId,
        request: GatherRequest,
    },
    GatherUsingAudio {
        call_control_id: CallControlId,
        request: GatherUsingAudioRequest,
    },
    GatherUsingSpeak {
        call_control_id: CallControlId,
        request: GatherUsingSpeakRequest,
    },
    GatherStop {
        call_control_id: CallControlId,
        request: GatherStopRequest,
    },
    ForkStart {
        call_control_id: CallControlId,
        request: ForkStartRequest,
    },
    ForkStop {
        call_control_id: CallControlId,
        request: ForkStopRequest,
    },
    RecordStart {
        call_control_id: CallControlId,
        request: StartRecordingRequest,
    },
    RecordStop {
        call_control_id: CallControlId,
        request: StopRecordingRequest,
    },
    RecordPause {
        call_control_id: CallControlId,
        request: PauseRecordingRequest,
    },
    RecordResume {
        call_control_id: CallControlId,
        request: ResumeRecordingRequest,
    },
    StreamingStart {
        call_control_id: CallControlId,
        request: StartStreamRequest,
    },
    StreamingStop {
        call_control_id: CallControlId,
        request: StopStreamRequest,
    },
    TranscriptionStart {
        call_control_id: CallControlId,
        request: StartTranscriptionRequest,
    },
    TranscriptionStop {
        call_control_id: CallControlId,
        request: StopTranscriptionRequest,
    },
    UpdateClientState {
        call_control_id: CallControlId,
        request: UpdateStateRequest,
    },
}

impl CallCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CallCommand::Dial(_) => "dial",
            CallCommand::Answer { .. } => "answer",
            CallCommand::Bridge { .. } => "bridge",
            CallCommand::Enqueue { .. } => "enqueue",
            CallCommand::Hangup { .. } => "hangup",
            CallCommand::LeaveQueue { .. } => "leave_queue",
            CallCommand::Reject { .. } => "reject",
            CallCommand::Transfer { .. } => "transfer",
            CallCommand::Refer { .. } => "refer",
            CallCommand::SendDtmf { .. } => "send_dtmf",
            CallCommand::PlaybackStart { .. } => "playback_start",
            CallCommand::PlaybackStop { .. } => "playback_stop",
            CallCommand::Speak { .. } => "speak",
            CallCommand::Gather { .. } => "gather",
            CallCommand::GatherUsingAudio { .. } => "gather_using_audio",
            CallCommand::GatherUsingSpeak { .. } => "gather_using_speak",
            CallCommand::GatherStop { .. } => "gather_stop",
            CallCommand::ForkStart { .. } => "fork_start",
            CallCommand::ForkStop { .. } => "fork_stop",
            CallCommand::RecordStart { .. } => "record_start",
            CallCommand::RecordStop { .. } => "record_stop",
            CallCommand::RecordPause { .. } => "record_pause",
            CallCommand::RecordResume { .. } => "record_resume",
            CallCommand::StreamingStart { .. } => "streaming_start",
            CallCommand::StreamingStop { .. } => "streaming_stop",
            CallCommand::TranscriptionStart { .. } => "transcription_start",
            CallCommand::TranscriptionStop { .. } => "transcription_stop",
            CallCommand::UpdateClientState { .. } => "client_state_update",
        }
    }

    pub fn call_control_id(&self) -> Option<&CallControlId> {
        match self {
            CallCommand::Dial(_) => None,
            CallCommand::Answer {
                call_control_id, ..
            }
            | CallCommand::Bridge {
                call_control_id, ..
            }
            | CallCommand::Enqueue {
                call_control_id, ..
            }
            | CallCommand::Hangup {
                call_control_id, ..
            }
            | CallCommand::LeaveQueue {
                call_control_id, ..
            }
            | CallCommand::Reject {
                call_control_id, ..
            }
            | CallCommand::Transfer {
                call_control_id, ..
            }
            | CallCommand::Refer {
                call_control_id, ..
            }
            | CallCommand::SendDtmf {
                call_control_id, ..
            }
            | CallCommand::PlaybackStart {
                call_control_id, ..
            }
            | CallCommand::PlaybackStop {
                call_control_id, ..
            }
            | CallCommand::Speak {
                call_control_id, ..
            }
            | CallCommand::Gather {
                call_control_id, ..
            }
            | CallCommand::GatherUsingAudio {
                call_control_id, ..
            }
            | CallCommand::GatherUsingSpeak {
                call_control_id, ..
            }
            | CallCommand::GatherStop {
                call_control_id, ..
            }
            | CallCommand::ForkStart {
                call_control_id, ..
            }
            | CallCommand::ForkStop {
                call_control_id, ..
            }
            | CallCommand::RecordStart {
                call_control_id, ..
            }
            | CallCommand::RecordStop {
                call_control_id, ..
            }
            | CallCommand::RecordPause {
                call_control_id, ..
            }
            | CallCommand::RecordResume {
                call_control_id, ..
            }
            | CallCommand::StreamingStart {
                call_control_id, ..
            }
            | CallCommand::StreamingStop {
                call_control_id, ..
            }
            | CallCommand::TranscriptionStart {
                call_control_id, ..
            }
            | CallCommand::TranscriptionStop {
                call_control_id, ..
            }
            | CallCommand::UpdateClientState {
                call_control_id, ..
            } => Some(call_control_id),
        }
    }

    pub fn target(&self) -> Option<ResourceId> {
        self.call_control_id()
            .map(|id| ResourceId::Call(id.clone()))
    }

    pub fn command_id(&self) -> Option<&CommandId> {
        match self {
            CallCommand::Dial(r) => r.command_id.as_ref(),
            CallCommand::Answer { request, .. } => request.command_id.as_ref(),
            CallCommand::Bridge { request, .. } => request.command_id.as_ref(),
            CallCommand::Enqueue { request, .. } => request.command_id.as_ref(),
            CallCommand::Hangup { request, .. } => request.command_id.as_ref(),
            CallCommand::LeaveQueue { request, .. } => request.command_id.as_ref(),
            CallCommand::Reject { request, .. } => request.command_id.as_ref(),
            CallCommand::Transfer { request, .. } => request.command_id.as_ref(),
            CallCommand::Refer { request, .. } => request.command_id.as_ref(),
            CallCommand::SendDtmf { request, .. } => request.command_id.as_ref(),
            CallCommand::PlaybackStart { request, .. } => request.command_id.as_ref(),
            CallCommand::PlaybackStop { request, .. } => request.command_id.as_ref(),
            CallCommand::Speak { request, .. } => request.command_id.as_ref(),
            CallCommand::Gather { request, .. } => request.command_id.as_ref(),
            CallCommand::GatherUsingAudio { request, .. } => request.command_id.as_ref(),
            CallCommand::GatherUsingSpeak { request, .. } => request.command_id.as_ref(),
            CallCommand::GatherStop { request, .. } => request.command_id.as_ref(),
            CallCommand::ForkStart { request, .. } => request.command_id.as_ref(),
            CallCommand::ForkStop { request, .. } => request.command_id.as_ref(),
            CallCommand::RecordStart { request, .. } => request.command_id.as_ref(),
            CallCommand::RecordStop { request, .. } => request.command_id.as_ref(),
            CallCommand::RecordPause { request, .. } => request.command_id.as_ref(),
            CallCommand::RecordResume { request, .. } => request.command_id.as_ref(),
            CallCommand::StreamingStart { request, .. } => request.command_id.as_ref(),
            CallCommand::StreamingStop { request, .. } => request.command_id.as_ref(),
            CallCommand::TranscriptionStart { request, .. } => request.command_id.as_ref(),
            CallCommand::TranscriptionStop { request, .. } => request.command_id.as_ref(),
            CallCommand::UpdateClientState { .. } => None,
        }
    }

    pub fn client_state(&self) -> Option<&ClientState> {
        match self {
            CallCommand::Dial(r) => r.client_state.as_ref(),
            CallCommand::Answer { request, .. } => request.client_state.as_ref(),
            CallCommand::Bridge { request, .. } => request.client_state.as_ref(),
            CallCommand::Enqueue { request, .. } => request.client_state.as_ref(),
            CallCommand::Hangup { request, .. } => request.client_state.as_ref(),
            CallCommand::LeaveQueue { request, .. } => request.client_state.as_ref(),
            CallCommand::Reject { request, .. } => request.client_state.as_ref(),
            CallCommand::Transfer { request, .. } => request.client_state.as_ref(),
            CallCommand::Refer { request, .. } => request.client_state.as_ref(),
            CallCommand::SendDtmf { request, .. } => request.client_state.as_ref(),
            CallCommand::PlaybackStart { request, .. } => request.client_state.as_ref(),
            CallCommand::PlaybackStop { request, .. } => request.client_state.as_ref(),
            CallCommand::Speak { request, .. } => request.client_state.as_ref(),
            CallCommand::Gather { request, .. } => request.client_state.as_ref(),
            CallCommand::GatherUsingAudio { request, .. } => request.client_state.as_ref(),
            CallCommand::GatherUsingSpeak { request, .. } => request.client_state.as_ref(),
            CallCommand::GatherStop { request, .. } => request.client_state.as_ref(),
            CallCommand::ForkStart { request, .. } => request.client_state.as_ref(),
            CallCommand::ForkStop { request, .. } => request.client_state.as_ref(),
            CallCommand::RecordStart { request, .. } => request.client_state.as_ref(),
            CallCommand::RecordStop { request, .. } => request.client_state.as_ref(),
            CallCommand::RecordPause { request, .. } => request.client_state.as_ref(),
            CallCommand::RecordResume { request, .. } => request.client_state.as_ref(),
            CallCommand::StreamingStart { request, .. } => request.client_state.as_ref(),
            CallCommand::StreamingStop { request, .. } => request.client_state.as_ref(),
            CallCommand::TranscriptionStart { request, .. } => request.client_state.as_ref(),
            CallCommand::TranscriptionStop { request, .. } => request.client_state.as_ref(),
            CallCommand::UpdateClientState { request, .. } => Some(&request.client_state),
        }
    }

    pub fn spec(&self) -> Result<CommandSpec> {
        fn action(id: &CallControlId, name: &str, body: serde_json::Value) -> CommandSpec {
            CommandSpec::post(format!("/calls/{id}/actions/{name}"), body)
        }

        let spec = match self {
            CallCommand::Dial(r) => CommandSpec::post("/calls", encode_body(r)?),
            CallCommand::UpdateClientState {
                call_control_id,
                request,
            } => CommandSpec {
                method: Method::Put,
                path: format!("/calls/{call_control_id}/actions/client_state_update"),
                query: Vec::new(),
                body: Some(encode_body(request)?),
            },
            CallCommand::Answer {
                call_control_id,
                request,
            } => action(call_control_id, "answer", encode_body(request)?),
            CallCommand::Bridge {
                call_control_id,
                request,
            } => action(call_control_id, "bridge", encode_body(request)?),
            CallCommand::Enqueue {
                call_control_id,
                request,
            } => action(call_control_id, "enqueue", encode_body(request)?),
            CallCommand::Hangup {
                call_control_id,
                request,
            } => action(call_control_id, "hangup", encode_body(request)?),
            CallCommand::LeaveQueue {
                call_control_id,
                request,
            } => action(call_control_id, "leave_queue", encode_body(request)?),
            CallCommand::Reject {
                call_control_id,
                request,
            } => action(call_control_id, "reject", encode_body(request)?),
            CallCommand::Transfer {
                call_control_id,
                request,
            } => action(call_control_id, "transfer", encode_body(request)?),
            CallCommand::Refer {
                call_control_id,
                request,
            } => action(call_control_id, "refer", encode_body(request)?),
            CallCommand::SendDtmf {
                call_control_id,
                request,
            } => action(call_control_id, "send_dtmf", encode_body(request)?),
            CallCommand::PlaybackStart {
                call_control_id,
                request,
            } => action(call_control_id, "playback_start", encode_body(request)?),
            CallCommand::PlaybackStop {
                call_control_id,
                request,
            } => action(call_control_id, "playback_stop", encode_body(request)?),
            CallCommand::Speak {
                call_control_id,
                request,
            } => action(call_control_id, "speak", encode_body(request)?),
            CallCommand::Gather {
                call_control_id,
                request,
            } => action(call_control_id, "gather", encode_body(request)?),
            CallCommand::GatherUsingAudio {
                call_control_id,
                request,
            } => action(call_control_id, "gather_using_audio", encode_body(request)?),
            CallCommand::GatherUsingSpeak {
                call_control_id,
                request,
            } => action(call_control_id, "gather_using_speak", encode_body(request)?),
            CallCommand::GatherStop {
                call_control_id,
                request,
            } => action(call_control_id, "gather_stop", encode_body(request)?),
            CallCommand::ForkStart {
                call_control_id,
                request,
            } => action(call_control_id, "fork_start", encode_body(request)?),
            CallCommand::ForkStop {
                call_control_id,
                request,
            } => action(call_control_id, "fork_stop", encode_body(request)?),
            CallCommand::RecordStart {
                call_control_id,
                request,
            } => action(call_control_id, "record_start", encode_body(request)?),
            CallCommand::RecordStop {
                call_control_id,
                request,
            } => action(call_control_id, "record_stop", encode_body(request)?),
            CallCommand::RecordPause {
                call_control_id,
                request,
            } => action(call_control_id, "record_pause", encode_body(request)?),
            CallCommand::RecordResume {
                call_control_id,
                request,
            } => action(call_control_id, "record_resume", encode_body(request)?),
            CallCommand::StreamingStart {
                call_control_id,
                request,
            } => action(call_control_id, "streaming_start", encode_body(request)?),
            CallCommand::StreamingStop {
                call_control_id,
                request,
            } => action(call_control_id, "streaming_stop", encode_body(request)?),
            CallCommand::TranscriptionStart {
                call_control_id,
                request,
            } => action(
                call_control_id,
                "transcription_start",
                encode_body(request)?,
            ),
            CallCommand::TranscriptionStop {
                call_control_id,
                request,
            } => action(
                call_control_id,
                "transcription_stop",
                encode_body(request)?,
            ),
        };
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_spec() {
        let request = DialRequest::new(
            ConnectionId::new("c1"),
            "+18005550101",
            DialTarget::from("+18005550100"),
        );
        let spec = CallCommand::Dial(request).spec().unwrap();
        assert_eq!(spec.method, Method::Post);
        assert_eq!(spec.path, "/calls");

        let body = spec.body.unwrap();
        assert_eq!(body["to"], "+18005550100");
        assert_eq!(body["from"], "+18005550101");
        // Optional fields are omitted, not null.
        assert!(body.get("timeout_secs").is_none());
    }

    #[test]
    fn test_action_path_and_body() {
        let id = CallControlId::new("v3:leg-a");
        let command = CallCommand::SendDtmf {
            call_control_id: id,
            request: SendDtmfRequest {
                digits: "1w2#".to_string(),
                duration_millis: Some(300),
                client_state: None,
                command_id: Some(CommandId::new("cmd-1")),
            },
        };
        let spec = command.spec().unwrap();
        assert_eq!(spec.path, "/calls/v3:leg-a/actions/send_dtmf");
        assert_eq!(spec.body.unwrap()["digits"], "1w2#");
        assert_eq!(command.command_id().unwrap().as_str(), "cmd-1");
    }

    #[test]
    fn test_update_client_state_uses_put() {
        let command = CallCommand::UpdateClientState {
            call_control_id: CallControlId::new("v3:leg-a"),
            request: UpdateStateRequest {
                client_state: ClientState::encode(b"step-2"),
            },
        };
        let spec = command.spec().unwrap();
        assert_eq!(spec.method, Method::Put);
        assert_eq!(spec.path, "/calls/v3:leg-a/actions/client_state_update");
        assert!(command.client_state().is_some());
    }

    #[test]
    fn test_dial_has_no_target_yet() {
        let request = DialRequest::new(
            ConnectionId::new("c1"),
            "+18005550101",
            DialTarget::Many(vec!["+18005550100".to_string(), "sip:a@b.co".to_string()]),
        );
        assert!(CallCommand::Dial(request).target().is_none());
    }

    #[test]
    fn test_reject_cause_wire_format() {
        assert_eq!(
            serde_json::to_string(&RejectCause::UserBusy).unwrap(),
            "\"USER_BUSY\""
        );
    }
}

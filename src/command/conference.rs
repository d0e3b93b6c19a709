//! Conference commands
//!
//! Participant-set operations (mute, hold and their inverses, play, stop)
//! take a list of call control ids and apply to the whole conference when the
//! list is empty.

use serde::{Deserialize, Serialize};

use crate::command::call::{RecordingChannels, RecordingFormat};
use crate::command::{encode_body, CommandSpec};
use crate::domain::conference::SupervisorRole;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallControlId, ClientState, CommandId, ConferenceId, ResourceId,
};

/// When join/leave beeps are played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeepMode {
    Always,
    Never,
    OnEnter,
    OnExit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConferenceRequest {
    /// The leg the conference is created from; it is bridged in on success.
    pub call_control_id: CallControlId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beep_enabled: Option<BeepMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comfort_noise: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    /// When false, every joining participant is put on hold until the
    /// conference starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_conference_on_create: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

impl CreateConferenceRequest {
    pub fn new(call_control_id: CallControlId, name: impl Into<String>) -> Self {
        Self {
            call_control_id,
            name: name.into(),
            beep_enabled: None,
            comfort_noise: None,
            duration_minutes: None,
            hold_audio_url: None,
            hold_media_name: None,
            max_participants: None,
            start_conference_on_create: None,
            client_state: None,
            command_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialParticipantRequest {
    pub call_control_id: CallControlId,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_conference_on_enter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_role: Option<SupervisorRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_call_control_ids: Option<Vec<CallControlId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConferenceRequest {
    pub call_control_id: CallControlId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beep_enabled: Option<BeepMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_conference_on_exit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_end_conference_on_exit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_media_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_conference_on_enter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_role: Option<SupervisorRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_call_control_ids: Option<Vec<CallControlId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

impl JoinConferenceRequest {
    pub fn new(call_control_id: CallControlId) -> Self {
        Self {
            call_control_id,
            beep_enabled: None,
            end_conference_on_exit: None,
            soft_end_conference_on_exit: None,
            hold: None,
            hold_audio_url: None,
            hold_media_name: None,
            mute: None,
            start_conference_on_enter: None,
            supervisor_role: None,
            whisper_call_control_ids: None,
            client_state: None,
            command_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveConferenceRequest {
    pub call_control_id: CallControlId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beep_enabled: Option<BeepMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

/// Empty `call_control_ids` targets every active participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MuteParticipantsRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub call_control_ids: Vec<CallControlId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnmuteParticipantsRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub call_control_ids: Vec<CallControlId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldParticipantsRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub call_control_ids: Vec<CallControlId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnholdParticipantsRequest {
    pub call_control_ids: Vec<CallControlId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayAudioParticipantsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_control_ids: Option<Vec<CallControlId>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopAudioParticipantsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_control_ids: Option<Vec<CallControlId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakTextParticipantsRequest {
    pub language: String,
    pub voice: String,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_control_ids: Option<Vec<CallControlId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferenceRecordingStartRequest {
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
pub struct ConferenceRecordingStopRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_state: Option<ClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateParticipantRequest {
    pub call_control_id: CallControlId,
    pub supervisor_role: SupervisorRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_call_control_ids: Option<Vec<CallControlId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
}

/// A command addressed to a conference, or a create that makes one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConferenceCommand {
    Create(CreateConferenceRequest),
    DialParticipant {
        conference_id: ConferenceId,
        request: DialParticipantRequest,
    },
    Join {
        conference_id: ConferenceId,
        request: JoinConferenceRequest,
    },
    Leave {
        conference_id: ConferenceId,
        request: LeaveConferenceRequest,
    },
    Mute {
        conference_id: ConferenceId,
        request: MuteParticipantsRequest,
    },
    Unmute {
        conference_id: ConferenceId,
        request: UnmuteParticipantsRequest,
    },
    Hold {
        conference_id: ConferenceId,
        request: HoldParticipantsRequest,
    },
    Unhold {
        conference_id: ConferenceId,
        request: UnholdParticipantsRequest,
    },
    PlayAudio {
        conference_id: ConferenceId,
        request: PlayAudioParticipantsRequest,
    },
    StopAudio {
        conference_id: ConferenceId,
        request: StopAudioParticipantsRequest,
    },
    Speak {
        conference_id: ConferenceId,
        request: SpeakTextParticipantsRequest,
    },
    RecordStart {
        conference_id: ConferenceId,
        request: ConferenceRecordingStartRequest,
    },
    RecordStop {
        conference_id: ConferenceId,
        request: ConferenceRecordingStopRequest,
    },
    UpdateParticipant {
        conference_id: ConferenceId,
        request: UpdateParticipantRequest,
    },
}

impl ConferenceCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ConferenceCommand::Create(_) => "create_conference",
            ConferenceCommand::DialParticipant { .. } => "dial_participant",
            ConferenceCommand::Join { .. } => "join_conference",
            ConferenceCommand::Leave { .. } => "leave_conference",
            ConferenceCommand::Mute { .. } => "mute_participants",
            ConferenceCommand::Unmute { .. } => "unmute_participants",
            ConferenceCommand::Hold { .. } => "hold_participants",
            ConferenceCommand::Unhold { .. } => "unhold_participants",
            ConferenceCommand::PlayAudio { .. } => "play_audio_participants",
            ConferenceCommand::StopAudio { .. } => "stop_audio_participants",
            ConferenceCommand::Speak { .. } => "speak_text_participants",
            ConferenceCommand::RecordStart { .. } => "conference_record_start",
            ConferenceCommand::RecordStop { .. } => "conference_record_stop",
            ConferenceCommand::UpdateParticipant { .. } => "update_participant",
        }
    }

    pub fn conference_id(&self) -> Option<&ConferenceId> {
        match self {
            ConferenceCommand::Create(_) => None,
            ConferenceCommand::DialParticipant { conference_id, .. }
            | ConferenceCommand::Join { conference_id, .. }
            | ConferenceCommand::Leave { conference_id, .. }
            | ConferenceCommand::Mute { conference_id, .. }
            | ConferenceCommand::Unmute { conference_id, .. }
            | ConferenceCommand::Hold { conference_id, .. }
            | ConferenceCommand::Unhold { conference_id, .. }
            | ConferenceCommand::PlayAudio { conference_id, .. }
            | ConferenceCommand::StopAudio { conference_id, .. }
            | ConferenceCommand::Speak { conference_id, .. }
            | ConferenceCommand::RecordStart { conference_id, .. }
            | ConferenceCommand::RecordStop { conference_id, .. }
            | ConferenceCommand::UpdateParticipant { conference_id, .. } => Some(conference_id),
        }
    }

    pub fn target(&self) -> Option<ResourceId> {
        self.conference_id()
            .map(|id| ResourceId::Conference(id.clone()))
    }

    pub fn command_id(&self) -> Option<&CommandId> {
        match self {
            ConferenceCommand::Create(r) => r.command_id.as_ref(),
            ConferenceCommand::DialParticipant { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::Join { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::Leave { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::Speak { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::RecordStart { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::RecordStop { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::UpdateParticipant { request, .. } => request.command_id.as_ref(),
            ConferenceCommand::Mute { .. }
            | ConferenceCommand::Unmute { .. }
            | ConferenceCommand::Hold { .. }
            | ConferenceCommand::Unhold { .. }
            | ConferenceCommand::PlayAudio { .. }
            | ConferenceCommand::StopAudio { .. } => None,
        }
    }

    pub fn client_state(&self) -> Option<&ClientState> {
        match self {
            ConferenceCommand::Create(r) => r.client_state.as_ref(),
            ConferenceCommand::DialParticipant { request, .. } => request.client_state.as_ref(),
            ConferenceCommand::Join { request, .. } => request.client_state.as_ref(),
            ConferenceCommand::RecordStart { request, .. } => request.client_state.as_ref(),
            ConferenceCommand::RecordStop { request, .. } => request.client_state.as_ref(),
            _ => None,
        }
    }

    pub fn spec(&self) -> Result<CommandSpec> {
        fn action(id: &ConferenceId, name: &str, body: serde_json::Value) -> CommandSpec {
            CommandSpec::post(format!("/conferences/{id}/actions/{name}"), body)
        }

        let spec = match self {
            ConferenceCommand::Create(r) => CommandSpec::post("/conferences", encode_body(r)?),
            ConferenceCommand::DialParticipant {
                conference_id,
                request,
            } => action(conference_id, "dial_participant", encode_body(request)?),
            ConferenceCommand::Join {
                conference_id,
                request,
            } => action(conference_id, "join", encode_body(request)?),
            ConferenceCommand::Leave {
                conference_id,
                request,
            } => action(conference_id, "leave", encode_body(request)?),
            ConferenceCommand::Mute {
                conference_id,
                request,
            } => action(conference_id, "mute", encode_body(request)?),
            ConferenceCommand::Unmute {
                conference_id,
                request,
            } => action(conference_id, "unmute", encode_body(request)?),
            ConferenceCommand::Hold {
                conference_id,
                request,
            } => action(conference_id, "hold", encode_body(request)?),
            ConferenceCommand::Unhold {
                conference_id,
                request,
            } => action(conference_id, "unhold", encode_body(request)?),
            ConferenceCommand::PlayAudio {
                conference_id,
                request,
            } => action(conference_id, "play", encode_body(request)?),
            ConferenceCommand::StopAudio {
                conference_id,
                request,
            } => action(conference_id, "stop", encode_body(request)?),
            ConferenceCommand::Speak {
                conference_id,
                request,
            } => action(conference_id, "speak", encode_body(request)?),
            ConferenceCommand::RecordStart {
                conference_id,
                request,
            } => action(conference_id, "record_start", encode_body(request)?),
            ConferenceCommand::RecordStop {
                conference_id,
                request,
            } => action(conference_id, "record_stop", encode_body(request)?),
            ConferenceCommand::UpdateParticipant {
                conference_id,
                request,
            } => action(conference_id, "update", encode_body(request)?),
        };
        Ok(spec)
    }
}

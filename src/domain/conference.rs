//! Conference and participant projections
//!
//! A conference is created from an existing call leg and expires after four
//! hours regardless of activity. Participant identity is the pair
//! (conference_id, call_control_id); a participant record never outlives its
//! conference or its underlying call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::shared::value_objects::{
    CallControlId, CallLegId, ClientState, ConferenceId, ConnectionId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceStatus {
    Init,
    InProgress,
    Completed,
    #[serde(untagged)]
    Unrecognized(String),
}

impl ConferenceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConferenceStatus::Completed)
    }
}

/// Reason the platform reported for ending a conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConferenceEndReason {
    AllLeft,
    EndedViaApi,
    HostLeft,
    TimeExceeded,
    #[serde(untagged)]
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Joining,
    Joined,
    Left,
    #[serde(untagged)]
    Unrecognized(String),
}

/// Supervisor role of a participant. `Barge` behaves as a normal participant,
/// `Monitor` hears everyone muted, `Whisper` is heard only by the whisper
/// targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorRole {
    Barge,
    Monitor,
    None,
    Whisper,
    #[serde(untagged)]
    Unrecognized(String),
}

/// A call leg's membership record within a conference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub call_control_id: CallControlId,
    pub call_leg_id: Option<CallLegId>,
    pub conference_id: ConferenceId,
    pub status: ParticipantStatus,
    pub muted: bool,
    pub on_hold: bool,
    pub whisper_call_control_ids: Vec<CallControlId>,
    pub end_conference_on_exit: bool,
    pub soft_end_conference_on_exit: bool,
    pub supervisor_role: SupervisorRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(conference_id: ConferenceId, call_control_id: CallControlId) -> Self {
        let now = Utc::now();
        Self {
            call_control_id,
            call_leg_id: None,
            conference_id,
            status: ParticipantStatus::Joining,
            muted: false,
            on_hold: false,
            whisper_call_control_ids: Vec::new(),
            end_conference_on_exit: false,
            soft_end_conference_on_exit: false,
            supervisor_role: SupervisorRole::None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_joined(&mut self) {
        self.status = ParticipantStatus::Joined;
        self.updated_at = Utc::now();
    }

    pub fn mark_left(&mut self) {
        self.status = ParticipantStatus::Left;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ParticipantStatus::Joining | ParticipantStatus::Joined
        )
    }
}

/// Conference projection, owning its participant records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    pub name: String,
    pub connection_id: Option<ConnectionId>,
    pub status: ConferenceStatus,
    pub client_state: Option<ClientState>,
    /// Hard TTL enforced by the platform; four hours at most.
    pub expires_at: DateTime<Utc>,
    pub max_participants: u32,
    pub end_reason: Option<ConferenceEndReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Keyed by call control id. Left participants stay here as history;
    /// the active set is a filter over this map.
    pub participants: HashMap<CallControlId, Participant>,
}

impl Conference {
    pub fn new(
        id: ConferenceId,
        name: String,
        status: ConferenceStatus,
        expires_at: DateTime<Utc>,
        max_participants: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            connection_id: None,
            status,
            client_state: None,
            expires_at,
            max_participants,
            end_reason: None,
            created_at: now,
            updated_at: now,
            participants: HashMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Insert a participant in `joining` status, or return the existing
    /// record for the same call control id.
    pub fn upsert_participant(&mut self, call_control_id: CallControlId) -> &mut Participant {
        let conference_id = self.id.clone();
        self.updated_at = Utc::now();
        self.participants
            .entry(call_control_id.clone())
            .or_insert_with(|| Participant::new(conference_id, call_control_id))
    }

    pub fn participant(&self, call_control_id: &CallControlId) -> Option<&Participant> {
        self.participants.get(call_control_id)
    }

    pub fn participant_mut(&mut self, call_control_id: &CallControlId) -> Option<&mut Participant> {
        self.updated_at = Utc::now();
        self.participants.get_mut(call_control_id)
    }

    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values().filter(|p| p.is_active())
    }

    /// Remove a leg from the active set, keeping the record as history.
    pub fn leave(&mut self, call_control_id: &CallControlId) -> bool {
        match self.participants.get_mut(call_control_id) {
            Some(p) if p.is_active() => {
                p.mark_left();
                self.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub fn complete(&mut self, reason: ConferenceEndReason) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ConferenceStatus::Completed;
        self.end_reason = Some(reason);
        self.updated_at = Utc::now();
        for participant in self.participants.values_mut() {
            if participant.is_active() {
                participant.mark_left();
            }
        }
    }

    /// Expiry is platform-enforced but webhook delivery is not guaranteed,
    /// so an elapsed TTL completes the local projection.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.is_terminal() && now >= self.expires_at {
            self.complete(ConferenceEndReason::TimeExceeded);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_conference(status: ConferenceStatus) -> Conference {
        Conference::new(
            ConferenceId::new("conf-1"),
            "standup".to_string(),
            status,
            Utc::now() + Duration::hours(4),
            250,
        )
    }

    #[test]
    fn test_participant_lifecycle() {
        let mut conf = test_conference(ConferenceStatus::InProgress);
        let leg = CallControlId::new("v3:leg-a");

        conf.upsert_participant(leg.clone());
        assert_eq!(
            conf.participant(&leg).unwrap().status,
            ParticipantStatus::Joining
        );

        conf.participant_mut(&leg).unwrap().mark_joined();
        assert_eq!(conf.active_participants().count(), 1);

        assert!(conf.leave(&leg));
        assert_eq!(conf.active_participants().count(), 0);
        // History is retained.
        assert_eq!(
            conf.participant(&leg).unwrap().status,
            ParticipantStatus::Left
        );

        // Leaving twice is a no-op.
        assert!(!conf.leave(&leg));
    }

    #[test]
    fn test_complete_marks_participants_left() {
        let mut conf = test_conference(ConferenceStatus::InProgress);
        let leg = CallControlId::new("v3:leg-a");
        conf.upsert_participant(leg.clone()).mark_joined();

        conf.complete(ConferenceEndReason::EndedViaApi);
        assert!(conf.is_terminal());
        assert_eq!(conf.end_reason, Some(ConferenceEndReason::EndedViaApi));
        assert_eq!(
            conf.participant(&leg).unwrap().status,
            ParticipantStatus::Left
        );
    }

    #[test]
    fn test_expiry_completes_conference() {
        let mut conf = test_conference(ConferenceStatus::InProgress);
        conf.expires_at = Utc::now() - Duration::seconds(1);

        assert!(conf.expire_if_due(Utc::now()));
        assert_eq!(conf.status, ConferenceStatus::Completed);
        assert_eq!(conf.end_reason, Some(ConferenceEndReason::TimeExceeded));

        // Idempotent.
        assert!(!conf.expire_if_due(Utc::now()));
    }

    #[test]
    fn test_expiry_not_due() {
        let mut conf = test_conference(ConferenceStatus::Init);
        assert!(!conf.expire_if_due(Utc::now()));
        assert_eq!(conf.status, ConferenceStatus::Init);
    }
}

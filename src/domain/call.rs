//! Call leg projection and state machine
//!
//! A command acknowledgment applies an optimistic transition; a webhook event
//! for the same leg is authoritative and overwrites it, except that `hangup`
//! is terminal and absorbs everything that arrives afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::value_objects::{
    CallControlId, CallLegId, CallSessionId, ClientState, ConnectionId,
};

/// Call leg state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Initial state, e.g. an inbound call that has not been answered.
    Parked,
    /// An outbound leg being connected.
    Bridging,
    Answered,
    Bridged,
    /// Terminal.
    Hangup,
    /// Value the platform introduced after this model was written.
    #[serde(untagged)]
    Unrecognized(String),
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Hangup)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallState::Parked => "parked",
            CallState::Bridging => "bridging",
            CallState::Answered => "answered",
            CallState::Bridged => "bridged",
            CallState::Hangup => "hangup",
            CallState::Unrecognized(s) => s,
        }
    }
}

/// Direction of a call leg as reported by `call.initiated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Incoming,
    Outgoing,
    #[serde(untagged)]
    Unrecognized(String),
}

/// Reason the platform reported for ending a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HangupCause {
    CallRejected,
    NormalClearing,
    OriginatorCancel,
    Timeout,
    TimeLimit,
    UserBusy,
    NotFound,
    Unspecified,
    #[serde(untagged)]
    Unrecognized(String),
}

/// Which side ended the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HangupSource {
    Caller,
    Callee,
    Unknown,
    #[serde(untagged)]
    Unrecognized(String),
}

/// Outcome of asking a projection to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The projection is already terminal; the request was absorbed.
    TerminalNoOp,
    /// The requested state equals the current one.
    Unchanged,
}

impl Transition {
    pub fn applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Projection of one call leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub call_control_id: CallControlId,
    pub call_leg_id: CallLegId,
    pub call_session_id: CallSessionId,
    pub connection_id: ConnectionId,
    /// Opaque caller state echoed on every event for this leg.
    pub client_state: Option<ClientState>,
    pub state: CallState,
    pub direction: Option<CallDirection>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub hangup_cause: Option<HangupCause>,
    pub hangup_source: Option<HangupSource>,
    /// Dial acknowledgments always report `false`; dialing is asynchronous.
    pub is_alive: bool,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Call {
    pub fn new(
        call_control_id: CallControlId,
        call_leg_id: CallLegId,
        call_session_id: CallSessionId,
        connection_id: ConnectionId,
        state: CallState,
    ) -> Self {
        Self {
            call_control_id,
            call_leg_id,
            call_session_id,
            connection_id,
            client_state: None,
            state,
            direction: None,
            from: None,
            to: None,
            hangup_cause: None,
            hangup_source: None,
            is_alive: false,
            created_at: Utc::now(),
            answered_at: None,
            ended_at: None,
        }
    }

    /// Apply a state change, honoring terminal absorption. The caller decides
    /// whether the change came from an acknowledgment or an event; the rule
    /// is the same for both.
    pub fn transition(&mut self, next: CallState, at: DateTime<Utc>) -> Transition {
        if self.state.is_terminal() {
            return Transition::TerminalNoOp;
        }
        if self.state == next {
            return Transition::Unchanged;
        }

        match &next {
            CallState::Answered => {
                self.is_alive = true;
                self.answered_at.get_or_insert(at);
            }
            CallState::Bridged => {
                self.is_alive = true;
            }
            CallState::Hangup => {
                self.is_alive = false;
                self.ended_at = Some(at);
            }
            _ => {}
        }
        self.state = next;
        Transition::Applied
    }

    /// Record the terminal hangup with its cause.
    pub fn hangup(
        &mut self,
        cause: Option<HangupCause>,
        source: Option<HangupSource>,
        at: DateTime<Utc>,
    ) -> Transition {
        let outcome = self.transition(CallState::Hangup, at);
        if outcome.applied() {
            self.hangup_cause = cause;
            self.hangup_source = source;
        }
        outcome
    }

    /// Overwrite the leg's client state. Later values win; events echo the
    /// current value back and never clear it.
    pub fn set_client_state(&mut self, state: Option<ClientState>) {
        if let Some(state) = state {
            self.client_state = Some(state);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_call() -> Call {
        Call::new(
            CallControlId::new("v3:leg-a"),
            CallLegId::new("leg-a"),
            CallSessionId::new("session-1"),
            ConnectionId::new("c1"),
            CallState::Parked,
        )
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut call = test_call();
        let now = Utc::now();

        assert!(call.transition(CallState::Answered, now).applied());
        assert!(call.is_alive);
        assert!(call.answered_at.is_some());

        assert!(call.transition(CallState::Bridged, now).applied());
        assert_eq!(call.state, CallState::Bridged);

        assert!(call
            .hangup(Some(HangupCause::NormalClearing), None, now)
            .applied());
        assert_eq!(call.state, CallState::Hangup);
        assert!(!call.is_alive);
        assert!(call.ended_at.is_some());
    }

    #[test]
    fn test_hangup_is_absorbing() {
        let mut call = test_call();
        let now = Utc::now();
        call.hangup(Some(HangupCause::Timeout), None, now);

        assert_eq!(
            call.transition(CallState::Answered, now),
            Transition::TerminalNoOp
        );
        assert_eq!(call.state, CallState::Hangup);
        assert_eq!(call.hangup_cause, Some(HangupCause::Timeout));
    }

    #[test]
    fn test_same_state_is_unchanged() {
        let mut call = test_call();
        assert_eq!(
            call.transition(CallState::Parked, Utc::now()),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_client_state_overwrite_not_clear() {
        let mut call = test_call();
        let first = ClientState::encode(b"first");
        let second = ClientState::encode(b"second");

        call.set_client_state(Some(first.clone()));
        assert_eq!(call.client_state, Some(first));

        // None means "not carried on this command", not "clear".
        call.set_client_state(None);
        assert!(call.client_state.is_some());

        call.set_client_state(Some(second.clone()));
        assert_eq!(call.client_state, Some(second));
    }

    #[test]
    fn test_unrecognized_state_parses() {
        let state: CallState = serde_json::from_str("\"warming_up\"").unwrap();
        assert_eq!(state, CallState::Unrecognized("warming_up".to_string()));
        assert!(!state.is_terminal());
    }
}

//! Entity projection
//!
//! Two write paths feed the projections. Acknowledgments apply an optimistic
//! local transition the moment the platform accepts a command; webhook events
//! are authoritative and overwrite whatever the optimistic path guessed.
//! Query responses are treated like events: the platform's snapshot wins.
//!
//! Events addressing a leg this engine has never seen are dropped, with one
//! exception: `call.initiated` creates the projection for inbound calls the
//! client did not dial.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::command::ack::{
    Acknowledgment, CallData, ConferenceData, FaxData, ParticipantData, QueueCallData, QueueData,
};
use crate::command::call::RejectCause;
use crate::command::{CallCommand, Command, ConferenceCommand, FaxCommand, Query};
use crate::config::EngineConfig;
use crate::domain::call::{Call, CallDirection, CallState, HangupCause};
use crate::domain::conference::{
    Conference, ConferenceEndReason, ConferenceStatus, Participant, ParticipantStatus,
    SupervisorRole,
};
use crate::domain::fax::{Fax, FaxQuality, FaxStatus};
use crate::domain::queue::{Queue, QueuedCall};
use crate::domain::shared::value_objects::{
    CallControlId, ConferenceId, ConnectionId, QueueName, ResourceId,
};
use crate::event::{CallIdentity, EventEnvelope, EventKind};
use crate::infrastructure::store::{Projection, ProjectionStore};

/// What happened to an event when it was folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Applied,
    /// Same event id seen before; at-least-once delivery.
    Duplicate,
    /// Unknown leg and the event cannot create one.
    Orphaned,
    /// The projection is terminal and absorbed the event.
    AlreadyTerminal,
    /// Event type outside the modeled surface.
    Unrecognized,
}

/// Folds acknowledgments, events and query snapshots into the store.
pub struct EntityProjector {
    store: Arc<ProjectionStore>,
    config: EngineConfig,
    terminal: Mutex<Vec<ResourceId>>,
}

impl EntityProjector {
    pub fn new(store: Arc<ProjectionStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            terminal: Mutex::new(Vec::new()),
        }
    }

    /// Drain the resources that reached a terminal state since the last
    /// drain. The engine retires their idempotency entries.
    pub async fn take_terminal(&self) -> Vec<ResourceId> {
        std::mem::take(&mut *self.terminal.lock().await)
    }

    async fn note_terminal(&self, resource: ResourceId) {
        self.terminal.lock().await.push(resource);
    }

    async fn with_call<R>(
        &self,
        id: &CallControlId,
        f: impl FnOnce(&mut Call) -> R,
    ) -> Option<R> {
        let slot = self.store.get(&ResourceId::Call(id.clone())).await?;
        let mut projection = slot.lock().await;
        projection.as_call_mut().map(f)
    }

    async fn with_conference<R>(
        &self,
        id: &ConferenceId,
        f: impl FnOnce(&mut Conference) -> R,
    ) -> Option<R> {
        let slot = self.store.get(&ResourceId::Conference(id.clone())).await?;
        let mut projection = slot.lock().await;
        projection.as_conference_mut().map(f)
    }

    async fn with_queue<R>(&self, name: &QueueName, f: impl FnOnce(&mut Queue) -> R) -> Option<R> {
        let slot = self.store.get(&ResourceId::Queue(name.clone())).await?;
        let mut projection = slot.lock().await;
        projection.as_queue_mut().map(f)
    }

    async fn with_queue_or_default<R>(
        &self,
        name: &QueueName,
        max_size: Option<u32>,
        f: impl FnOnce(&mut Queue) -> R,
    ) -> R {
        let default_max = max_size.unwrap_or(self.config.default_queue_max_size);
        let slot = self
            .store
            .get_or_insert_with(ResourceId::Queue(name.clone()), || {
                Projection::Queue(Queue::new(name.clone(), default_max))
            })
            .await;
        let mut projection = slot.lock().await;
        match &mut *projection {
            Projection::Queue(queue) => f(queue),
            _ => unreachable!("queue key resolved to a non-queue projection"),
        }
    }

    // ------------------------------------------------------------------
    // Acknowledgments (optimistic path)
    // ------------------------------------------------------------------

    pub async fn apply_ack(&self, command: &Command, ack: &Acknowledgment) {
        match command {
            Command::Call(call_command) => self.apply_call_ack(call_command, ack).await,
            Command::Conference(conference_command) => {
                self.apply_conference_ack(conference_command, ack).await
            }
            Command::Fax(fax_command) => self.apply_fax_ack(fax_command, ack).await,
            Command::Query(query) => self.apply_query_ack(query, ack).await,
        }
    }

    async fn apply_call_ack(&self, command: &CallCommand, ack: &Acknowledgment) {
        let now = Utc::now();
        match (command, ack) {
            (CallCommand::Dial(request), Acknowledgment::Call(data)) => {
                let mut call = Call::new(
                    data.call_control_id.clone(),
                    data.call_leg_id.clone(),
                    data.call_session_id.clone(),
                    data.connection_id
                        .clone()
                        .unwrap_or_else(|| request.connection_id.clone()),
                    CallState::Bridging,
                );
                call.direction = Some(CallDirection::Outgoing);
                call.from = Some(request.from.clone());
                call.to = Some(dial_target_display(&request.to));
                call.is_alive = data.is_alive;
                call.set_client_state(request.client_state.clone());
                self.store
                    .insert(
                        ResourceId::Call(data.call_control_id.clone()),
                        Projection::Call(call),
                    )
                    .await;
                debug!(call_control_id = %data.call_control_id, "projected dialed leg");
            }
            (CallCommand::Answer { call_control_id, .. }, Acknowledgment::Ok) => {
                self.with_call(call_control_id, |call| {
                    call.transition(CallState::Answered, now);
                })
                .await;
            }
            (
                CallCommand::Bridge {
                    call_control_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.with_call(call_control_id, |call| {
                    call.transition(CallState::Bridging, now);
                })
                .await;
                if let Some(other) = &request.call_control_id {
                    self.with_call(other, |call| {
                        call.transition(CallState::Bridging, now);
                    })
                    .await;
                }
            }
            (
                CallCommand::Enqueue {
                    call_control_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                let identity = self
                    .with_call(call_control_id, |call| {
                        (
                            call.call_leg_id.clone(),
                            call.call_session_id.clone(),
                            call.connection_id.clone(),
                            call.from.clone(),
                            call.to.clone(),
                        )
                    })
                    .await;
                if let Some((leg, session, connection, from, to)) = identity {
                    let queued = QueuedCall {
                        call_control_id: call_control_id.clone(),
                        call_leg_id: leg,
                        call_session_id: session,
                        connection_id: connection,
                        from,
                        to,
                        enqueued_at: now,
                        queue_position: 0,
                    };
                    self.with_queue_or_default(&request.queue_name, request.max_size, |queue| {
                        queue.enqueue(queued)
                    })
                    .await;
                }
            }
            (CallCommand::Hangup { call_control_id, .. }, Acknowledgment::Ok) => {
                self.with_call(call_control_id, |call| {
                    call.hangup(None, None, now);
                })
                .await;
                self.remove_leg_everywhere(call_control_id).await;
            }
            (
                CallCommand::Reject {
                    call_control_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                let cause = match request.cause {
                    RejectCause::CallRejected => HangupCause::CallRejected,
                    RejectCause::UserBusy => HangupCause::UserBusy,
                };
                self.with_call(call_control_id, |call| {
                    call.hangup(Some(cause), None, now);
                })
                .await;
                self.remove_leg_everywhere(call_control_id).await;
            }
            (CallCommand::LeaveQueue { call_control_id, .. }, Acknowledgment::Ok) => {
                self.dequeue_everywhere(call_control_id).await;
            }
            _ => {}
        }

        // Whatever the operation, a carried client_state overwrites the
        // leg's stored one.
        if let (Some(id), Some(state)) = (command.call_control_id(), command.client_state()) {
            let id = id.clone();
            let state = state.clone();
            self.with_call(&id, |call| call.set_client_state(Some(state)))
                .await;
        }
    }

    async fn apply_conference_ack(&self, command: &ConferenceCommand, ack: &Acknowledgment) {
        match (command, ack) {
            (ConferenceCommand::Create(request), Acknowledgment::Conference(data)) => {
                let started = request.start_conference_on_create.unwrap_or(true);
                let status = data.status.clone().unwrap_or(if started {
                    ConferenceStatus::InProgress
                } else {
                    ConferenceStatus::Init
                });
                let mut conference = Conference::new(
                    data.id.clone(),
                    data.name.clone(),
                    status,
                    data.expires_at,
                    request.max_participants.unwrap_or(250),
                );
                conference.connection_id = data.connection_id.clone();
                conference.client_state = request.client_state.clone();

                let participant = conference.upsert_participant(request.call_control_id.clone());
                if !started {
                    // Joiners of an unstarted conference wait on hold.
                    participant.on_hold = true;
                }
                self.store
                    .insert(
                        ResourceId::Conference(data.id.clone()),
                        Projection::Conference(conference),
                    )
                    .await;
                debug!(conference_id = %data.id, "projected created conference");
            }
            (
                ConferenceCommand::Join {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                // A join can land before the conference was listed or
                // created locally; a skeleton holds the membership until a
                // snapshot reconciles the rest.
                let slot = self
                    .store
                    .get_or_insert_with(ResourceId::Conference(conference_id.clone()), || {
                        Projection::Conference(Conference::new(
                            conference_id.clone(),
                            String::new(),
                            ConferenceStatus::InProgress,
                            Utc::now() + self.config.conference_ttl(),
                            250,
                        ))
                    })
                    .await;
                let mut projection = slot.lock().await;
                if let Some(conference) = projection.as_conference_mut() {
                    let unstarted = conference.status == ConferenceStatus::Init;
                    let participant =
                        conference.upsert_participant(request.call_control_id.clone());
                    participant.muted = request.mute.unwrap_or(false);
                    participant.on_hold = request.hold.unwrap_or(false) || unstarted;
                    participant.end_conference_on_exit =
                        request.end_conference_on_exit.unwrap_or(false);
                    participant.soft_end_conference_on_exit =
                        request.soft_end_conference_on_exit.unwrap_or(false);
                    participant.supervisor_role = request
                        .supervisor_role
                        .clone()
                        .unwrap_or(SupervisorRole::None);
                    participant.whisper_call_control_ids =
                        request.whisper_call_control_ids.clone().unwrap_or_default();

                    if request.start_conference_on_enter.unwrap_or(false)
                        && conference.status == ConferenceStatus::Init
                    {
                        conference.status = ConferenceStatus::InProgress;
                        for p in conference.participants.values_mut() {
                            p.on_hold = false;
                        }
                        if let Some(joiner) =
                            conference.participant_mut(&request.call_control_id)
                        {
                            joiner.on_hold = request.hold.unwrap_or(false);
                        }
                    }
                }
                drop(projection);
                if let Some(state) = &request.client_state {
                    let id = request.call_control_id.clone();
                    let state = state.clone();
                    self.with_call(&id, |call| call.set_client_state(Some(state)))
                        .await;
                }
            }
            (
                ConferenceCommand::DialParticipant {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.with_conference(conference_id, |conference| {
                    let participant =
                        conference.upsert_participant(request.call_control_id.clone());
                    participant.muted = request.mute.unwrap_or(false);
                    participant.on_hold = request.hold.unwrap_or(false);
                    participant.supervisor_role = request
                        .supervisor_role
                        .clone()
                        .unwrap_or(SupervisorRole::None);
                    participant.whisper_call_control_ids =
                        request.whisper_call_control_ids.clone().unwrap_or_default();
                    if request.start_conference_on_enter.unwrap_or(false)
                        && conference.status == ConferenceStatus::Init
                    {
                        conference.status = ConferenceStatus::InProgress;
                    }
                })
                .await;
            }
            (
                ConferenceCommand::Leave {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.with_conference(conference_id, |conference| {
                    conference.leave(&request.call_control_id);
                })
                .await;
            }
            (
                ConferenceCommand::Mute {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.set_participants(conference_id, &request.call_control_ids, |p| {
                    p.muted = true;
                })
                .await;
            }
            (
                ConferenceCommand::Unmute {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.set_participants(conference_id, &request.call_control_ids, |p| {
                    p.muted = false;
                })
                .await;
            }
            (
                ConferenceCommand::Hold {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.set_participants(conference_id, &request.call_control_ids, |p| {
                    p.on_hold = true;
                })
                .await;
            }
            (
                ConferenceCommand::Unhold {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                self.set_participants(conference_id, &request.call_control_ids, |p| {
                    p.on_hold = false;
                })
                .await;
            }
            (
                ConferenceCommand::UpdateParticipant {
                    conference_id,
                    request,
                },
                Acknowledgment::Ok,
            ) => {
                let whisper = request.whisper_call_control_ids.clone().unwrap_or_default();
                let role = request.supervisor_role.clone();
                let id = request.call_control_id.clone();
                self.with_conference(conference_id, move |conference| {
                    if let Some(participant) = conference.participant_mut(&id) {
                        participant.supervisor_role = role;
                        participant.whisper_call_control_ids = whisper;
                    }
                })
                .await;
            }
            // Audio, speak and recording actions do not change membership
            // state.
            _ => {}
        }
    }

    async fn set_participants(
        &self,
        conference_id: &ConferenceId,
        ids: &[CallControlId],
        f: impl Fn(&mut Participant),
    ) {
        self.with_conference(conference_id, |conference| {
            if ids.is_empty() {
                for participant in conference.participants.values_mut() {
                    if participant.is_active() {
                        f(participant);
                    }
                }
            } else {
                for id in ids {
                    if let Some(participant) = conference.participants.get_mut(id) {
                        f(participant);
                    }
                }
            }
            conference.updated_at = Utc::now();
        })
        .await;
    }

    async fn apply_fax_ack(&self, command: &FaxCommand, ack: &Acknowledgment) {
        match (command, ack) {
            (FaxCommand::Send(request), Acknowledgment::Fax(data)) => {
                let fax = fax_from_data(data, request.media_url.clone(), request.media_name.clone());
                self.store
                    .insert(ResourceId::Fax(data.id.clone()), Projection::Fax(fax))
                    .await;
            }
            (FaxCommand::Refresh { fax_id }, Acknowledgment::Ok) => {
                let id = fax_id.clone();
                let slot = self.store.get(&ResourceId::Fax(id)).await;
                if let Some(slot) = slot {
                    let mut projection = slot.lock().await;
                    if let Some(fax) = projection.as_fax_mut() {
                        // A refresh restarts a failed fax; the terminal
                        // absorption rule does not apply to an explicit retry.
                        fax.status = FaxStatus::Queued;
                        fax.updated_at = Utc::now();
                    }
                }
            }
            (FaxCommand::Delete { fax_id }, Acknowledgment::Deleted | Acknowledgment::Ok) => {
                self.store.remove(&ResourceId::Fax(fax_id.clone())).await;
            }
            // A cancel acknowledgment does not say what status the fax
            // landed in; get_fax reconciles it.
            _ => {}
        }
    }

    async fn apply_query_ack(&self, query: &Query, ack: &Acknowledgment) {
        match (query, ack) {
            (Query::GetCallStatus { .. }, Acknowledgment::Call(data)) => {
                self.reconcile_call(data).await;
            }
            (Query::ListCalls { .. }, Acknowledgment::Calls { data, .. }) => {
                for call in data {
                    self.reconcile_call(call).await;
                }
            }
            (Query::ListConferences { .. }, Acknowledgment::Conferences { data, .. }) => {
                for conference in data {
                    self.reconcile_conference(conference).await;
                }
            }
            (
                Query::ListConferenceParticipants { conference_id, .. },
                Acknowledgment::Participants { data, .. },
            ) => {
                self.with_conference(conference_id, |conference| {
                    for record in data {
                        reconcile_participant(conference, record);
                    }
                })
                .await;
            }
            (Query::GetQueue { queue_name }, Acknowledgment::Queue(data)) => {
                self.with_queue_or_default(queue_name, Some(data.max_size), |queue| {
                    queue.id = Some(data.id.clone());
                    queue.max_size = data.max_size;
                })
                .await;
            }
            (Query::GetQueueCall { queue_name, .. }, Acknowledgment::QueueCall(data)) => {
                self.with_queue_or_default(queue_name, None, |queue| {
                    queue.id.get_or_insert_with(|| data.queue_id.clone());
                    queue.reconcile(queued_call_from_data(data));
                })
                .await;
            }
            (Query::ListQueueCalls { queue_name, .. }, Acknowledgment::QueueCalls { data, .. }) => {
                self.with_queue_or_default(queue_name, None, |queue| {
                    for record in data {
                        queue.id.get_or_insert_with(|| record.queue_id.clone());
                        queue.reconcile(queued_call_from_data(record));
                    }
                })
                .await;
            }
            (Query::GetFax { .. }, Acknowledgment::Fax(data)) => {
                let resource = ResourceId::Fax(data.id.clone());
                if let Some(slot) = self.store.get(&resource).await {
                    let mut projection = slot.lock().await;
                    if let Some(fax) = projection.as_fax_mut() {
                        fax.update_status(data.status.clone());
                        fax.stored_media_url = data.stored_media_url.clone();
                    }
                } else {
                    self.store
                        .insert(resource, Projection::Fax(fax_from_data(data, None, None)))
                        .await;
                }
            }
            _ => {}
        }
    }

    async fn reconcile_call(&self, data: &CallData) {
        let resource = ResourceId::Call(data.call_control_id.clone());
        let slot = self
            .store
            .get_or_insert_with(resource, || {
                Projection::Call(Call::new(
                    data.call_control_id.clone(),
                    data.call_leg_id.clone(),
                    data.call_session_id.clone(),
                    data.connection_id
                        .clone()
                        .unwrap_or_else(|| ConnectionId::new("")),
                    data.state.clone().unwrap_or(CallState::Parked),
                ))
            })
            .await;
        let mut terminal = false;
        {
            let mut projection = slot.lock().await;
            if let Some(call) = projection.as_call_mut() {
                if let Some(state) = &data.state {
                    call.transition(state.clone(), Utc::now());
                }
                if !call.is_terminal() {
                    call.is_alive = data.is_alive;
                }
                call.set_client_state(data.client_state.clone());
                terminal = call.is_terminal();
            }
        }
        if terminal {
            self.note_terminal(ResourceId::Call(data.call_control_id.clone()))
                .await;
        }
    }

    async fn reconcile_conference(&self, data: &ConferenceData) {
        let slot = self
            .store
            .get_or_insert_with(ResourceId::Conference(data.id.clone()), || {
                Projection::Conference(Conference::new(
                    data.id.clone(),
                    data.name.clone(),
                    data.status.clone().unwrap_or(ConferenceStatus::InProgress),
                    data.expires_at,
                    250,
                ))
            })
            .await;
        let mut terminal = false;
        {
            let mut projection = slot.lock().await;
            if let Some(conference) = projection.as_conference_mut() {
                conference.expires_at = data.expires_at;
                if conference.connection_id.is_none() {
                    conference.connection_id = data.connection_id.clone();
                }
                match &data.status {
                    Some(ConferenceStatus::Completed) => {
                        conference.complete(
                            data.end_reason
                                .clone()
                                .unwrap_or(ConferenceEndReason::Unrecognized("unreported".into())),
                        );
                    }
                    Some(status) if !conference.is_terminal() => {
                        conference.status = status.clone();
                    }
                    _ => {}
                }
                terminal = conference.is_terminal();
            }
        }
        if terminal {
            self.note_terminal(ResourceId::Conference(data.id.clone()))
                .await;
        }
    }

    // ------------------------------------------------------------------
    // Events (authoritative path)
    // ------------------------------------------------------------------

    pub async fn apply_event(&self, event: &EventEnvelope) -> EventDisposition {
        let identity = &event.identity;
        let call_resource = ResourceId::Call(identity.call_control_id.clone());
        let at = event.occurred_at;

        match &event.kind {
            EventKind::Initiated {
                direction,
                from,
                to,
                state,
            } => {
                let slot = self
                    .store
                    .get_or_insert_with(call_resource, || {
                        Projection::Call(new_call_from_identity(identity, state.clone()))
                    })
                    .await;
                let mut projection = slot.lock().await;
                let Some(call) = projection.as_call_mut() else {
                    return EventDisposition::Orphaned;
                };
                call.direction.get_or_insert(direction.clone());
                call.from.get_or_insert(from.clone());
                call.to.get_or_insert(to.clone());
                if call.is_terminal() {
                    return EventDisposition::AlreadyTerminal;
                }
                call.transition(state.clone(), at);
                EventDisposition::Applied
            }
            EventKind::Answered { state } | EventKind::Bridged { state } => {
                let outcome = self
                    .with_call(&identity.call_control_id, |call| {
                        call.transition(state.clone(), at)
                    })
                    .await;
                let Some(outcome) = outcome else {
                    return EventDisposition::Orphaned;
                };
                if matches!(event.kind, EventKind::Bridged { .. }) {
                    self.confirm_joining_participant(&identity.call_control_id)
                        .await;
                }
                if outcome == crate::domain::call::Transition::TerminalNoOp {
                    EventDisposition::AlreadyTerminal
                } else {
                    EventDisposition::Applied
                }
            }
            EventKind::Hangup {
                hangup_cause,
                hangup_source,
                ..
            } => {
                let outcome = self
                    .with_call(&identity.call_control_id, |call| {
                        let outcome = call.hangup(hangup_cause.clone(), hangup_source.clone(), at);
                        // The authoritative cause wins even when an
                        // optimistic hangup already made the leg terminal.
                        if !outcome.applied() {
                            if call.hangup_cause.is_none() {
                                call.hangup_cause = hangup_cause.clone();
                            }
                            if call.hangup_source.is_none() {
                                call.hangup_source = hangup_source.clone();
                            }
                        }
                        outcome
                    })
                    .await;
                let Some(outcome) = outcome else {
                    return EventDisposition::Orphaned;
                };
                self.remove_leg_everywhere(&identity.call_control_id).await;
                self.note_terminal(ResourceId::Call(identity.call_control_id.clone()))
                    .await;
                if outcome == crate::domain::call::Transition::TerminalNoOp {
                    EventDisposition::AlreadyTerminal
                } else {
                    EventDisposition::Applied
                }
            }
            EventKind::Enqueued {
                queue,
                current_position,
            } => {
                let known = self.store.contains(&call_resource).await;
                if !known {
                    return EventDisposition::Orphaned;
                }
                let queued = QueuedCall {
                    call_control_id: identity.call_control_id.clone(),
                    call_leg_id: identity.call_leg_id.clone(),
                    call_session_id: identity.call_session_id.clone(),
                    connection_id: identity.connection_id.clone(),
                    from: None,
                    to: None,
                    enqueued_at: at,
                    queue_position: *current_position,
                };
                self.with_queue_or_default(queue, None, |q| q.reconcile(queued))
                    .await;
                EventDisposition::Applied
            }
            EventKind::Dequeued { queue, .. } => {
                if !self.store.contains(&call_resource).await {
                    return EventDisposition::Orphaned;
                }
                self.with_queue(queue, |q| {
                    q.dequeue(&identity.call_control_id);
                })
                .await;
                EventDisposition::Applied
            }
            EventKind::Unknown { .. } => EventDisposition::Unrecognized,
            // Media, gather, fork, refer, recording, streaming and
            // transcription notifications carry no entity state; they only
            // confirm the leg is still known to the platform.
            _ => {
                let terminal = self
                    .with_call(&identity.call_control_id, |call| call.is_terminal())
                    .await;
                match terminal {
                    None => EventDisposition::Orphaned,
                    Some(true) => EventDisposition::AlreadyTerminal,
                    Some(false) => EventDisposition::Applied,
                }
            }
        }
    }

    /// A `call.bridged` for a leg that was joining a conference confirms the
    /// join.
    async fn confirm_joining_participant(&self, call_control_id: &CallControlId) {
        for (_, slot) in self.store.conference_slots().await {
            let mut projection = slot.lock().await;
            if let Some(conference) = projection.as_conference_mut() {
                if let Some(participant) = conference.participant_mut(call_control_id) {
                    if participant.status == ParticipantStatus::Joining {
                        participant.mark_joined();
                    }
                }
            }
        }
    }

    async fn dequeue_everywhere(&self, call_control_id: &CallControlId) {
        for (_, slot) in self.store.queue_slots().await {
            let mut projection = slot.lock().await;
            if let Some(queue) = projection.as_queue_mut() {
                queue.dequeue(call_control_id);
            }
        }
    }

    /// Cascade of a terminal leg: it leaves every queue and conference it
    /// was in, and a conference configured to end on its exit completes.
    async fn remove_leg_everywhere(&self, call_control_id: &CallControlId) {
        self.dequeue_everywhere(call_control_id).await;
        let mut ended = Vec::new();
        for (resource, slot) in self.store.conference_slots().await {
            let mut projection = slot.lock().await;
            let Some(conference) = projection.as_conference_mut() else {
                continue;
            };
            let Some(participant) = conference.participant(call_control_id) else {
                continue;
            };
            if !participant.is_active() {
                continue;
            }
            let ends_conference =
                participant.end_conference_on_exit || participant.soft_end_conference_on_exit;
            conference.leave(call_control_id);
            if ends_conference {
                conference.complete(ConferenceEndReason::HostLeft);
                ended.push(resource);
            } else if conference.status == ConferenceStatus::InProgress
                && conference.active_participants().count() == 0
            {
                conference.complete(ConferenceEndReason::AllLeft);
                ended.push(resource);
            }
        }
        for resource in ended {
            self.note_terminal(resource).await;
        }
    }
}

fn new_call_from_identity(identity: &CallIdentity, state: CallState) -> Call {
    let mut call = Call::new(
        identity.call_control_id.clone(),
        identity.call_leg_id.clone(),
        identity.call_session_id.clone(),
        identity.connection_id.clone(),
        state,
    );
    call.direction = Some(CallDirection::Incoming);
    call
}

fn dial_target_display(target: &crate::command::call::DialTarget) -> String {
    match target {
        crate::command::call::DialTarget::One(to) => to.clone(),
        crate::command::call::DialTarget::Many(tos) => tos.join(","),
    }
}

fn queued_call_from_data(data: &QueueCallData) -> QueuedCall {
    QueuedCall {
        call_control_id: data.call_control_id.clone(),
        call_leg_id: data.call_leg_id.clone(),
        call_session_id: data.call_session_id.clone(),
        connection_id: data.connection_id.clone(),
        from: Some(data.from.clone()),
        to: Some(data.to.clone()),
        enqueued_at: data.enqueued_at,
        queue_position: data.queue_position,
    }
}

fn fax_from_data(data: &FaxData, media_url: Option<String>, media_name: Option<String>) -> Fax {
    Fax {
        id: data.id.clone(),
        connection_id: data.connection_id.clone(),
        direction: data.direction.clone(),
        status: data.status.clone(),
        from: data.from.clone(),
        to: data.to.clone(),
        quality: data.quality.clone().unwrap_or(FaxQuality::High),
        store_media: data.store_media,
        stored_media_url: data.stored_media_url.clone(),
        media_url: data.media_url.clone().or(media_url),
        media_name: data.media_name.clone().or(media_name),
        created_at: data.created_at,
        updated_at: data.updated_at,
    }
}

fn reconcile_participant(conference: &mut Conference, record: &ParticipantData) {
    let participant = conference.upsert_participant(record.call_control_id.clone());
    participant.call_leg_id = Some(record.call_leg_id.clone());
    participant.status = record.status.clone();
    participant.muted = record.muted;
    participant.on_hold = record.on_hold;
    participant.end_conference_on_exit = record.end_conference_on_exit;
    participant.soft_end_conference_on_exit = record.soft_end_conference_on_exit;
    participant.whisper_call_control_ids = record.whisper_call_control_ids.clone();
    participant.updated_at = record.updated_at;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::value_objects::{CallLegId, CallSessionId, ConnectionId, EventId};
    use serde_json::json;

    fn projector() -> EntityProjector {
        EntityProjector::new(Arc::new(ProjectionStore::new()), EngineConfig::default())
    }

    fn event(kind: EventKind, leg: &str) -> EventEnvelope {
        EventEnvelope {
            id: EventId::new(),
            occurred_at: Utc::now(),
            identity: CallIdentity {
                call_control_id: CallControlId::new(leg),
                call_leg_id: CallLegId::new(format!("leg-{leg}")),
                call_session_id: CallSessionId::new("session-1"),
                connection_id: ConnectionId::new("c1"),
                client_state: None,
            },
            kind,
        }
    }

    fn initiated(leg: &str) -> EventEnvelope {
        event(
            EventKind::Initiated {
                direction: CallDirection::Incoming,
                from: "+15550001".to_string(),
                to: "+15550002".to_string(),
                state: CallState::Parked,
            },
            leg,
        )
    }

    #[test]
    fn test_initiated_creates_inbound_call() {
        tokio_test::block_on(async {
            let projector = projector();
            let disposition = projector.apply_event(&initiated("a")).await;
            assert_eq!(disposition, EventDisposition::Applied);

            let calls = projector.store.calls().await;
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].direction, Some(CallDirection::Incoming));
            assert_eq!(calls[0].state, CallState::Parked);
        });
    }

    #[test]
    fn test_non_initiated_orphan_is_dropped() {
        tokio_test::block_on(async {
            let projector = projector();
            let disposition = projector
                .apply_event(&event(
                    EventKind::Answered {
                        state: CallState::Answered,
                    },
                    "ghost",
                ))
                .await;
            assert_eq!(disposition, EventDisposition::Orphaned);
            assert!(projector.store.is_empty().await);
        });
    }

    #[test]
    fn test_hangup_cascades_out_of_queue() {
        tokio_test::block_on(async {
            let projector = projector();
            projector.apply_event(&initiated("a")).await;
            projector
                .apply_event(&event(
                    EventKind::Enqueued {
                        queue: QueueName::new("support"),
                        current_position: 1,
                    },
                    "a",
                ))
                .await;
            assert_eq!(projector.store.queues().await[0].current_size(), 1);

            projector
                .apply_event(&event(
                    EventKind::Hangup {
                        hangup_cause: Some(HangupCause::OriginatorCancel),
                        hangup_source: None,
                        sip_hangup_cause: None,
                    },
                    "a",
                ))
                .await;

            let queues = projector.store.queues().await;
            assert_eq!(queues[0].current_size(), 0);
            let calls = projector.store.calls().await;
            assert_eq!(calls[0].state, CallState::Hangup);
            assert_eq!(calls[0].hangup_cause, Some(HangupCause::OriginatorCancel));
        });
    }

    #[test]
    fn test_event_overwrites_optimistic_hangup_cause() {
        tokio_test::block_on(async {
            let projector = projector();
            projector.apply_event(&initiated("a")).await;

            // Optimistic hangup from an acknowledgment: no cause yet.
            let command = Command::Call(CallCommand::Hangup {
                call_control_id: CallControlId::new("a"),
                request: Default::default(),
            });
            projector.apply_ack(&command, &Acknowledgment::Ok).await;
            assert_eq!(projector.store.calls().await[0].hangup_cause, None);

            let disposition = projector
                .apply_event(&event(
                    EventKind::Hangup {
                        hangup_cause: Some(HangupCause::NormalClearing),
                        hangup_source: None,
                        sip_hangup_cause: None,
                    },
                    "a",
                ))
                .await;
            assert_eq!(disposition, EventDisposition::AlreadyTerminal);
            assert_eq!(
                projector.store.calls().await[0].hangup_cause,
                Some(HangupCause::NormalClearing)
            );
        });
    }

    #[test]
    fn test_dial_ack_projects_outbound_leg() {
        tokio_test::block_on(async {
            let projector = projector();
            let request = crate::command::call::DialRequest::new(
                ConnectionId::new("c1"),
                "+18005550101",
                crate::command::call::DialTarget::from("+18005550100"),
            );
            let command = Command::Call(CallCommand::Dial(request));
            let body = json!({
                "data": {
                    "call_control_id": "v3:leg-out",
                    "call_leg_id": "leg-out",
                    "call_session_id": "session-9",
                    "connection_id": "c1",
                    "is_alive": false
                }
            });
            let ack = Acknowledgment::parse(&command, body).unwrap();
            projector.apply_ack(&command, &ack).await;

            let calls = projector.store.calls().await;
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].direction, Some(CallDirection::Outgoing));
            assert_eq!(calls[0].state, CallState::Bridging);
            assert!(!calls[0].is_alive);
        });
    }

    #[test]
    fn test_last_participant_hangup_completes_conference() {
        tokio_test::block_on(async {
            let projector = projector();
            projector.apply_event(&initiated("a")).await;

            let mut conference = Conference::new(
                ConferenceId::new("conf-1"),
                "standup".to_string(),
                ConferenceStatus::InProgress,
                Utc::now() + chrono::Duration::hours(4),
                250,
            );
            conference
                .upsert_participant(CallControlId::new("a"))
                .mark_joined();
            projector
                .store
                .insert(
                    ResourceId::Conference(ConferenceId::new("conf-1")),
                    Projection::Conference(conference),
                )
                .await;

            projector
                .apply_event(&event(
                    EventKind::Hangup {
                        hangup_cause: Some(HangupCause::NormalClearing),
                        hangup_source: None,
                        sip_hangup_cause: None,
                    },
                    "a",
                ))
                .await;

            let conferences = projector.store.conferences().await;
            assert_eq!(conferences[0].status, ConferenceStatus::Completed);
            assert_eq!(
                conferences[0].end_reason,
                Some(ConferenceEndReason::AllLeft)
            );
        });
    }
}

//! Correlation engine
//!
//! Ties the pieces together: commands are rendered and executed, their
//! acknowledgments recorded for idempotent replay and folded into the
//! projections optimistically; webhook events are deduplicated and folded in
//! authoritatively. Reads come straight from the projections and never touch
//! the network.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use futures::{pin_mut, Stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::idempotency::{IdempotencyTracker, RecordedOutcome};
use crate::application::pagination::{ConferenceFilter, PageDescriptor, PageMeta};
use crate::application::projector::{EntityProjector, EventDisposition};
use crate::command::{Acknowledgment, Command, FaxCommand};
use crate::config::EngineConfig;
use crate::domain::call::Call;
use crate::domain::conference::Conference;
use crate::domain::fax::Fax;
use crate::domain::queue::Queue;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    CallControlId, ConferenceId, EventId, FaxId, QueueName, ResourceId,
};
use crate::event::EventEnvelope;
use crate::infrastructure::store::ProjectionStore;
use crate::infrastructure::transport::{CommandExecutor, ExecuteError};

/// How many recently seen event ids the duplicate filter remembers.
const EVENT_DEDUP_WINDOW: usize = 4096;

/// Sliding window of recently seen event ids. At-least-once redelivery
/// arrives close to the original, so a bounded window keeps memory flat on a
/// long-lived engine.
struct SeenEvents {
    ids: HashSet<EventId>,
    order: VecDeque<EventId>,
    capacity: usize,
}

impl SeenEvents {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// True when the id is new; false for a redelivery inside the window.
    fn insert(&mut self, id: EventId) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }
}

/// Counters returned by [`CorrelationEngine::ingest_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: usize,
    pub duplicate: usize,
    pub orphaned: usize,
    pub already_terminal: usize,
    pub unrecognized: usize,
}

impl IngestStats {
    fn tally(&mut self, disposition: EventDisposition) {
        match disposition {
            EventDisposition::Applied => self.applied += 1,
            EventDisposition::Duplicate => self.duplicate += 1,
            EventDisposition::Orphaned => self.orphaned += 1,
            EventDisposition::AlreadyTerminal => self.already_terminal += 1,
            EventDisposition::Unrecognized => self.unrecognized += 1,
        }
    }
}

/// Client-side correlation engine over one platform connection.
pub struct CorrelationEngine {
    config: EngineConfig,
    executor: Arc<dyn CommandExecutor>,
    store: Arc<ProjectionStore>,
    projector: EntityProjector,
    idempotency: Mutex<IdempotencyTracker>,
    seen_events: Mutex<SeenEvents>,
}

impl CorrelationEngine {
    pub fn new(config: EngineConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(ProjectionStore::new());
        let projector = EntityProjector::new(store.clone(), config.clone());
        Ok(Self {
            config,
            executor,
            store,
            projector,
            idempotency: Mutex::new(IdempotencyTracker::new()),
            seen_events: Mutex::new(SeenEvents::with_capacity(EVENT_DEDUP_WINDOW)),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Command path
    // ------------------------------------------------------------------

    /// Submit a command. A resubmission carrying an already-settled
    /// `command_id` replays the recorded outcome without reaching the
    /// platform; a transport failure returns [`DomainError::UnknownOutcome`]
    /// and records nothing.
    pub async fn submit(&self, command: Command) -> Result<Acknowledgment> {
        let target = command.target();

        if let Some(command_id) = command.command_id() {
            let tracker = self.idempotency.lock().await;
            if let Some(outcome) = tracker.recall(target.as_ref(), command_id) {
                debug!(
                    command = command.name(),
                    %command_id,
                    "replaying recorded outcome"
                );
                return match outcome {
                    RecordedOutcome::Acknowledged(ack) => Ok(ack),
                    RecordedOutcome::Rejected(rejection) => Err(DomainError::Rejected(rejection)),
                };
            }
        }

        self.preflight(&command).await?;

        let spec = command.spec()?;
        let body = match self.executor.execute(spec).await {
            Ok(body) => body,
            Err(ExecuteError::Rejected(rejection)) => {
                warn!(
                    command = command.name(),
                    code = %rejection.code,
                    "command rejected"
                );
                if let Some(command_id) = command.command_id() {
                    self.idempotency.lock().await.record(
                        target,
                        command_id.clone(),
                        RecordedOutcome::Rejected(rejection.clone()),
                    );
                }
                return Err(DomainError::Rejected(rejection));
            }
            Err(ExecuteError::Transport(cause)) => {
                warn!(command = command.name(), %cause, "no definitive outcome");
                return Err(DomainError::UnknownOutcome(cause));
            }
        };

        let ack = Acknowledgment::parse(&command, body)?;
        if let Some(command_id) = command.command_id() {
            self.idempotency.lock().await.record(
                target,
                command_id.clone(),
                RecordedOutcome::Acknowledged(ack.clone()),
            );
        }
        self.projector.apply_ack(&command, &ack).await;
        self.retire_terminal().await;
        Ok(ack)
    }

    /// Retire idempotency entries whose resource just reached a terminal
    /// state; their command ids can never conflict again.
    async fn retire_terminal(&self) {
        let retired = self.projector.take_terminal().await;
        if retired.is_empty() {
            return;
        }
        let mut tracker = self.idempotency.lock().await;
        for resource in &retired {
            tracker.forget_resource(resource);
        }
    }

    /// Local gate applied before spending a round trip, when configured.
    async fn preflight(&self, command: &Command) -> Result<()> {
        if !self.config.preflight_fax_cancel {
            return Ok(());
        }
        if let Command::Fax(FaxCommand::Cancel { fax_id }) = command {
            if let Some(slot) = self.store.get(&ResourceId::Fax(fax_id.clone())).await {
                let projection = slot.lock().await;
                if let Some(fax) = projection.as_fax() {
                    if !fax.status.is_cancelable() {
                        return Err(DomainError::InvalidStateTransition(format!(
                            "fax {fax_id} cannot be canceled from its current status"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event path
    // ------------------------------------------------------------------

    /// Fold one webhook event in. Duplicates (by event id) are dropped
    /// before the projector sees them.
    pub async fn ingest(&self, event: EventEnvelope) -> EventDisposition {
        {
            let mut seen = self.seen_events.lock().await;
            if !seen.insert(event.id) {
                debug!(
                    event_id = %event.id,
                    event_type = event.kind.event_type(),
                    "duplicate event dropped"
                );
                return EventDisposition::Duplicate;
            }
        }

        let disposition = self.projector.apply_event(&event).await;
        match disposition {
            EventDisposition::Orphaned => {
                warn!(
                    event_type = event.kind.event_type(),
                    call_control_id = %event.identity.call_control_id,
                    "event for unknown leg dropped"
                );
            }
            EventDisposition::AlreadyTerminal => {
                warn!(
                    event_type = event.kind.event_type(),
                    call_control_id = %event.identity.call_control_id,
                    "event absorbed by terminal projection"
                );
            }
            EventDisposition::Unrecognized => {
                debug!(
                    event_type = event.kind.event_type(),
                    "unrecognized event type ignored"
                );
            }
            _ => {}
        }

        self.retire_terminal().await;
        disposition
    }

    /// Parse and fold a raw webhook body.
    pub async fn ingest_json(&self, body: serde_json::Value) -> Result<EventDisposition> {
        let event = EventEnvelope::from_json(body)?;
        Ok(self.ingest(event).await)
    }

    /// Drain a stream of events, e.g. a webhook receiver channel.
    pub async fn ingest_all<S>(&self, events: S) -> IngestStats
    where
        S: Stream<Item = EventEnvelope>,
    {
        pin_mut!(events);
        let mut stats = IngestStats::default();
        while let Some(event) = events.next().await {
            stats.tally(self.ingest(event).await);
        }
        stats
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    pub async fn call(&self, id: &CallControlId) -> Option<Call> {
        let slot = self.store.get(&ResourceId::Call(id.clone())).await?;
        let projection = slot.lock().await;
        projection.as_call().cloned()
    }

    /// Conference by id. An elapsed TTL completes the projection on read, so
    /// a lost `conference.ended` webhook cannot leave it in progress forever.
    pub async fn conference(&self, id: &ConferenceId) -> Option<Conference> {
        let slot = self.store.get(&ResourceId::Conference(id.clone())).await?;
        let snapshot;
        let expired;
        {
            let mut projection = slot.lock().await;
            let conference = projection.as_conference_mut()?;
            expired = conference.expire_if_due(Utc::now());
            snapshot = conference.clone();
        }
        if expired {
            self.idempotency
                .lock()
                .await
                .forget_resource(&ResourceId::Conference(id.clone()));
        }
        Some(snapshot)
    }

    pub async fn queue(&self, name: &QueueName) -> Option<Queue> {
        let slot = self.store.get(&ResourceId::Queue(name.clone())).await?;
        let projection = slot.lock().await;
        projection.as_queue().cloned()
    }

    pub async fn fax(&self, id: &FaxId) -> Option<Fax> {
        let slot = self.store.get(&ResourceId::Fax(id.clone())).await?;
        let projection = slot.lock().await;
        projection.as_fax().cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.store.calls().await
    }

    pub async fn conferences(&self) -> Vec<Conference> {
        let now = Utc::now();
        let mut expired = Vec::new();
        for (resource, slot) in self.store.conference_slots().await {
            let mut projection = slot.lock().await;
            if let Some(conference) = projection.as_conference_mut() {
                if conference.expire_if_due(now) {
                    expired.push(resource);
                }
            }
        }
        if !expired.is_empty() {
            let mut tracker = self.idempotency.lock().await;
            for resource in &expired {
                tracker.forget_resource(resource);
            }
        }
        self.store.conferences().await
    }

    pub async fn queues(&self) -> Vec<Queue> {
        self.store.queues().await
    }

    pub async fn faxes(&self) -> Vec<Fax> {
        self.store.faxes().await
    }

    /// Page through the locally projected conferences the way the platform
    /// pages its listing: filter, order by creation time, then slice.
    pub async fn conferences_page(
        &self,
        filter: &ConferenceFilter,
        page: &PageDescriptor,
    ) -> (Vec<Conference>, PageMeta) {
        let mut conferences: Vec<Conference> = self
            .conferences()
            .await
            .into_iter()
            .filter(|c| {
                filter.name.as_ref().map_or(true, |name| &c.name == name)
                    && filter.status.as_ref().map_or(true, |status| &c.status == status)
            })
            .collect();
        conferences.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.as_str().cmp(b.id.as_str())));

        let total = conferences.len();
        let items = page.apply(&conferences).to_vec();
        (items, page_meta(page, total))
    }
}

fn page_meta(page: &PageDescriptor, total: usize) -> PageMeta {
    let size = page.size() as u64;
    PageMeta {
        page_number: page.number(),
        page_size: page.size(),
        total_pages: ((total as u64 + size - 1) / size) as u32,
        total_results: total as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::call::{DialRequest, DialTarget, EnqueueRequest};
    use crate::command::CallCommand;
    use crate::domain::shared::error::PlatformRejection;
    use crate::domain::shared::value_objects::{ClientState, CommandId, ConnectionId};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Plays back a scripted sequence of responses.
    struct ScriptedExecutor {
        responses: Mutex<VecDeque<std::result::Result<Value, ExecuteError>>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<std::result::Result<Value, ExecuteError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn execute(&self, _spec: crate::command::CommandSpec) -> std::result::Result<Value, ExecuteError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted command"))
        }
    }

    fn engine_with(responses: Vec<std::result::Result<Value, ExecuteError>>) -> CorrelationEngine {
        CorrelationEngine::new(
            EngineConfig::default(),
            Arc::new(ScriptedExecutor::new(responses)),
        )
        .unwrap()
    }

    fn dial_command(command_id: &str) -> Command {
        let mut request = DialRequest::new(
            ConnectionId::new("c1"),
            "+18005550101",
            DialTarget::from("+18005550100"),
        );
        request.command_id = Some(CommandId::new(command_id));
        request.client_state = Some(ClientState::encode(b"lead-42"));
        Command::Call(CallCommand::Dial(request))
    }

    fn dial_ack_body(leg: &str) -> Value {
        json!({
            "data": {
                "call_control_id": format!("v3:{leg}"),
                "call_leg_id": leg,
                "call_session_id": "session-1",
                "connection_id": "c1",
                "is_alive": false
            }
        })
    }

    #[test]
    fn test_resubmission_replays_without_executing() {
        tokio_test::block_on(async {
            // One scripted response: the second submit must not execute.
            let engine = engine_with(vec![Ok(dial_ack_body("leg-a"))]);

            let first = engine.submit(dial_command("cmd-1")).await.unwrap();
            let second = engine.submit(dial_command("cmd-1")).await.unwrap();

            match (first, second) {
                (Acknowledgment::Call(a), Acknowledgment::Call(b)) => {
                    assert_eq!(a.call_control_id, b.call_control_id);
                }
                other => panic!("unexpected acks: {other:?}"),
            }
            assert_eq!(engine.calls().await.len(), 1);
        });
    }

    #[test]
    fn test_rejection_is_replayed_and_not_projected() {
        tokio_test::block_on(async {
            let rejection = PlatformRejection {
                code: "90010".to_string(),
                title: "Queue full".to_string(),
                detail: "max_size reached".to_string(),
            };
            let engine = engine_with(vec![Err(ExecuteError::Rejected(rejection))]);

            let mut request = EnqueueRequest::new(QueueName::new("support"));
            request.command_id = Some(CommandId::new("cmd-enq"));
            let command = || {
                Command::Call(CallCommand::Enqueue {
                    call_control_id: CallControlId::new("v3:leg-a"),
                    request: request.clone(),
                })
            };

            for _ in 0..2 {
                match engine.submit(command()).await {
                    Err(DomainError::Rejected(r)) => assert_eq!(r.code, "90010"),
                    other => panic!("unexpected outcome: {other:?}"),
                }
            }
            assert!(engine.queues().await.is_empty());
        });
    }

    #[test]
    fn test_transport_failure_records_nothing() {
        tokio_test::block_on(async {
            let engine = engine_with(vec![
                Err(ExecuteError::Transport(anyhow::anyhow!("connection reset"))),
                Ok(dial_ack_body("leg-a")),
            ]);

            match engine.submit(dial_command("cmd-1")).await {
                Err(DomainError::UnknownOutcome(_)) => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert!(engine.calls().await.is_empty());

            // The retry reaches the platform and settles normally.
            engine.submit(dial_command("cmd-1")).await.unwrap();
            assert_eq!(engine.calls().await.len(), 1);
        });
    }

    #[test]
    fn test_event_dedup_window_is_bounded() {
        let mut seen = SeenEvents::with_capacity(2);
        let first = EventId::new();
        let second = EventId::new();
        let third = EventId::new();

        assert!(seen.insert(first));
        assert!(!seen.insert(first));
        assert!(seen.insert(second));
        assert!(seen.insert(third));

        // The window only remembers the last two ids.
        assert_eq!(seen.ids.len(), 2);
        assert!(seen.insert(first));
    }

    #[test]
    fn test_duplicate_event_is_dropped() {
        tokio_test::block_on(async {
            let engine = engine_with(vec![]);
            let body = json!({
                "data": {
                    "id": "8f3c0a4e-2b1d-4b5e-9c6f-1a2b3c4d5e6f",
                    "event_type": "call.initiated",
                    "occurred_at": "2024-05-01T12:00:00Z",
                    "payload": {
                        "call_control_id": "v3:leg-in",
                        "call_leg_id": "leg-in",
                        "call_session_id": "session-1",
                        "connection_id": "c1",
                        "direction": "incoming",
                        "from": "+15550001",
                        "to": "+15550002",
                        "state": "parked"
                    }
                }
            });

            assert_eq!(
                engine.ingest_json(body.clone()).await.unwrap(),
                EventDisposition::Applied
            );
            assert_eq!(
                engine.ingest_json(body).await.unwrap(),
                EventDisposition::Duplicate
            );
            assert_eq!(engine.calls().await.len(), 1);
        });
    }
}

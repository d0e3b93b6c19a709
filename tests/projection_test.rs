//! Projection fold tests
//!
//! Exercises the projector directly: acknowledgments and events are folded
//! into a store and the resulting projections are inspected. The interesting
//! properties are convergence under reordering and duplication, and the
//! split of authority between the optimistic and authoritative paths.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use switchboard::application::pagination::{PageDescriptor, PageMeta};
use switchboard::application::projector::{EntityProjector, EventDisposition};
use switchboard::command::ack::{Acknowledgment, ConferenceData, QueueCallData};
use switchboard::command::call::UpdateStateRequest;
use switchboard::command::conference::{
    CreateConferenceRequest, MuteParticipantsRequest, UnmuteParticipantsRequest,
};
use switchboard::command::query::Query;
use switchboard::command::{CallCommand, Command, ConferenceCommand};
use switchboard::config::EngineConfig;
use switchboard::domain::call::{CallState, HangupCause};
use switchboard::domain::shared::value_objects::{
    CallControlId, CallLegId, CallSessionId, ClientState, ConferenceId, ConnectionId, QueueName,
};
use switchboard::event::EventEnvelope;
use switchboard::infrastructure::store::ProjectionStore;

fn projector() -> (Arc<ProjectionStore>, EntityProjector) {
    let store = Arc::new(ProjectionStore::new());
    let projector = EntityProjector::new(store.clone(), EngineConfig::default());
    (store, projector)
}

fn event(event_type: &str, leg: &str, extra: serde_json::Value) -> EventEnvelope {
    let mut payload = json!({
        "call_control_id": format!("v3:{leg}"),
        "call_leg_id": leg,
        "call_session_id": "session-1",
        "connection_id": "c1"
    });
    if let Some(map) = extra.as_object() {
        for (k, v) in map {
            payload[k] = v.clone();
        }
    }
    EventEnvelope::from_json(json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "event_type": event_type,
        "occurred_at": "2024-05-01T12:00:00Z",
        "payload": payload
    }))
    .unwrap()
}

fn initiated(leg: &str) -> EventEnvelope {
    event(
        "call.initiated",
        leg,
        json!({"direction": "incoming", "from": "+15550001", "to": "+15550002", "state": "parked"}),
    )
}

fn answered(leg: &str) -> EventEnvelope {
    event("call.answered", leg, json!({"state": "answered"}))
}

fn hangup(leg: &str) -> EventEnvelope {
    event(
        "call.hangup",
        leg,
        json!({"hangup_cause": "normal_clearing", "hangup_source": "callee"}),
    )
}

fn ccid(leg: &str) -> CallControlId {
    CallControlId::new(format!("v3:{leg}"))
}

#[tokio::test]
async fn test_reordered_lifecycles_converge() {
    // In-order delivery.
    let (store_a, projector_a) = projector();
    for e in [initiated("leg"), answered("leg"), hangup("leg")] {
        projector_a.apply_event(&e).await;
    }

    // Hangup overtakes the answer.
    let (store_b, projector_b) = projector();
    projector_b.apply_event(&initiated("leg")).await;
    projector_b.apply_event(&hangup("leg")).await;
    let late = projector_b.apply_event(&answered("leg")).await;
    assert_eq!(late, EventDisposition::AlreadyTerminal);

    let calls_a = store_a.calls().await;
    let calls_b = store_b.calls().await;
    let a = &calls_a[0];
    let b = &calls_b[0];
    assert_eq!(a.state, CallState::Hangup);
    assert_eq!(b.state, CallState::Hangup);
    assert_eq!(a.hangup_cause, b.hangup_cause);
    assert_eq!(a.hangup_cause, Some(HangupCause::NormalClearing));
    assert!(!b.is_alive);
}

#[tokio::test]
async fn test_folding_same_event_twice_changes_nothing() {
    let (store, projector) = projector();
    projector.apply_event(&initiated("leg")).await;

    let answer = answered("leg");
    projector.apply_event(&answer).await;
    let first = store.calls().await.remove(0);

    projector.apply_event(&answer).await;
    let second = store.calls().await.remove(0);

    assert_eq!(first.state, second.state);
    assert_eq!(first.answered_at, second.answered_at);
    assert_eq!(first.is_alive, second.is_alive);
}

#[tokio::test]
async fn test_queue_snapshot_overrides_local_order() {
    let (_store, projector) = projector();
    for leg in ["leg-1", "leg-2", "leg-3"] {
        projector.apply_event(&initiated(leg)).await;
        projector
            .apply_event(&event(
                "call.enqueued",
                leg,
                json!({"queue": "support", "current_position": 0}),
            ))
            .await;
    }

    // The platform says leg-3 is actually first.
    let queue_name = QueueName::new("support");
    let snapshot = |leg: &str, position: u32| QueueCallData {
        call_control_id: ccid(leg),
        call_leg_id: CallLegId::new(leg),
        call_session_id: CallSessionId::new("session-1"),
        connection_id: ConnectionId::new("c1"),
        queue_id: "q-1".to_string(),
        queue_position: position,
        from: "+15550001".to_string(),
        to: "+15550002".to_string(),
        enqueued_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        wait_time_secs: 10,
    };
    let query = Command::Query(Query::ListQueueCalls {
        queue_name: queue_name.clone(),
        page: PageDescriptor::first(&EngineConfig::default()),
    });
    let ack = Acknowledgment::QueueCalls {
        data: vec![snapshot("leg-3", 1), snapshot("leg-1", 2), snapshot("leg-2", 3)],
        meta: PageMeta {
            page_number: 1,
            page_size: 20,
            total_pages: 1,
            total_results: 3,
        },
    };
    projector.apply_ack(&query, &ack).await;

    let queues = _store.queues().await;
    let queue = &queues[0];
    assert_eq!(queue.id.as_deref(), Some("q-1"));
    assert_eq!(queue.position_of(&ccid("leg-3")), Some(1));
    assert_eq!(queue.position_of(&ccid("leg-1")), Some(2));
    assert_eq!(queue.position_of(&ccid("leg-2")), Some(3));
}

#[tokio::test]
async fn test_events_never_touch_client_state() {
    let (store, projector) = projector();
    projector.apply_event(&initiated("leg")).await;

    let command = Command::Call(CallCommand::UpdateClientState {
        call_control_id: ccid("leg"),
        request: UpdateStateRequest {
            client_state: ClientState::encode(b"stage-2"),
        },
    });
    projector.apply_ack(&command, &Acknowledgment::Ok).await;

    // The webhook echoes an older client_state; the projection keeps the
    // one the last command set.
    projector
        .apply_event(&event(
            "call.answered",
            "leg",
            json!({"state": "answered", "client_state": ClientState::encode(b"stage-1").as_str()}),
        ))
        .await;

    let calls = store.calls().await;
    let call = &calls[0];
    assert_eq!(call.client_state, Some(ClientState::encode(b"stage-2")));
    assert_eq!(call.state, CallState::Answered);
}

#[tokio::test]
async fn test_participant_flag_writes_take_the_last_value() {
    let (store, projector) = projector();
    let conference_id = ConferenceId::new("conf-1");

    let create = Command::Conference(ConferenceCommand::Create(CreateConferenceRequest::new(
        ccid("leg-host"),
        "standup",
    )));
    let data = ConferenceData {
        id: conference_id.clone(),
        name: "standup".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        expires_at: Utc.with_ymd_and_hms(2099, 5, 1, 12, 0, 0).unwrap(),
        updated_at: None,
        connection_id: Some(ConnectionId::new("c1")),
        status: None,
        end_reason: None,
        region: None,
    };
    projector
        .apply_ack(&create, &Acknowledgment::Conference(data))
        .await;

    let mute = Command::Conference(ConferenceCommand::Mute {
        conference_id: conference_id.clone(),
        request: MuteParticipantsRequest {
            call_control_ids: vec![ccid("leg-host")],
        },
    });
    projector.apply_ack(&mute, &Acknowledgment::Ok).await;

    let conferences = store.conferences().await;
    assert!(conferences[0].participant(&ccid("leg-host")).unwrap().muted);

    let unmute = Command::Conference(ConferenceCommand::Unmute {
        conference_id: conference_id.clone(),
        request: UnmuteParticipantsRequest {
            call_control_ids: vec![ccid("leg-host")],
        },
    });
    projector.apply_ack(&unmute, &Acknowledgment::Ok).await;

    let conferences = store.conferences().await;
    assert!(!conferences[0].participant(&ccid("leg-host")).unwrap().muted);
}

#[tokio::test]
async fn test_unknown_call_media_event_is_orphaned() {
    let (store, projector) = projector();
    let disposition = projector
        .apply_event(&event("call.dtmf.received", "ghost", json!({"digit": "5"})))
        .await;
    assert_eq!(disposition, EventDisposition::Orphaned);
    assert!(store.is_empty().await);
}

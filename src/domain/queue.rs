//! Queue and queued-call projections
//!
//! Queues are created implicitly on first enqueue. Positions are 1-indexed
//! FIFO; wait times are computed at read time from `enqueued_at`, never
//! stored or ticked. `max_size` is enforced by the platform; a full queue
//! surfaces as a rejected command, not a local state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::shared::value_objects::{
    CallControlId, CallLegId, CallSessionId, ConnectionId, QueueName,
};

/// Why a call left its queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DequeueReason {
    Bridged,
    BridgingInProcess,
    Hangup,
    Leave,
    Timeout,
    #[serde(untagged)]
    Unrecognized(String),
}

/// One waiting call leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedCall {
    pub call_control_id: CallControlId,
    pub call_leg_id: CallLegId,
    pub call_session_id: CallSessionId,
    pub connection_id: ConnectionId,
    pub from: Option<String>,
    pub to: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// 1-indexed position; maintained by the owning queue.
    pub queue_position: u32,
}

impl QueuedCall {
    /// Wait time at read time, in whole seconds.
    pub fn wait_time_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.enqueued_at).num_seconds().max(0)
    }
}

/// Queue projection holding its waiting calls in FIFO order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    /// Platform-assigned id, known only after a `get_queue` reconciliation.
    pub id: Option<String>,
    pub name: QueueName,
    pub max_size: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    calls: Vec<QueuedCall>,
}

impl Queue {
    pub fn new(name: QueueName, max_size: u32) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name,
            max_size,
            created_at: now,
            updated_at: now,
            calls: Vec::new(),
        }
    }

    pub fn current_size(&self) -> u32 {
        self.calls.len() as u32
    }

    pub fn calls(&self) -> &[QueuedCall] {
        &self.calls
    }

    pub fn position_of(&self, call_control_id: &CallControlId) -> Option<u32> {
        self.calls
            .iter()
            .find(|c| &c.call_control_id == call_control_id)
            .map(|c| c.queue_position)
    }

    /// Append to the tail and return the assigned position. Re-enqueueing a
    /// leg already present keeps its original position.
    pub fn enqueue(&mut self, mut call: QueuedCall) -> u32 {
        if let Some(position) = self.position_of(&call.call_control_id) {
            return position;
        }
        let position = self.calls.len() as u32 + 1;
        call.queue_position = position;
        self.calls.push(call);
        self.updated_at = Utc::now();
        position
    }

    /// Remove a leg; all calls behind it shift down by one.
    pub fn dequeue(&mut self, call_control_id: &CallControlId) -> Option<QueuedCall> {
        let index = self
            .calls
            .iter()
            .position(|c| &c.call_control_id == call_control_id)?;
        let removed = self.calls.remove(index);
        for (i, call) in self.calls.iter_mut().enumerate() {
            call.queue_position = i as u32 + 1;
        }
        self.updated_at = Utc::now();
        Some(removed)
    }

    /// Adopt a platform-reported call record, honoring the position the
    /// platform assigned. The rest of the queue renumbers around it.
    pub fn reconcile(&mut self, call: QueuedCall) {
        self.calls
            .retain(|c| c.call_control_id != call.call_control_id);
        let index = (call.queue_position.max(1) as usize - 1).min(self.calls.len());
        self.calls.insert(index, call);
        for (i, call) in self.calls.iter_mut().enumerate() {
            call.queue_position = i as u32 + 1;
        }
        self.updated_at = Utc::now();
    }

    /// Average wait of the calls currently in the queue, computed at read
    /// time. The platform's own figure is authoritative when reconciling.
    pub fn average_wait_time_secs(&self, now: DateTime<Utc>) -> i64 {
        if self.calls.is_empty() {
            return 0;
        }
        let total: i64 = self.calls.iter().map(|c| c.wait_time_secs(now)).sum();
        total / self.calls.len() as i64
    }
}

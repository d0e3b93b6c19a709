//! Idempotency tracking
//!
//! A command carrying a `command_id` is one logical operation no matter how
//! many times it is submitted against the same resource. The first definitive
//! outcome (acknowledgment or rejection) is recorded and replayed for every
//! retry. Transport failures are never recorded: the outcome is unknown, so
//! a retry must reach the platform again. Entries die with their resource.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use crate::command::Acknowledgment;
use crate::domain::shared::error::PlatformRejection;
use crate::domain::shared::value_objects::{CommandId, ResourceId};

/// How many resource-less entries (`dial`, `create_conference`, `send_fax`)
/// are kept. Keyed entries die with their resource; these have no resource
/// to die with, so the oldest fall off once the table is full.
const UNKEYED_RETENTION: usize = 1024;

/// First definitive outcome of a keyed command.
#[derive(Debug, Clone)]
pub enum RecordedOutcome {
    Acknowledged(Acknowledgment),
    Rejected(PlatformRejection),
}

type Key = (Option<ResourceId>, CommandId);

/// Per-engine table of keyed command outcomes.
#[derive(Debug, Default)]
pub struct IdempotencyTracker {
    entries: HashMap<Key, RecordedOutcome>,
    unkeyed_order: VecDeque<CommandId>,
}

impl IdempotencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the recorded outcome for a resubmission.
    pub fn recall(
        &self,
        resource: Option<&ResourceId>,
        command_id: &CommandId,
    ) -> Option<RecordedOutcome> {
        self.entries
            .get(&(resource.cloned(), command_id.clone()))
            .cloned()
    }

    /// Record the first definitive outcome. Later records for the same key
    /// are ignored; the first answer is the answer.
    pub fn record(
        &mut self,
        resource: Option<ResourceId>,
        command_id: CommandId,
        outcome: RecordedOutcome,
    ) {
        let unkeyed = resource.is_none();
        match self.entries.entry((resource, command_id.clone())) {
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(outcome);
                if unkeyed {
                    self.unkeyed_order.push_back(command_id);
                    while self.unkeyed_order.len() > UNKEYED_RETENTION {
                        if let Some(oldest) = self.unkeyed_order.pop_front() {
                            self.entries.remove(&(None, oldest));
                        }
                    }
                }
            }
        }
    }

    /// Drop every entry keyed to a resource. Called when the resource
    /// reaches a terminal state; its command ids can never conflict again.
    pub fn forget_resource(&mut self, resource: &ResourceId) {
        self.entries
            .retain(|(r, _), _| r.as_ref() != Some(resource));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! In-memory projection arena
//!
//! One slot per resource, each behind its own mutex so mutations to a single
//! call, conference, queue or fax are serialized while unrelated resources
//! proceed in parallel. The outer map lock is held only long enough to find
//! or insert a slot, never across a projection mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::domain::call::Call;
use crate::domain::conference::Conference;
use crate::domain::fax::Fax;
use crate::domain::queue::Queue;
use crate::domain::shared::value_objects::ResourceId;

/// A projected entity.
#[derive(Debug, Clone)]
pub enum Projection {
    Call(Call),
    Conference(Conference),
    Queue(Queue),
    Fax(Fax),
}

impl Projection {
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Projection::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_call_mut(&mut self) -> Option<&mut Call> {
        match self {
            Projection::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_conference(&self) -> Option<&Conference> {
        match self {
            Projection::Conference(conference) => Some(conference),
            _ => None,
        }
    }

    pub fn as_conference_mut(&mut self) -> Option<&mut Conference> {
        match self {
            Projection::Conference(conference) => Some(conference),
            _ => None,
        }
    }

    pub fn as_queue(&self) -> Option<&Queue> {
        match self {
            Projection::Queue(queue) => Some(queue),
            _ => None,
        }
    }

    pub fn as_queue_mut(&mut self) -> Option<&mut Queue> {
        match self {
            Projection::Queue(queue) => Some(queue),
            _ => None,
        }
    }

    pub fn as_fax(&self) -> Option<&Fax> {
        match self {
            Projection::Fax(fax) => Some(fax),
            _ => None,
        }
    }

    pub fn as_fax_mut(&mut self) -> Option<&mut Fax> {
        match self {
            Projection::Fax(fax) => Some(fax),
            _ => None,
        }
    }
}

pub type Slot = Arc<Mutex<Projection>>;

/// Concurrent map of resource id to projection slot.
#[derive(Debug, Default)]
pub struct ProjectionStore {
    slots: RwLock<HashMap<ResourceId, Slot>>,
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &ResourceId) -> Option<Slot> {
        self.slots.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &ResourceId) -> bool {
        self.slots.read().await.contains_key(id)
    }

    /// Find the slot for `id`, inserting one built by `init` when absent.
    pub async fn get_or_insert_with<F>(&self, id: ResourceId, init: F) -> Slot
    where
        F: FnOnce() -> Projection,
    {
        let mut slots = self.slots.write().await;
        slots
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    pub async fn insert(&self, id: ResourceId, projection: Projection) -> Slot {
        let slot = Arc::new(Mutex::new(projection));
        self.slots.write().await.insert(id, slot.clone());
        slot
    }

    pub async fn remove(&self, id: &ResourceId) -> Option<Slot> {
        self.slots.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Clone the current value of every slot. Each slot is locked briefly
    /// and in turn; the result is a point-in-time-per-resource snapshot, not
    /// a global one.
    pub async fn snapshot(&self) -> Vec<(ResourceId, Projection)> {
        let slots: Vec<(ResourceId, Slot)> = {
            let map = self.slots.read().await;
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        let mut out = Vec::with_capacity(slots.len());
        for (id, slot) in slots {
            let projection = slot.lock().await.clone();
            out.push((id, projection));
        }
        out
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.snapshot()
            .await
            .into_iter()
            .filter_map(|(_, p)| match p {
                Projection::Call(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub async fn conferences(&self) -> Vec<Conference> {
        self.snapshot()
            .await
            .into_iter()
            .filter_map(|(_, p)| match p {
                Projection::Conference(conference) => Some(conference),
                _ => None,
            })
            .collect()
    }

    pub async fn queues(&self) -> Vec<Queue> {
        self.snapshot()
            .await
            .into_iter()
            .filter_map(|(_, p)| match p {
                Projection::Queue(queue) => Some(queue),
                _ => None,
            })
            .collect()
    }

    pub async fn faxes(&self) -> Vec<Fax> {
        self.snapshot()
            .await
            .into_iter()
            .filter_map(|(_, p)| match p {
                Projection::Fax(fax) => Some(fax),
                _ => None,
            })
            .collect()
    }

    /// Slots of every conference, for cross-resource cascades such as a leg
    /// hanging up while in a conference.
    pub async fn conference_slots(&self) -> Vec<(ResourceId, Slot)> {
        let map = self.slots.read().await;
        map.iter()
            .filter(|(id, _)| matches!(id, ResourceId::Conference(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Slots of every queue, for dequeue-on-hangup cascades.
    pub async fn queue_slots(&self) -> Vec<(ResourceId, Slot)> {
        let map = self.slots.read().await;
        map.iter()
            .filter(|(id, _)| matches!(id, ResourceId::Queue(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::CallState;
    use crate::domain::shared::value_objects::{
        CallControlId, CallLegId, CallSessionId, ConnectionId, QueueName,
    };

    fn call_projection(id: &str) -> Projection {
        Projection::Call(Call::new(
            CallControlId::new(id),
            CallLegId::new(format!("leg-{id}")),
            CallSessionId::new(format!("session-{id}")),
            ConnectionId::new("c1"),
            CallState::Parked,
        ))
    }

    #[test]
    fn test_insert_and_snapshot() {
        tokio_test::block_on(async {
            let store = ProjectionStore::new();
            let id = ResourceId::Call(CallControlId::new("a"));
            store.insert(id.clone(), call_projection("a")).await;

            assert!(store.contains(&id).await);
            assert_eq!(store.len().await, 1);
            assert_eq!(store.calls().await.len(), 1);
            assert!(store.queues().await.is_empty());
        });
    }

    #[test]
    fn test_get_or_insert_keeps_existing() {
        tokio_test::block_on(async {
            let store = ProjectionStore::new();
            let id = ResourceId::Call(CallControlId::new("a"));

            let slot = store
                .get_or_insert_with(id.clone(), || call_projection("a"))
                .await;
            {
                let mut projection = slot.lock().await;
                projection
                    .as_call_mut()
                    .unwrap()
                    .transition(CallState::Answered, chrono::Utc::now());
            }

            let again = store
                .get_or_insert_with(id, || panic!("slot must already exist"))
                .await;
            let projection = again.lock().await;
            assert_eq!(projection.as_call().unwrap().state, CallState::Answered);
        });
    }

    #[test]
    fn test_remove() {
        tokio_test::block_on(async {
            let store = ProjectionStore::new();
            let id = ResourceId::Queue(QueueName::new("support"));
            store
                .insert(
                    id.clone(),
                    Projection::Queue(crate::domain::queue::Queue::new(
                        QueueName::new("support"),
                        100,
                    )),
                )
                .await;

            assert!(store.remove(&id).await.is_some());
            assert!(!store.contains(&id).await);
            assert!(store.remove(&id).await.is_none());
        });
    }
}

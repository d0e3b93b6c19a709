//! Domain layer - entity projections and their state machines
//!
//! Projections are locally reconstructed views of remote entities, derived
//! from command acknowledgments (optimistic) and webhook events
//! (authoritative). External callers only ever receive clones.

pub mod call;
pub mod conference;
pub mod fax;
pub mod queue;
pub mod shared;

//! Application layer: the correlation engine and its supporting services.

pub mod engine;
pub mod idempotency;
pub mod pagination;
pub mod projector;

pub use engine::{CorrelationEngine, IngestStats};
pub use projector::EventDisposition;

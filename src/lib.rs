//! Switchboard - client-side state model for an asynchronous call-control platform
//!
//! The remote platform acknowledges commands synchronously but reports real
//! outcomes later through at-least-once, unordered webhook events. This crate
//! correlates the two information sources into consistent projections of
//! calls, conferences, queues and faxes, with idempotent command submission.

pub mod application;
pub mod command;
pub mod config;
pub mod domain;
pub mod event;
pub mod infrastructure;

// Re-export commonly used types
pub use application::engine::CorrelationEngine;
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;

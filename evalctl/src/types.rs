//! Common type definitions shared across the engine.
//!
//! This module defines:
//! - Type aliases for entity IDs (RunId, EventId)
//! - The [`Clock`] seam used everywhere the engine reads time
//! - [`abbrev_uuid`] for log-friendly IDs

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier of a persisted evaluation run.
pub type RunId = Uuid;
/// Identifier of a usage ledger event.
pub type EventId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces.
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Source of the current time.
///
/// Every component that reads a wall clock (run timestamps, month boundaries,
/// forecast math) takes a `Clock` at construction instead of calling
/// `Utc::now()` directly, so tests can pin time to a fixed instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

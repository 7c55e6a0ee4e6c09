//! # Error Types
//!
//! Errors raised by the data model itself. Codec, registry and adapter
//! errors live in `event-bus`.

use thiserror::Error;

/// Metadata validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("schema version must not be empty")]
    EmptySchemaVersion,

    #[error("event id must not be empty")]
    EmptyEventId,

    #[error("event source must not be empty")]
    EmptyEventSource,

    #[error("event type must not be empty")]
    EmptyEventType,

    #[error("event time must be greater than 0, got {event_time}")]
    NonPositiveEventTime { event_time: i64 },

    /// The sender's clock runs ahead of ours by more than the allowed skew.
    #[error("event time {event_time} is more than {max_skew_secs}s ahead of now ({now})")]
    EventTimeInFuture {
        event_time: i64,
        now: i64,
        max_skew_secs: i64,
    },
}

/// Failures reported by an event's own validation or by its factory.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event metadata is missing")]
    MissingMetadata,

    #[error("invalid event metadata: {0}")]
    Metadata(#[from] MetadataError),

    /// Application-level rule violated.
    #[error("invalid event: {0}")]
    Invalid(String),

    #[error("event construction failed: {0}")]
    Construction(String),
}

impl EventError {
    /// Shorthand for application validation failures.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }
}

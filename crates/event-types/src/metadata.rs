//! # Event Metadata
//!
//! The header record carried by every event and duplicated at the top of
//! the wire envelope.
//!
//! ## Validation
//!
//! - identity values and event id must be non-empty after normalization
//! - `event_time > 0`
//! - `event_time <= now + max_future_skew` (default 300s); there is no lower
//!   bound on how old an event may be
//!
//! Validation normalizes in place before checking.

use crate::errors::MetadataError;
use crate::identity::{EventSource, EventType, SchemaVersion};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Allowed clock drift for events stamped in the future (seconds).
pub const DEFAULT_MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Event metadata.
///
/// Missing JSON fields decode as empty/zero so that validation, not the
/// deserializer, reports what is wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    /// Version of the event model.
    pub schema_version: SchemaVersion,
    /// Caller-assigned id, expected to be globally unique.
    pub event_id: String,
    /// Producer of the event.
    pub event_source: EventSource,
    /// Kind of event.
    pub event_type: EventType,
    /// Unix timestamp in seconds.
    pub event_time: i64,
}

impl Metadata {
    /// Metadata stamped with a fresh v4 UUID and the current time.
    pub fn new(
        schema_version: impl Into<SchemaVersion>,
        event_source: impl Into<EventSource>,
        event_type: impl Into<EventType>,
    ) -> Self {
        Self {
            schema_version: schema_version.into(),
            event_id: Uuid::new_v4().to_string(),
            event_source: event_source.into(),
            event_type: event_type.into(),
            event_time: current_timestamp(),
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Replace the event time.
    #[must_use]
    pub fn with_event_time(mut self, event_time: i64) -> Self {
        self.event_time = event_time;
        self
    }

    /// Normalize identity values and trim the event id.
    pub fn normalize(&mut self) {
        self.schema_version = self.schema_version.normalize();
        self.event_id = self.event_id.trim().to_string();
        self.event_source = self.event_source.normalize();
        self.event_type = self.event_type.normalize();
    }

    /// Normalize, then validate against the wall clock with the default skew.
    pub fn validate(&mut self) -> Result<(), MetadataError> {
        self.validate_at(current_timestamp(), DEFAULT_MAX_FUTURE_SKEW_SECS)
    }

    /// Normalize, then validate against an explicit `now`.
    pub fn validate_at(&mut self, now: i64, max_future_skew_secs: i64) -> Result<(), MetadataError> {
        self.normalize();

        if self.schema_version.is_empty() {
            return Err(MetadataError::EmptySchemaVersion);
        }
        if self.event_id.is_empty() {
            return Err(MetadataError::EmptyEventId);
        }
        if self.event_source.is_empty() {
            return Err(MetadataError::EmptyEventSource);
        }
        if self.event_type.is_empty() {
            return Err(MetadataError::EmptyEventType);
        }
        if self.event_time <= 0 {
            return Err(MetadataError::NonPositiveEventTime {
                event_time: self.event_time,
            });
        }
        if self.event_time > now.saturating_add(max_future_skew_secs) {
            return Err(MetadataError::EventTimeInFuture {
                event_time: self.event_time,
                now,
                max_skew_secs: max_future_skew_secs,
            });
        }

        Ok(())
    }
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

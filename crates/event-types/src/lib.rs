//! # Event Types Crate
//!
//! Data model shared by the envelope codec, the adapters and application
//! code.
//!
//! ## Design Principles
//!
//! - **Identity triple**: `(SchemaVersion, EventSource, EventType)` selects the
//!   concrete event type on receipt; the transport never needs to know it.
//! - **Normalized identity**: trim + lowercase before any comparison.
//! - **Duplicated metadata**: the envelope carries metadata for inspection,
//!   the payload carries the authoritative copy.

pub mod envelope;
pub mod errors;
pub mod event;
pub mod headers;
pub mod identity;
pub mod metadata;

pub use envelope::{Envelope, CONTENT_TYPE_JSON};
pub use errors::{EventError, MetadataError};
pub use event::{AsAny, Event, EventPayload};
pub use headers::{
    metadata_to_headers, HEADER_EVENT_ID, HEADER_EVENT_SOURCE, HEADER_EVENT_TIME,
    HEADER_EVENT_TYPE, HEADER_SCHEMA_VERSION,
};
pub use identity::{EventSource, EventType, SchemaVersion};
pub use metadata::{current_timestamp, Metadata, DEFAULT_MAX_FUTURE_SKEW_SECS};

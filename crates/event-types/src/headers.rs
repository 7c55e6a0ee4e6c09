//! # Transport Headers
//!
//! Metadata exposed as literal, case-sensitive transport headers so that
//! brokers and operators can route or inspect without decoding the body.

use crate::metadata::Metadata;
use std::collections::HashMap;

pub const HEADER_SCHEMA_VERSION: &str = "x-event-schema-version";
pub const HEADER_EVENT_ID: &str = "x-event-id";
pub const HEADER_EVENT_SOURCE: &str = "x-event-source";
pub const HEADER_EVENT_TYPE: &str = "x-event-type";
pub const HEADER_EVENT_TIME: &str = "x-event-time";

impl Metadata {
    /// Header mapping. Empty fields and non-positive times are omitted.
    pub fn to_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        if !self.schema_version.is_empty() {
            headers.insert(HEADER_SCHEMA_VERSION.to_string(), self.schema_version.to_string());
        }
        if !self.event_id.trim().is_empty() {
            headers.insert(HEADER_EVENT_ID.to_string(), self.event_id.clone());
        }
        if !self.event_source.is_empty() {
            headers.insert(HEADER_EVENT_SOURCE.to_string(), self.event_source.to_string());
        }
        if !self.event_type.is_empty() {
            headers.insert(HEADER_EVENT_TYPE.to_string(), self.event_type.to_string());
        }
        if self.event_time > 0 {
            headers.insert(HEADER_EVENT_TIME.to_string(), self.event_time.to_string());
        }

        headers
    }

    /// Rebuild metadata from headers. Absent or unparsable fields stay
    /// empty/zero; run `validate` before trusting the result.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        let get = |key: &str| headers.get(key).cloned().unwrap_or_default();

        Self {
            schema_version: get(HEADER_SCHEMA_VERSION).into(),
            event_id: get(HEADER_EVENT_ID),
            event_source: get(HEADER_EVENT_SOURCE).into(),
            event_type: get(HEADER_EVENT_TYPE).into(),
            event_time: headers
                .get(HEADER_EVENT_TIME)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Header mapping for optional metadata; `None` yields an empty map.
pub fn metadata_to_headers(metadata: Option<&Metadata>) -> HashMap<String, String> {
    metadata.map(Metadata::to_headers).unwrap_or_default()
}

//! # Wire Envelope
//!
//! The unit that crosses the transport verbatim:
//!
//! ```text
//! { "metadata": { "schemaVersion": .., "eventId": .., "eventSource": ..,
//!                 "eventType": .., "eventTime": .. },
//!   "payload": "<base64 of the event's JSON>" }
//! ```
//!
//! The envelope's metadata is used for routing and inspection without a full
//! payload decode. The payload carries its own copy, which is authoritative
//! once decoded.

use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// Content type declared on published messages.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Metadata plus opaque serialized event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// `None` when the sender omitted it or sent `null`.
    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// JSON bytes of the concrete event.
    #[serde(default, with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(metadata: Metadata, payload: Vec<u8>) -> Self {
        Self {
            metadata: Some(metadata),
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Standard base64 for byte payloads; `null` reads as empty.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(text) => STANDARD.decode(text).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

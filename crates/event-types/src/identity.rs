//! # Identity Values
//!
//! `SchemaVersion`, `EventSource` and `EventType` together form the identity
//! triple used to resolve a concrete event type on receipt.
//!
//! Normalization trims surrounding whitespace and lowercases. Emptiness,
//! equality and hashing are all defined on the normalized form, so
//! `" Orders "` and `"orders"` name the same source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

macro_rules! identity_value {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string. No normalization happens here.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Trimmed, lowercased copy.
            #[must_use]
            pub fn normalize(&self) -> Self {
                Self(normalize_str(&self.0))
            }

            /// True when nothing remains after normalization.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// The raw string as stored.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the raw string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                normalize_str(&self.0) == normalize_str(&other.0)
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                normalize_str(&self.0).hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identity_value!(
    /// Version of the event model (e.g. `v1`).
    SchemaVersion
);

identity_value!(
    /// Producer of an event (service or bounded context name).
    EventSource
);

identity_value!(
    /// Kind of event within a source (e.g. `order.created`).
    EventType
);

fn normalize_str(value: &str) -> String {
    value.trim().to_lowercase()
}

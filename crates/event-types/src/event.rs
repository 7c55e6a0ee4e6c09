//! # Event Capability
//!
//! Concrete events are defined by application code. This crate never
//! enumerates them; it only needs each one to expose its metadata, validate
//! itself and round-trip through JSON.
//!
//! `EventPayload` and `AsAny` are blanket-implemented, so an application
//! type only has to derive `Serialize`/`Deserialize` and implement `Event`:
//!
//! ```ignore
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct OrderCreated {
//!     metadata: Metadata,
//!     order_id: String,
//! }
//!
//! impl Event for OrderCreated {
//!     fn metadata(&self) -> Option<&Metadata> {
//!         Some(&self.metadata)
//!     }
//!
//!     fn metadata_mut(&mut self) -> Option<&mut Metadata> {
//!         Some(&mut self.metadata)
//!     }
//! }
//! ```

use crate::errors::EventError;
use crate::metadata::Metadata;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;

/// A self-describing event.
pub trait Event: EventPayload + AsAny + fmt::Debug + Send + Sync + 'static {
    /// The event's own metadata.
    fn metadata(&self) -> Option<&Metadata>;

    /// Mutable access, used to normalize before encoding.
    fn metadata_mut(&mut self) -> Option<&mut Metadata>;

    /// Validate the event. Normalizes metadata in place.
    ///
    /// Override to add payload rules; call `Metadata::validate` from the
    /// override to keep the metadata checks.
    fn validate(&mut self) -> Result<(), EventError> {
        match self.metadata_mut() {
            Some(metadata) => metadata.validate().map_err(EventError::from),
            None => Err(EventError::MissingMetadata),
        }
    }
}

/// JSON serialization of an event body.
///
/// Population is separate from construction: a factory builds an empty
/// instance and `populate` fills it from payload bytes.
pub trait EventPayload {
    fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error>;

    fn populate(&mut self, payload: &[u8]) -> Result<(), serde_json::Error>;
}

impl<T> EventPayload for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn populate(&mut self, payload: &[u8]) -> Result<(), serde_json::Error> {
        *self = serde_json::from_slice(payload)?;
        Ok(())
    }
}

/// Upcast helpers for downcasting decoded events.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn Event {
    /// Borrow as a concrete event type.
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Convert into a concrete event type, handing the box back on mismatch.
    pub fn downcast<T: Event>(self: Box<Self>) -> Result<Box<T>, Box<dyn Event>> {
        if (*self).as_any().is::<T>() {
            match self.into_any().downcast::<T>() {
                Ok(event) => Ok(event),
                Err(_) => unreachable!("type checked above"),
            }
        } else {
            Err(self)
        }
    }

    /// Event id from the event's own metadata, or `""`.
    pub fn event_id(&self) -> &str {
        self.metadata().map(|m| m.event_id.as_str()).unwrap_or_default()
    }
}

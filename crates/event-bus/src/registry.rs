//! # Factory Registry
//!
//! Maps an identity triple to a zero-argument constructor producing an empty
//! event instance ready to be populated from a payload.
//!
//! ## Rules
//!
//! - Keys are normalized; any empty component is rejected.
//! - Registration is add-only. A second registration for the same triple
//!   fails and leaves the first constructor in place.
//! - Reads take a shared lock, registrations an exclusive one. Keys are built
//!   before the lock is taken.
//!
//! Registries are plain objects so tests can build isolated ones;
//! [`FactoryRegistry::global`] is the process-wide default.

use event_types::{Event, EventError, EventSource, EventType, SchemaVersion};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Constructor for an empty event instance.
pub type EventFactory = Arc<dyn Fn() -> Result<Box<dyn Event>, EventError> + Send + Sync>;

/// Separator between key components.
pub const KEY_SEPARATOR: char = '|';

/// Registry failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid factory key: {field} must not be empty")]
    InvalidKey { field: &'static str },

    #[error("event factory already registered: {key}")]
    DuplicateKey { key: String },

    #[error("event factory not found: {key}")]
    NotFound { key: String },
}

/// Normalized identity triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactoryKey {
    pub schema_version: SchemaVersion,
    pub event_source: EventSource,
    pub event_type: EventType,
}

impl FactoryKey {
    /// Normalize and check every component.
    pub fn new(
        schema_version: &SchemaVersion,
        event_source: &EventSource,
        event_type: &EventType,
    ) -> Result<Self, RegistryError> {
        let schema_version = schema_version.normalize();
        if schema_version.is_empty() {
            return Err(RegistryError::InvalidKey {
                field: "schema version",
            });
        }

        let event_source = event_source.normalize();
        if event_source.is_empty() {
            return Err(RegistryError::InvalidKey {
                field: "event source",
            });
        }

        let event_type = event_type.normalize();
        if event_type.is_empty() {
            return Err(RegistryError::InvalidKey {
                field: "event type",
            });
        }

        Ok(Self {
            schema_version,
            event_source,
            event_type,
        })
    }
}

impl fmt::Display for FactoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.schema_version,
            self.event_source,
            self.event_type,
            sep = KEY_SEPARATOR
        )
    }
}

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<FactoryRegistry> = Arc::new(FactoryRegistry::new());
}

/// Concurrent mapping from composite key to event factory.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, EventFactory>>,
}

impl FactoryRegistry {
    /// Create an empty, isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<FactoryRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Register a factory for a triple.
    pub fn register<F>(
        &self,
        schema_version: impl Into<SchemaVersion>,
        event_source: impl Into<EventSource>,
        event_type: impl Into<EventType>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<Box<dyn Event>, EventError> + Send + Sync + 'static,
    {
        let key = FactoryKey::new(
            &schema_version.into(),
            &event_source.into(),
            &event_type.into(),
        )?
        .to_string();

        let mut factories = self.factories.write();
        if factories.contains_key(&key) {
            return Err(RegistryError::DuplicateKey { key });
        }
        factories.insert(key.clone(), Arc::new(factory));
        drop(factories);

        debug!(key = %key, "Event factory registered");
        Ok(())
    }

    /// Register `T::default()` as the factory for a triple.
    pub fn register_default<T>(
        &self,
        schema_version: impl Into<SchemaVersion>,
        event_source: impl Into<EventSource>,
        event_type: impl Into<EventType>,
    ) -> Result<(), RegistryError>
    where
        T: Event + Default,
    {
        self.register(schema_version, event_source, event_type, || {
            Ok(Box::new(T::default()) as Box<dyn Event>)
        })
    }

    /// Register during startup wiring where a failure is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if the key is invalid or already registered.
    pub fn must_register<F>(
        &self,
        schema_version: impl Into<SchemaVersion>,
        event_source: impl Into<EventSource>,
        event_type: impl Into<EventType>,
        factory: F,
    ) where
        F: Fn() -> Result<Box<dyn Event>, EventError> + Send + Sync + 'static,
    {
        if let Err(e) = self.register(schema_version, event_source, event_type, factory) {
            panic!("event factory registration failed: {e}");
        }
    }

    /// Resolve the factory for a triple.
    pub fn lookup(
        &self,
        schema_version: &SchemaVersion,
        event_source: &EventSource,
        event_type: &EventType,
    ) -> Result<EventFactory, RegistryError> {
        let key = FactoryKey::new(schema_version, event_source, event_type)?.to_string();

        let factories = self.factories.read();
        match factories.get(&key) {
            Some(factory) => Ok(factory.clone()),
            None => Err(RegistryError::NotFound { key }),
        }
    }

    /// Whether a factory exists. Invalid input reports `false`.
    pub fn exists(
        &self,
        schema_version: &SchemaVersion,
        event_source: &EventSource,
        event_type: &EventType,
    ) -> bool {
        let Ok(key) = FactoryKey::new(schema_version, event_source, event_type) else {
            return false;
        };
        let key = key.to_string();

        self.factories.read().contains_key(&key)
    }

    /// Sorted snapshot of registered keys, for diagnostics.
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("keys", &self.list_keys())
            .finish()
    }
}

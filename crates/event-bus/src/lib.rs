//! # Event Bus - Envelope Protocol over a Generic Transport
//!
//! Wraps typed domain events in a self-describing JSON envelope, publishes
//! them through a pluggable transport, and on receipt reconstructs the
//! concrete event type from a factory registry keyed by
//! `(schemaVersion, eventSource, eventType)`.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  publish()   ┌──────────────┐   encode    ┌──────────────┐
//! │ Application  │ ───────────▶ │ EventPublisher│ ─────────▶ │  Transport   │
//! └──────────────┘              └──────────────┘             └──────────────┘
//!        ▲                                                          │
//!        │ handle()         ┌──────────────┐   decode + guard       │
//!        └───────────────── │EventSubscriber│ ◀─────────────────────┘
//!                           └──────────────┘
//!                                  │ lookup
//!                                  ▼
//!                           ┌──────────────┐
//!                           │FactoryRegistry│
//!                           └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Validate before send:** invalid events never reach the transport
//! - **Exact metadata match:** envelope and payload metadata must agree
//! - **Fault containment:** a panicking handler becomes a delivery error

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod codec;
pub mod config;
pub mod guard;
pub mod memory;
pub mod metrics;
pub mod publisher;
pub mod registry;
pub mod subscriber;
pub mod transport;

// Re-export main types
pub use codec::{CodecError, EncodedEnvelope, EnvelopeCodec};
pub use config::{BusConfig, ConfigError};
pub use guard::{contain, HandlerFault};
pub use memory::{DeliveryOutcome, InMemoryBroker};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use publisher::{EventPublisher, PublishError};
pub use registry::{EventFactory, FactoryKey, FactoryRegistry, RegistryError, KEY_SEPARATOR};
pub use subscriber::{
    handler_fn, wrap_handler, DeliveryContext, DeliveryError, EventHandler, EventSubscriber,
    HandlerFn, SubscribeError,
};
pub use transport::{
    Delivery, DeliveryCallback, SubscribeOptions, SubscriptionId, TransportError,
    TransportMessage, TransportPublisher, TransportSubscriber,
};

pub use event_types;

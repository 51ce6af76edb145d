//! Event trait and related types.
//!
//! Events represent immutable facts about things that have happened inside
//! an aggregate. They are buffered during a transaction (see
//! [`crate::buffer::EventBuffer`]), dispatched to in-process handlers after
//! a successful commit and, for integration events, serialized into
//! durably scheduled jobs.
//!
//! # Design
//!
//! Events are serialized with `bincode`: compact, fast, and every consumer
//! in this system is Rust. Human readability is not a goal for job payloads;
//! the `event_type()` string carries the identification and versioning.
//!
//! # Example
//!
//! ```
//! use spotswap_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum SpotEvent {
//!     SpotBooked { booking_id: String },
//! }
//!
//! impl Event for SpotEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             SpotEvent::SpotBooked { .. } => "SpotBooked.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// Unknown event type encountered during deserialization.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// An event emitted by an aggregate.
///
/// # Event Naming Convention
///
/// `event_type()` returns a stable string identifier including a version
/// suffix, e.g. `"SpotBooked.v1"`. The version suffix allows schemas to
/// evolve without breaking the deserialization of already-scheduled jobs.
///
/// # Integration Events
///
/// `is_integration()` marks events whose handlers must have outbox
/// guarantees: they schedule a durable job instead of acting immediately.
/// Handlers of non-integration events run synchronously in the same
/// transaction as the triggering mutation.
///
/// The distinction is usually derived with `#[derive(DomainEvent)]` from
/// `spotswap-macros`, marking variants with `#[integration]`.
pub trait Event: Send + Sync + 'static {
    /// Returns the stable, versioned type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Returns true when this event requires outbox delivery guarantees.
    fn is_integration(&self) -> bool {
        false
    }

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized, which is rare with bincode.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are
    /// corrupted, belong to a different event type, or the schema changed
    /// incompatibly.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready to travel as a job payload.
///
/// Contains the event type name and the serialized bytes, along with
/// optional JSON metadata (correlation ids, the triggering user, ...).
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// The event type identifier (e.g. `"SpotBooked.v1"`).
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata attached by the shell.
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Serialize an [`Event`] into its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

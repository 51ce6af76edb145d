//! Per-aggregate event buffering.
//!
//! Every aggregate owns an append-only, in-memory queue of events recorded
//! during its method calls. The persistence layer (excluded from this
//! engine) drains the queue with [`EventBuffer::take_uncommitted`] exactly
//! once per successful commit and dispatches the drained events. On a
//! rolled-back transaction the buffer must *not* be drained: events for
//! changes that did not durably commit are never dispatched; the aggregate
//! instance is simply discarded.

use std::fmt;

/// Append-only queue of uncommitted events for one aggregate instance.
///
/// # Example
///
/// ```
/// use spotswap_core::buffer::EventBuffer;
///
/// let mut buffer: EventBuffer<&'static str> = EventBuffer::new();
/// buffer.record("first");
/// buffer.record("second");
///
/// assert_eq!(buffer.take_uncommitted(), vec!["first", "second"]);
/// assert!(buffer.take_uncommitted().is_empty()); // drained exactly once
/// ```
#[derive(Clone, Default)]
pub struct EventBuffer<E> {
    uncommitted: Vec<E>,
}

impl<E> EventBuffer<E> {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            uncommitted: Vec::new(),
        }
    }

    /// Append an event to the buffer.
    pub fn record(&mut self, event: E) {
        self.uncommitted.push(event);
    }

    /// Atomically drain and return the buffered events.
    ///
    /// A subsequent call returns an empty vector. Call this exactly once
    /// per successful commit, in place of re-reading the aggregate.
    #[must_use]
    pub fn take_uncommitted(&mut self) -> Vec<E> {
        std::mem::take(&mut self.uncommitted)
    }

    /// Number of events recorded since the last drain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uncommitted.len()
    }

    /// True when no events have been recorded since the last drain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uncommitted.is_empty()
    }
}

impl<E> fmt::Debug for EventBuffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuffer")
            .field("uncommitted", &self.uncommitted.len())
            .finish()
    }
}

/// An aggregate root that buffers domain events.
///
/// Implemented by every aggregate in the domain layer; used by the shell to
/// drain events uniformly after a commit, and by the test helpers in
/// `spotswap-testing` to assert on emitted events.
pub trait Aggregate {
    /// The event type this aggregate emits.
    type Event;

    /// Drain all uncommitted events (see [`EventBuffer::take_uncommitted`]).
    fn take_uncommitted(&mut self) -> Vec<Self::Event>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_order() {
        let mut buffer = EventBuffer::new();
        buffer.record(1);
        buffer.record(2);
        buffer.record(3);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.take_uncommitted(), vec![1, 2, 3]);
    }

    #[test]
    fn drain_is_exactly_once() {
        let mut buffer = EventBuffer::new();
        buffer.record("event");

        assert_eq!(buffer.take_uncommitted().len(), 1);
        assert!(buffer.take_uncommitted().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn recording_after_drain_starts_fresh() {
        let mut buffer = EventBuffer::new();
        buffer.record("a");
        let _ = buffer.take_uncommitted();

        buffer.record("b");
        assert_eq!(buffer.take_uncommitted(), vec!["b"]);
    }
}

//! In-process event dispatch.
//!
//! After a transaction commits, the events drained from the touched
//! aggregates are handed to a [`Dispatcher`]: a static, ordered registration
//! table of handler functions keyed by `event_type()`. No runtime
//! reflection: each aggregate's event enum gets one table, built once at
//! startup, and handlers run in registration order within the committing
//! transaction.
//!
//! Two kinds of handlers share the table:
//!
//! - **Synchronous side effects**: mutate *other* aggregates through store
//!   ports in the same transaction (wallet charge, reputation change)
//! - **Outbox handlers**: record a durable job through the
//!   [`crate::outbox::Outbox`]; the job itself runs later, but recording it
//!   is a same-transaction write
//!
//! A handler error aborts the dispatch (and, at a real persistence boundary,
//! rolls the transaction back); subsequent handlers do not run.

use crate::event::Event;
use tracing::debug;

type HandlerFn<E, Env, Err> = Box<dyn Fn(&E, &Env) -> Result<(), Err> + Send + Sync>;

/// Ordered registration table of event handlers.
///
/// # Type Parameters
///
/// - `E`: the event enum this table dispatches
/// - `Env`: the injected dependencies handlers operate through (store
///   ports, outbox, clock)
/// - `Err`: the error type handlers produce
///
/// # Example
///
/// ```
/// use spotswap_core::dispatch::Dispatcher;
/// use spotswap_core::event::Event;
/// # use serde::{Serialize, Deserialize};
/// # #[derive(Clone, Debug, Serialize, Deserialize)]
/// # enum SpotEvent { SpotBooked { cost: u32 } }
/// # impl Event for SpotEvent {
/// #     fn event_type(&self) -> &'static str { "SpotBooked.v1" }
/// # }
///
/// let mut dispatcher: Dispatcher<SpotEvent, (), String> = Dispatcher::new();
/// dispatcher.register("SpotBooked.v1", |event, _env| {
///     // charge the wallet, notify the owner, ...
///     Ok(())
/// });
///
/// dispatcher.dispatch(&SpotEvent::SpotBooked { cost: 2 }, &()).unwrap();
/// ```
pub struct Dispatcher<E, Env, Err> {
    handlers: Vec<(&'static str, HandlerFn<E, Env, Err>)>,
}

impl<E, Env, Err> Dispatcher<E, Env, Err>
where
    E: Event,
{
    /// Create an empty dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler for one event type.
    ///
    /// Handlers for the same event type run in registration order. The
    /// `event_type` key must match the event's `event_type()` string
    /// exactly (including the version suffix).
    pub fn register<F>(&mut self, event_type: &'static str, handler: F)
    where
        F: Fn(&E, &Env) -> Result<(), Err> + Send + Sync + 'static,
    {
        self.handlers.push((event_type, Box::new(handler)));
    }

    /// Dispatch one event to every matching handler, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; later handlers do not run.
    pub fn dispatch(&self, event: &E, env: &Env) -> Result<(), Err> {
        let event_type = event.event_type();
        for (key, handler) in &self.handlers {
            if *key == event_type {
                debug!(event_type, integration = event.is_integration(), "dispatching event");
                handler(event, env)?;
            }
        }
        Ok(())
    }

    /// Dispatch a batch of events in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first handler error.
    pub fn dispatch_all(&self, events: &[E], env: &Env) -> Result<(), Err> {
        for event in events {
            self.dispatch(event, env)?;
        }
        Ok(())
    }

    /// Number of registered handlers (across all event types).
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E, Env, Err> Default for Dispatcher<E, Env, Err>
where
    E: Event,
{
    fn default() -> Self {
        Self::new()
    }
}

//! Outbox facade over the durable scheduler.
//!
//! One durable-job abstraction backs two distinct intents, and this facade
//! keeps the intent explicit at each call site:
//!
//! - [`Outbox::schedule_side_effect`]: "deliver this integration event
//!   sometime after commit, at least once" (push notification, cross-
//!   aggregate follow-up write)
//! - [`Outbox::schedule_delayed_command`]: "run this self-command at a
//!   known future instant" (expire a request at its start, complete a
//!   booking at its end, confirm pending credits after the grace window)
//!
//! Both record the job inside the caller's transaction; neither executes
//! anything.

use crate::event::{Event, SerializedEvent};
use crate::scheduler::{DurableScheduler, JobKey, JobTrigger, ScheduledJob, SchedulerError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// The transactional outbox.
///
/// Cloneable handle wrapping the injected [`DurableScheduler`] port.
#[derive(Clone)]
pub struct Outbox {
    scheduler: Arc<dyn DurableScheduler>,
}

impl Outbox {
    /// Create an outbox over a scheduler port.
    #[must_use]
    pub fn new(scheduler: Arc<dyn DurableScheduler>) -> Self {
        Self { scheduler }
    }

    /// Record a side-effect job that becomes due immediately after commit.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::PayloadError`] if the command cannot be
    /// serialized, or a storage error from the port.
    pub fn schedule_side_effect<C: Event + Serialize>(
        &self,
        key: JobKey,
        command: &C,
    ) -> Result<(), SchedulerError> {
        self.schedule(key, JobTrigger::Now, command)
    }

    /// Record a delayed self-command due at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::PayloadError`] if the command cannot be
    /// serialized, or a storage error from the port.
    pub fn schedule_delayed_command<C: Event + Serialize>(
        &self,
        key: JobKey,
        command: &C,
        at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.schedule(key, JobTrigger::At(at), command)
    }

    /// Best-effort cancellation of a previously recorded command.
    ///
    /// Returns `false` when the job was already gone (it may have fired).
    ///
    /// # Errors
    ///
    /// Returns a storage error from the port.
    pub fn cancel_command(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        debug!(job = %key, "cancelling scheduled command");
        self.scheduler.cancel(key)
    }

    /// Delete every job recorded for a business-entity group.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the port.
    pub fn cancel_group(&self, group: &str) -> Result<usize, SchedulerError> {
        debug!(group, "cancelling scheduled command group");
        self.scheduler.cancel_group(group)
    }

    fn schedule<C: Event + Serialize>(
        &self,
        key: JobKey,
        trigger: JobTrigger,
        command: &C,
    ) -> Result<(), SchedulerError> {
        let payload = SerializedEvent::from_event(command, None)
            .map_err(|e| SchedulerError::PayloadError(e.to_string()))?;
        debug!(job = %key, command = payload.event_type.as_str(), "scheduling command");
        self.scheduler.schedule(ScheduledJob::new(key, trigger, payload))
    }
}

//! Durable scheduler port.
//!
//! The scheduler is the single durability mechanism behind both side-effect
//! delivery (the transactional outbox) and delayed self-commands ("expire
//! this request at its start", "mark this booking complete at its end").
//! Job creation is a plain write performed inside the same transaction as
//! the business mutation, so the classic dual-write problem disappears: a
//! job is durably recorded iff the business transaction committed.
//!
//! Execution is asynchronous and at-least-once; a crash between running a
//! job and deleting it re-runs the job. Every job body must therefore be
//! safe to re-run, which the idempotent credits ledger and the
//! no-op-on-terminal state machines above this crate guarantee.
//!
//! Job identity is derived deterministically from the business key so that
//! a competing transition (accept, cancel) can delete the exact job without
//! remembering an opaque scheduler-assigned id. Deleting a missing key is a
//! no-op: the job may have already fired.

use crate::event::SerializedEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from scheduler operations.
///
/// These are infrastructure failures, not business-rule violations; they
/// are never silently swallowed.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The job payload could not be serialized.
    #[error("Failed to serialize job payload: {0}")]
    PayloadError(String),

    /// The backing store rejected the write.
    #[error("Scheduler storage error: {0}")]
    StorageError(String),
}

/// Deterministic identity of a scheduled job.
///
/// The `group` names the owning business entity (e.g. `"booking:<id>"`),
/// the `name` the command within it (e.g. `"complete"`). Jobs with the same
/// key are mutually exclusive: scheduling a duplicate key is ignored by the
/// port, preventing duplicate delayed commands for one business key.
///
/// # Example
///
/// ```
/// use spotswap_core::scheduler::JobKey;
///
/// let key = JobKey::new("booking:b-1", "complete");
/// assert_eq!(key.to_string(), "booking:b-1/complete");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    group: String,
    name: String,
}

impl JobKey {
    /// Create a key from its group and name parts.
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// The owning business-entity group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The command name within the group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

/// When a job becomes due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobTrigger {
    /// Run as soon as possible after the owning transaction commits.
    Now,

    /// Run at (or after) the given instant.
    At(DateTime<Utc>),
}

impl JobTrigger {
    /// True when the trigger has fired at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Now => true,
            Self::At(instant) => *instant <= now,
        }
    }
}

/// A durably recorded job: identity, trigger, and serialized payload.
#[derive(Clone, Debug)]
pub struct ScheduledJob {
    /// Deterministic identity.
    pub key: JobKey,

    /// When the job becomes due.
    pub trigger: JobTrigger,

    /// Serialized command payload (see [`crate::outbox::Outbox`]).
    pub payload: SerializedEvent,
}

impl ScheduledJob {
    /// Create a new job.
    #[must_use]
    pub const fn new(key: JobKey, trigger: JobTrigger, payload: SerializedEvent) -> Self {
        Self {
            key,
            trigger,
            payload,
        }
    }
}

/// The durable scheduler port.
///
/// Scheduling and cancelling are synchronous writes: they happen inside
/// the caller's transaction. Only job *execution* (owned by the runtime's
/// job runner) is asynchronous.
///
/// # Contract
///
/// - `schedule` with an already-present key is a no-op (duplicate-identity
///   rejection)
/// - `cancel` of a missing key is a no-op returning `false` (the job may
///   have already fired)
/// - implementations must be `Send + Sync`; many runner workers may consult
///   the store concurrently
pub trait DurableScheduler: Send + Sync {
    /// Durably record a job.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] if the write fails.
    fn schedule(&self, job: ScheduledJob) -> Result<(), SchedulerError>;

    /// Best-effort delete by deterministic key.
    ///
    /// Returns `true` when a job was removed, `false` when no such job
    /// existed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] if the delete fails.
    fn cancel(&self, key: &JobKey) -> Result<bool, SchedulerError>;

    /// Delete every job in a group; returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] if the delete fails.
    fn cancel_group(&self, group: &str) -> Result<usize, SchedulerError>;
}

//! In-memory durable scheduler.
//!
//! Implements the [`DurableScheduler`] port over a keyed job map. In a
//! deployment the same contract is fulfilled by a database-backed job table
//! living in the business database, so that scheduling participates in the
//! business transaction; this implementation preserves every observable
//! behavior of that contract (duplicate-identity rejection, best-effort
//! cancellation, delete-after-success) for tests and single-process use.

use chrono::{DateTime, Utc};
use spotswap_core::scheduler::{DurableScheduler, JobKey, ScheduledJob, SchedulerError};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Keyed in-memory job store.
#[derive(Default)]
pub struct InMemoryScheduler {
    jobs: Mutex<HashMap<JobKey, ScheduledJob>>,
}

impl InMemoryScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the jobs due at `now`, ordered by key for determinism.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] when the job map lock is
    /// poisoned.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, SchedulerError> {
        let jobs = self.lock()?;
        let mut due: Vec<ScheduledJob> = jobs
            .values()
            .filter(|job| job.trigger.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.key.to_string().cmp(&b.key.to_string()));
        Ok(due)
    }

    /// Delete a job after successful execution.
    ///
    /// Separate from [`DurableScheduler::cancel`] only in intent; the
    /// at-least-once window lives between a job's execution and this call.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] when the job map lock is
    /// poisoned.
    pub fn complete(&self, key: &JobKey) -> Result<(), SchedulerError> {
        self.lock()?.remove(key);
        Ok(())
    }

    /// Number of jobs currently recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] when the job map lock is
    /// poisoned.
    pub fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.lock()?.len())
    }

    /// True when no jobs are recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] when the job map lock is
    /// poisoned.
    pub fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.lock()?.is_empty())
    }

    /// Look up a job by key.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::StorageError`] when the job map lock is
    /// poisoned.
    pub fn get(&self, key: &JobKey) -> Result<Option<ScheduledJob>, SchedulerError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<JobKey, ScheduledJob>>, SchedulerError> {
        self.jobs
            .lock()
            .map_err(|e| SchedulerError::StorageError(format!("job store lock poisoned: {e}")))
    }
}

impl DurableScheduler for InMemoryScheduler {
    fn schedule(&self, job: ScheduledJob) -> Result<(), SchedulerError> {
        let mut jobs = self.lock()?;
        if jobs.contains_key(&job.key) {
            // Duplicate identity: a delayed command for this business key
            // is already recorded.
            debug!(job = %job.key, "ignoring duplicate job");
            return Ok(());
        }
        jobs.insert(job.key.clone(), job);
        Ok(())
    }

    fn cancel(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn cancel_group(&self, group: &str) -> Result<usize, SchedulerError> {
        let mut jobs = self.lock()?;
        let before = jobs.len();
        jobs.retain(|key, _| key.group() != group);
        Ok(before - jobs.len())
    }
}

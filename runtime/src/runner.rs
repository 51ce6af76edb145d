//! At-least-once job execution.
//!
//! The [`JobRunner`] is the only source of concurrency in the system: it
//! collects due jobs from the scheduler and drives each through a
//! [`JobExecutor`] with retry/backoff. A job is deleted only *after* its
//! executor succeeds; a job that exhausts its retry budget stays recorded
//! and is picked up again on a later pass. Both halves of that choice are
//! what make delivery at-least-once rather than at-most-once.

use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::scheduler::InMemoryScheduler;
use chrono::{DateTime, Utc};
use spotswap_core::scheduler::{JobKey, ScheduledJob, SchedulerError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors produced while executing a single job.
#[derive(Error, Debug)]
pub enum JobError {
    /// The job payload could not be deserialized.
    ///
    /// Retrying cannot help; the runner logs and leaves the job for
    /// operator inspection.
    #[error("Malformed job payload for '{key}': {reason}")]
    BadPayload {
        /// The job whose payload failed to decode.
        key: JobKey,
        /// Decoder error text.
        reason: String,
    },

    /// The job body failed; safe to retry (all executors are idempotent).
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    /// The scheduler's storage failed while completing the job.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Executes the command carried by a scheduled job.
///
/// Implementations deserialize the payload and perform the side effect in
/// their own transaction. They must be idempotent: the runner may invoke
/// them more than once for the same job.
pub trait JobExecutor: Send + Sync {
    /// Execute one job.
    ///
    /// # Errors
    ///
    /// Returns a [`JobError`] when the payload is malformed or the side
    /// effect fails.
    fn execute(&self, job: &ScheduledJob) -> Result<(), JobError>;
}

/// Outcome of one [`JobRunner::run_due`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs executed and deleted.
    pub completed: usize,
    /// Jobs that failed and remain scheduled.
    pub failed: usize,
}

/// Drives due jobs through an executor.
pub struct JobRunner {
    scheduler: Arc<InMemoryScheduler>,
    policy: RetryPolicy,
}

impl JobRunner {
    /// Create a runner over a scheduler with the given retry policy.
    #[must_use]
    pub fn new(scheduler: Arc<InMemoryScheduler>, policy: RetryPolicy) -> Self {
        Self { scheduler, policy }
    }

    /// Execute every job due at `now`.
    ///
    /// Each job is retried per the runner's policy; success deletes the
    /// job, exhaustion leaves it scheduled for the next pass. Malformed
    /// payloads are never retried.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`] only when the scheduler storage itself
    /// fails; individual job failures are reported in the [`RunReport`].
    pub async fn run_due(
        &self,
        now: DateTime<Utc>,
        executor: &dyn JobExecutor,
    ) -> Result<RunReport, SchedulerError> {
        let due = self.scheduler.due_jobs(now)?;
        let mut report = RunReport::default();

        for job in due {
            let outcome = retry_with_backoff(self.policy.clone(), || async {
                match executor.execute(&job) {
                    Err(JobError::ExecutionFailed(reason)) => Err(reason),
                    other => Ok(other),
                }
            })
            .await;

            match outcome {
                Ok(Ok(())) => {
                    self.scheduler.complete(&job.key)?;
                    info!(job = %job.key, "job completed");
                    report.completed += 1;
                }
                Ok(Err(err)) => {
                    // Non-retryable (bad payload, storage): leave recorded.
                    warn!(job = %job.key, error = %err, "job failed without retry");
                    report.failed += 1;
                }
                Err(reason) => {
                    warn!(job = %job.key, error = %reason, "job failed, will run again next pass");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

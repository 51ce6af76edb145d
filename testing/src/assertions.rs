//! Assertion helpers for scheduled jobs.

use spotswap_core::scheduler::{JobKey, JobTrigger};
use spotswap_runtime::InMemoryScheduler;

/// Assert that a job with the given key is currently scheduled.
///
/// # Panics
///
/// Panics when the job is missing or the scheduler storage fails.
#[allow(clippy::panic, clippy::expect_used)]
pub fn assert_job_scheduled(scheduler: &InMemoryScheduler, key: &JobKey) {
    let job = scheduler.get(key).expect("scheduler storage failed");
    assert!(job.is_some(), "expected job '{key}' to be scheduled");
}

/// Assert that a job is scheduled with the expected trigger.
///
/// # Panics
///
/// Panics when the job is missing, mis-triggered, or the scheduler storage
/// fails.
#[allow(clippy::panic, clippy::expect_used)]
pub fn assert_job_scheduled_at(
    scheduler: &InMemoryScheduler,
    key: &JobKey,
    expected: JobTrigger,
) {
    let job = scheduler
        .get(key)
        .expect("scheduler storage failed")
        .unwrap_or_else(|| panic!("expected job '{key}' to be scheduled"));
    assert_eq!(
        job.trigger, expected,
        "job '{key}' scheduled with unexpected trigger"
    );
}

/// Assert that no job with the given key is scheduled.
///
/// # Panics
///
/// Panics when the job exists or the scheduler storage fails.
#[allow(clippy::panic, clippy::expect_used)]
pub fn assert_job_absent(scheduler: &InMemoryScheduler, key: &JobKey) {
    let job = scheduler.get(key).expect("scheduler storage failed");
    assert!(job.is_none(), "expected job '{key}' to be absent");
}

/// Assert the total number of scheduled jobs.
///
/// # Panics
///
/// Panics when the count differs or the scheduler storage fails.
#[allow(clippy::panic, clippy::expect_used)]
pub fn assert_job_count(scheduler: &InMemoryScheduler, expected: usize) {
    let actual = scheduler.len().expect("scheduler storage failed");
    assert_eq!(actual, expected, "unexpected number of scheduled jobs");
}

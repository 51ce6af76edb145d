//! # Spotswap Runtime
//!
//! The imperative shell of the marketplace engine.
//!
//! The domain layer never blocks; everything that waits, sleeps, or retries
//! lives here:
//!
//! - [`scheduler::InMemoryScheduler`]: a durable-scheduler port
//!   implementation backed by a keyed job map (the in-memory stand-in for
//!   the database-backed scheduler a deployment would use)
//! - [`runner::JobRunner`]: picks up due jobs and executes them with
//!   at-least-once semantics: a job is deleted only after its executor
//!   succeeds, and a failed job stays scheduled for the next pass
//! - [`retry`]: exponential-backoff retry used by the runner
//!
//! ## Delivery Semantics
//!
//! A crash between executing a job and deleting it re-runs the job, so
//! every executor must be idempotent. The domain guarantees this: its
//! ledgers are reference-keyed upserts and its state machines no-op on
//! already-terminal states.

pub mod retry;
pub mod runner;
pub mod scheduler;

pub use runner::{JobError, JobExecutor, JobRunner, RunReport};
pub use scheduler::InMemoryScheduler;

//! # Spotswap Core
//!
//! Core traits and types for the spotswap marketplace engine.
//!
//! This crate provides the domain-agnostic kernel that the marketplace
//! aggregates are built on:
//!
//! - **Events**: a serializable [`event::Event`] trait with a stable,
//!   versioned type identifier per variant
//! - **Event buffering**: a per-aggregate [`buffer::EventBuffer`] drained
//!   exactly once per successful persistence commit
//! - **Dispatch**: a static, ordered [`dispatch::Dispatcher`] table of
//!   in-process handlers keyed by event type
//! - **Durable scheduling**: the [`scheduler::DurableScheduler`] port and
//!   the [`outbox::Outbox`] facade that turn integration events into
//!   at-least-once jobs recorded in the same transaction as the business
//!   write
//! - **Environment**: injected dependencies such as [`environment::Clock`]
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: nothing in this crate blocks or
//!   performs I/O; all side effects are descriptions handed to the runtime
//! - Explicit ports: external collaborators are traits injected by
//!   constructors, never process-wide statics
//! - At-least-once side effects: every job body must be safe to re-run,
//!   which is why the domain ledgers above this crate are idempotent

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::SmallVec;

pub mod buffer;
pub mod dispatch;
pub mod environment;
pub mod event;
pub mod outbox;
pub mod scheduler;

pub use buffer::{Aggregate, EventBuffer};
pub use dispatch::Dispatcher;
pub use environment::{Clock, SystemClock};
pub use event::{Event, EventError, SerializedEvent};
pub use outbox::Outbox;
pub use scheduler::{DurableScheduler, JobKey, JobTrigger, ScheduledJob, SchedulerError};

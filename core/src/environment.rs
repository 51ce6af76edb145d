//! Injected dependency traits.
//!
//! External collaborators are abstracted behind traits and passed in via
//! constructor injection, never reached through process-wide statics.

use chrono::{DateTime, Utc};

/// Abstracts time for testability.
///
/// Production uses [`SystemClock`]; tests use the fixed clock from
/// `spotswap-testing` so every "in the past" / "frozen window" rule is
/// deterministic.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by [`Utc::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

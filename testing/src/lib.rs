//! # Spotswap Testing
//!
//! Testing utilities and helpers for the spotswap marketplace engine.
//!
//! This crate provides:
//!
//! - [`mocks::FixedClock`]: deterministic time for every "in the past" /
//!   frozen-window rule
//! - [`scenario::AggregateTest`]: a fluent Given-When-Then builder for
//!   exercising aggregate operations and asserting on state, results, and
//!   buffered events
//! - [`assertions`]: helpers for scheduled-job expectations
//! - [`init_tracing`]: opt-in log output while debugging a test
//!
//! ## Example
//!
//! ```ignore
//! use spotswap_testing::{mocks::test_clock, scenario::AggregateTest};
//!
//! AggregateTest::given(spot)
//!     .when(|spot| spot.book(now, user, from, Duration::hours(1)))
//!     .then_ok()
//!     .then_state(|spot| assert_eq!(spot.bookings().len(), 1))
//!     .then_events(|events| assert_eq!(events.len(), 1));
//! ```

pub mod assertions;
pub mod mocks;
pub mod scenario;

pub use mocks::{FixedClock, test_clock};
pub use scenario::AggregateTest;

/// Initialize a compact tracing subscriber for test debugging.
///
/// Safe to call from multiple tests; only the first call installs the
/// subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

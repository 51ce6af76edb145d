//! Mock implementations of environment traits.

use chrono::{DateTime, Utc};
use spotswap_core::environment::Clock;

/// Fixed clock for deterministic tests.
///
/// Always returns the same instant, making every time-window rule
/// reproducible.
///
/// # Example
///
/// ```
/// use spotswap_testing::mocks::FixedClock;
/// use spotswap_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a fixed clock at the given instant.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Default fixed clock for tests (2026-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics only if the hardcoded timestamp fails to parse, which cannot
/// happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

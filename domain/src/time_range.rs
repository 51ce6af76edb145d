//! Half-open time intervals.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open interval `[from, to)` in UTC.
///
/// The constructor enforces `from < to`; empty and inverted ranges do
/// not exist.
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use spotswap_domain::TimeRange;
///
/// let start = Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).single().ok_or("bad date")?;
/// let range = TimeRange::new(start, start + Duration::hours(2)).ok_or("empty range")?;
/// assert_eq!(range.duration(), Duration::hours(2));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, or `None` when `from >= to`.
    #[must_use]
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        (from < to).then_some(Self { from, to })
    }

    /// Inclusive start of the range.
    #[must_use]
    pub const fn from(&self) -> DateTime<Utc> {
        self.from
    }

    /// Exclusive end of the range.
    #[must_use]
    pub const fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Length of the range.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// Whether the two ranges overlap. Touching ranges (one ends exactly
    /// where the other starts) count as overlapping, which is what lets
    /// adjacent availability windows merge into one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Whether `other` lies entirely within this range.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.from <= other.from && other.to <= self.to
    }

    /// Whether the instant lies within `[from, to)`.
    #[must_use]
    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }

    /// The smallest range covering both this range and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.from.format("%Y-%m-%d %H:%M"),
            self.to.format("%Y-%m-%d %H:%M")
        )
    }
}

//! The marketplace currency.
//!
//! One credit buys one hour of parking. Amounts are fractional (a
//! 90-minute window earns 1.5 credits) and may be negative inside the
//! ledger, where a negative transaction represents a charge or a
//! reservation against a deposit.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// A quantity of marketplace credits.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use spotswap_domain::Credits;
///
/// let earned = Credits::for_duration(Duration::minutes(90));
/// assert_eq!(earned, Credits::new(1.5));
/// assert_eq!(earned.to_string(), "1.50");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Credits(f64);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(0.0);

    /// One credit, the price floor of any booking.
    pub const ONE: Self = Self(1.0);

    /// Creates a credits amount.
    #[must_use]
    pub const fn new(amount: f64) -> Self {
        Self(amount)
    }

    /// Credits earned or owed for a span of time, at one credit per hour.
    ///
    /// No floor is applied here; booking cost floors live in
    /// [`Booking::cost`](crate::Booking::cost).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_duration(duration: Duration) -> Self {
        Self(duration.num_seconds() as f64 / SECONDS_PER_HOUR)
    }

    /// The raw amount.
    #[must_use]
    pub const fn amount(self) -> f64 {
        self.0
    }

    /// Whether this amount is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Whether this amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    /// The larger of two amounts.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// This amount clamped to be no lower than zero.
    #[must_use]
    pub fn clamped_to_zero(self) -> Self {
        self.max(Self::ZERO)
    }
}

impl Add for Credits {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Credits {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Credits {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Credits {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn one_credit_per_hour() {
        assert_eq!(Credits::for_duration(Duration::hours(3)), Credits::new(3.0));
        assert_eq!(
            Credits::for_duration(Duration::minutes(30)),
            Credits::new(0.5)
        );
    }

    #[test]
    fn arithmetic() {
        let total: Credits = [Credits::new(1.0), Credits::new(2.5)].into_iter().sum();
        assert_eq!(total, Credits::new(3.5));
        assert_eq!(total - Credits::new(4.0), Credits::new(-0.5));
        assert_eq!(-Credits::new(2.0), Credits::new(-2.0));
    }

    #[test]
    fn clamping() {
        assert_eq!(Credits::new(-1.5).clamped_to_zero(), Credits::ZERO);
        assert_eq!(Credits::new(1.5).clamped_to_zero(), Credits::new(1.5));
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Credits::new(1.0).to_string(), "1.00");
        assert_eq!(Credits::new(-0.25).to_string(), "-0.25");
    }
}

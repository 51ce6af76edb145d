//! Bookings and ratings.

use crate::credits::Credits;
use crate::error::DomainError;
use crate::time_range::TimeRange;
use crate::types::{BookingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a booking user rated their stay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    /// The spot was as advertised.
    Good,
    /// Nothing to report either way.
    Neutral,
    /// The spot was blocked, missing, or misrepresented.
    Bad,
}

impl Rating {
    /// Reputation delta the spot owner receives for this rating.
    #[must_use]
    pub const fn reputation_delta(self) -> i64 {
        match self {
            Self::Good => 1,
            Self::Neutral => 0,
            Self::Bad => -1,
        }
    }
}

/// A reservation of a spot for a time range.
///
/// Bookings never overlap other users' bookings on the same spot. A
/// booking by the same user that overlaps an existing one absorbs it:
/// the existing booking is widened via [`absorb`](Self::absorb) rather
/// than a second one created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    id: BookingId,
    user_id: UserId,
    range: TimeRange,
    rating: Option<Rating>,
    completed: bool,
}

impl Booking {
    /// Creates a booking for a validated range.
    #[must_use]
    pub fn new(user_id: UserId, range: TimeRange) -> Self {
        Self {
            id: BookingId::new(),
            user_id,
            range,
            rating: None,
            completed: false,
        }
    }

    /// The booking id.
    #[must_use]
    pub const fn id(&self) -> BookingId {
        self.id
    }

    /// The user who booked.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The booked range.
    #[must_use]
    pub const fn range(&self) -> &TimeRange {
        &self.range
    }

    /// The rating left by the booking user, if any.
    #[must_use]
    pub const fn rating(&self) -> Option<Rating> {
        self.rating
    }

    /// Whether the completion event for this booking has been emitted.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Full price of this booking: one credit per hour, floored at one
    /// credit so very short stays still cost something.
    #[must_use]
    pub fn cost(&self) -> Credits {
        Credits::for_duration(self.range.duration()).max(Credits::ONE)
    }

    /// Widens this booking to also cover an absorbed overlapping booking
    /// by the same user.
    pub fn absorb(&mut self, other: &Self) {
        self.range = self.range.union(&other.range);
    }

    /// Whether the spot owner may still cancel this booking. Owners lose
    /// that right inside the frozen window before the booking starts.
    #[must_use]
    pub fn cancellable_by_owner(&self, now: DateTime<Utc>) -> bool {
        self.range.from() - now >= crate::frozen_for()
    }

    /// Records the rating for a finished booking.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRating`] when the booking has not
    /// ended yet or was already rated.
    pub fn rate(&mut self, now: DateTime<Utc>, rating: Rating) -> Result<(), DomainError> {
        if now < self.range.to() {
            return Err(DomainError::InvalidRating(
                "booking can only be rated after it ends".into(),
            ));
        }
        if self.rating.is_some() {
            return Err(DomainError::InvalidRating("booking already rated".into()));
        }
        self.rating = Some(rating);
        Ok(())
    }

    /// Marks the completion event as emitted. Returns `false` when it
    /// already was, so completion stays idempotent under job retries.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    fn booking(from: u32, to: u32) -> Booking {
        Booking::new(UserId::new(), TimeRange::new(at(from), at(to)).unwrap())
    }

    #[test]
    fn cost_is_floored_at_one_credit() {
        let short = Booking::new(
            UserId::new(),
            TimeRange::new(at(8), at(8) + Duration::minutes(20)).unwrap(),
        );
        assert_eq!(short.cost(), Credits::ONE);
        assert_eq!(booking(8, 11).cost(), Credits::new(3.0));
    }

    #[test]
    fn absorb_widens_the_range() {
        let mut b = booking(9, 11);
        b.absorb(&booking(10, 13));
        assert_eq!(*b.range(), TimeRange::new(at(9), at(13)).unwrap());
    }

    #[test]
    fn owner_cancellation_respects_the_frozen_window() {
        let b = booking(10, 12);
        assert!(b.cancellable_by_owner(at(8)));
        // Exactly one hour out is still allowed.
        assert!(b.cancellable_by_owner(at(9)));
        assert!(!b.cancellable_by_owner(at(9) + Duration::minutes(1)));
    }

    #[test]
    fn rating_requires_a_finished_booking_and_happens_once() {
        let mut b = booking(8, 10);
        assert_eq!(
            b.rate(at(9), Rating::Good).unwrap_err().code(),
            "invalid_rating"
        );
        b.rate(at(10), Rating::Good).unwrap();
        assert_eq!(b.rating(), Some(Rating::Good));
        assert!(b.rate(at(11), Rating::Bad).is_err());
    }

    #[test]
    fn completion_is_recorded_once() {
        let mut b = booking(8, 10);
        assert!(b.mark_completed());
        assert!(!b.mark_completed());
    }
}

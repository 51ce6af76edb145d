//! The parking spot aggregate: an availability ledger and a booking
//! ledger that evolve together under the marketplace rules.

use crate::availability::Availability;
use crate::booking::{Booking, Rating};
use crate::credits::Credits;
use crate::error::DomainError;
use crate::events::SpotEvent;
use crate::time_range::TimeRange;
use crate::types::{AvailabilityId, BookingId, ParkingId, SpotId, SpotName, UserId};
use chrono::{DateTime, Duration, Utc};
use smallvec::SmallVec;
use spotswap_core::{Aggregate, EventBuffer};

/// Result of publishing an availability window.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishOutcome {
    /// Id of the resulting (possibly merged) window.
    pub availability_id: AvailabilityId,
    /// Credits newly earned: the merged window's price minus what the
    /// replaced windows had already earned.
    pub earned_credits: Credits,
    /// Whether the new window merged with existing ones.
    pub had_overlap: bool,
}

/// Result of placing a booking.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingOutcome {
    /// Id of the resulting (possibly widened) booking.
    pub booking_id: BookingId,
    /// Amount charged, net of absorbed bookings and clamped at zero.
    pub cost: Credits,
}

/// A parking spot owned by one user inside a parking community.
#[derive(Clone, Debug)]
pub struct Spot {
    id: SpotId,
    owner_id: UserId,
    parking_id: ParkingId,
    name: SpotName,
    availabilities: Vec<Availability>,
    bookings: Vec<Booking>,
    disabled: bool,
    events: EventBuffer<SpotEvent>,
}

impl Spot {
    /// Creates a spot with no availabilities and no bookings.
    #[must_use]
    pub fn new(owner_id: UserId, name: SpotName, parking_id: ParkingId) -> Self {
        Self {
            id: SpotId::new(),
            owner_id,
            parking_id,
            name,
            availabilities: Vec::new(),
            bookings: Vec::new(),
            disabled: false,
            events: EventBuffer::new(),
        }
    }

    /// The spot id.
    #[must_use]
    pub const fn id(&self) -> SpotId {
        self.id
    }

    /// The owning user.
    #[must_use]
    pub const fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// The parking community this spot belongs to.
    #[must_use]
    pub const fn parking_id(&self) -> ParkingId {
        self.parking_id
    }

    /// The spot's display name.
    #[must_use]
    pub const fn name(&self) -> &SpotName {
        &self.name
    }

    /// Whether the spot is disabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Current availability windows, in no particular order.
    #[must_use]
    pub fn availabilities(&self) -> &[Availability] {
        &self.availabilities
    }

    /// Current bookings, in no particular order.
    #[must_use]
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Publishes an availability window, merging it with every existing
    /// window it overlaps or touches.
    ///
    /// The merged window gets a fresh id; the replaced ids ride along on
    /// the recorded event so downstream ledgers can re-key the pending
    /// credits. Earned credits are the merged price minus the prices of
    /// the replaced windows, so publishing overlapping windows never
    /// pays twice.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Disabled`] when the spot is disabled.
    /// - [`DomainError::InvalidAvailabilities`] when the window is in
    ///   the past or inverted.
    pub fn make_available(
        &mut self,
        now: DateTime<Utc>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PublishOutcome, DomainError> {
        if self.disabled {
            return Err(DomainError::Disabled);
        }
        let new = Availability::new(now, from, to)?;
        let new_range = *new.range();

        // Fold the new window into everything it touches before mutating
        // anything, so a failed merge leaves the spot unchanged.
        let mut merged = new;
        let mut replaced = Vec::new();
        let mut already_earned = Credits::ZERO;
        for existing in self
            .availabilities
            .iter()
            .filter(|a| a.range().overlaps(&new_range))
        {
            merged = merged.merge(existing)?;
            replaced.push(existing.id());
            already_earned += existing.price();
        }

        let outcome = PublishOutcome {
            availability_id: merged.id(),
            earned_credits: merged.price() - already_earned,
            had_overlap: !replaced.is_empty(),
        };

        self.events.record(SpotEvent::SpotBecameAvailable {
            spot_id: self.id,
            owner_id: self.owner_id,
            availability_id: merged.id(),
            price: merged.price(),
            available_until: merged.range().to(),
            replaced: replaced.clone(),
        });

        self.availabilities.retain(|a| !replaced.contains(&a.id()));
        self.availabilities.push(merged);
        Ok(outcome)
    }

    /// Withdraws an availability window along with every booking it
    /// contains, atomically.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidCancelling`] when the caller is not the
    ///   owner, or any contained booking is inside its frozen window.
    /// - [`DomainError::AvailabilityNotFound`] when no such window exists.
    pub fn cancel_availability(
        &mut self,
        now: DateTime<Utc>,
        user_id: UserId,
        availability_id: AvailabilityId,
    ) -> Result<(), DomainError> {
        if user_id != self.owner_id {
            return Err(DomainError::InvalidCancelling(
                "only the owner can cancel an availability".into(),
            ));
        }
        let availability = self
            .availabilities
            .iter()
            .find(|a| a.id() == availability_id)
            .ok_or(DomainError::AvailabilityNotFound)?;
        let range = *availability.range();

        let contained: Vec<BookingId> = self
            .bookings
            .iter()
            .filter(|b| range.contains(b.range()))
            .map(Booking::id)
            .collect();
        let frozen = self.bookings.iter().any(|b| {
            range.contains(b.range()) && !b.cancellable_by_owner(now)
        });
        if frozen {
            return Err(DomainError::InvalidCancelling(
                "a contained booking starts too soon to cancel".into(),
            ));
        }

        for booking_id in contained {
            // Contained bookings were all checked above, so this cannot
            // fail and the cascade stays atomic.
            self.remove_booking_unchecked(booking_id, self.owner_id);
        }
        self.availabilities.retain(|a| a.id() != availability_id);
        self.events.record(SpotEvent::AvailabilityCancelled {
            spot_id: self.id,
            availability_id,
            owner_id: self.owner_id,
        });
        Ok(())
    }

    /// Books the spot for `duration` starting at `from`.
    ///
    /// The request must fall entirely inside one availability window and
    /// must not touch another user's booking. Overlapping bookings by
    /// the same user are absorbed: the existing booking widens to cover
    /// the union and only the added time is charged, clamped at zero.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidBooking`] for own-spot, past, or
    ///   non-positive-duration requests.
    /// - [`DomainError::Disabled`] when the spot is disabled.
    /// - [`DomainError::NoAvailability`] when no window covers the range
    ///   or another user's booking overlaps it.
    pub fn book(
        &mut self,
        now: DateTime<Utc>,
        user_id: UserId,
        from: DateTime<Utc>,
        duration: Duration,
    ) -> Result<BookingOutcome, DomainError> {
        if user_id == self.owner_id {
            return Err(DomainError::InvalidBooking(
                "cannot book your own spot".into(),
            ));
        }
        if from < now {
            return Err(DomainError::InvalidBooking(
                "booking cannot start in the past".into(),
            ));
        }
        if duration <= Duration::zero() {
            return Err(DomainError::InvalidBooking(
                "booking duration must be positive".into(),
            ));
        }
        if self.disabled {
            return Err(DomainError::Disabled);
        }
        let range = TimeRange::new(from, from + duration)
            .ok_or_else(|| DomainError::InvalidBooking("booking duration must be positive".into()))?;

        if !self
            .availabilities
            .iter()
            .any(|a| a.range().contains(&range))
        {
            return Err(DomainError::NoAvailability);
        }
        if self
            .bookings
            .iter()
            .any(|b| b.user_id() != user_id && b.range().overlaps(&range))
        {
            return Err(DomainError::NoAvailability);
        }

        let (absorbed, kept): (Vec<_>, Vec<_>) = self
            .bookings
            .drain(..)
            .partition(|b| b.user_id() == user_id && b.range().overlaps(&range));
        self.bookings = kept;

        let mut booking = Booking::new(user_id, range);
        let absorbed_cost: Credits = absorbed.iter().map(Booking::cost).sum();
        for old in &absorbed {
            booking.absorb(old);
        }
        let cost = (booking.cost() - absorbed_cost).clamped_to_zero();

        let outcome = BookingOutcome {
            booking_id: booking.id(),
            cost,
        };
        // The event carries the full cost and the absorbed ids so the
        // wallet can re-key the absorbed charges under the new booking:
        // one reference covers the whole merged range, and cancelling
        // the merged booking refunds everything.
        self.events.record(SpotEvent::SpotBooked {
            spot_id: self.id,
            booking_id: booking.id(),
            owner_id: self.owner_id,
            user_id,
            cost: booking.cost(),
            booked_until: booking.range().to(),
            absorbed: absorbed.iter().map(Booking::id).collect(),
        });
        self.bookings.push(booking);
        Ok(outcome)
    }

    /// Cancels a booking.
    ///
    /// The booking user may cancel any time before the booking ends. The
    /// spot owner may cancel only while the booking start is at least
    /// the frozen window away.
    ///
    /// # Errors
    ///
    /// - [`DomainError::BookingNotFound`] when no such booking exists.
    /// - [`DomainError::InvalidCancelling`] for anyone else, for owners
    ///   inside the frozen window, and for bookings already ended.
    pub fn cancel_booking(
        &mut self,
        now: DateTime<Utc>,
        user_id: UserId,
        booking_id: BookingId,
    ) -> Result<(), DomainError> {
        let booking = self
            .bookings
            .iter()
            .find(|b| b.id() == booking_id)
            .ok_or(DomainError::BookingNotFound)?;

        if user_id == booking.user_id() {
            if now >= booking.range().to() {
                return Err(DomainError::InvalidCancelling(
                    "booking has already ended".into(),
                ));
            }
        } else if user_id == self.owner_id {
            if !booking.cancellable_by_owner(now) {
                return Err(DomainError::InvalidCancelling(
                    "booking starts too soon for the owner to cancel".into(),
                ));
            }
        } else {
            return Err(DomainError::InvalidCancelling(
                "only the booking user or the spot owner can cancel".into(),
            ));
        }

        self.remove_booking_unchecked(booking_id, user_id);
        Ok(())
    }

    fn remove_booking_unchecked(&mut self, booking_id: BookingId, cancelled_by: UserId) {
        if let Some(index) = self.bookings.iter().position(|b| b.id() == booking_id) {
            let booking = self.bookings.remove(index);
            self.events.record(SpotEvent::BookingCancelled {
                spot_id: self.id,
                booking_id,
                owner_id: self.owner_id,
                user_id: booking.user_id(),
                cancelled_by,
            });
        }
    }

    /// Rates a finished booking.
    ///
    /// # Errors
    ///
    /// - [`DomainError::BookingNotFound`] when no such booking exists.
    /// - [`DomainError::InvalidRating`] when the caller is not the
    ///   booking user, the booking has not ended, or it was already
    ///   rated.
    pub fn rate_booking(
        &mut self,
        now: DateTime<Utc>,
        user_id: UserId,
        booking_id: BookingId,
        rating: Rating,
    ) -> Result<(), DomainError> {
        let booking = self
            .bookings
            .iter_mut()
            .find(|b| b.id() == booking_id)
            .ok_or(DomainError::BookingNotFound)?;
        if booking.user_id() != user_id {
            return Err(DomainError::InvalidRating(
                "only the booking user can rate".into(),
            ));
        }
        booking.rate(now, rating)?;
        self.events.record(SpotEvent::BookingRated {
            spot_id: self.id,
            booking_id,
            owner_id: self.owner_id,
            rating,
        });
        Ok(())
    }

    /// Records that a booking ran to its end. Idempotent: a booking
    /// completes at most once, and completing an unknown booking id is a
    /// no-op, so the scheduled completion job can safely be re-run.
    pub fn mark_booking_complete(&mut self, booking_id: BookingId) {
        let Some(booking) = self.bookings.iter_mut().find(|b| b.id() == booking_id) else {
            return;
        };
        if !booking.mark_completed() {
            return;
        }
        let user_id = booking.user_id();
        self.events.record(SpotEvent::BookingCompleted {
            spot_id: self.id,
            booking_id,
            owner_id: self.owner_id,
            user_id,
        });
    }

    /// Renames the spot.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidEditing`] when the caller is not
    /// the owner.
    pub fn rename(&mut self, user_id: UserId, name: SpotName) -> Result<(), DomainError> {
        if user_id != self.owner_id {
            return Err(DomainError::InvalidEditing(
                "only the owner can rename a spot".into(),
            ));
        }
        self.name = name;
        Ok(())
    }

    /// Disables the spot: no new availabilities or bookings until
    /// re-enabled. Existing bookings run their course.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidEditing`] when the caller is not
    /// the owner.
    pub fn disable(&mut self, user_id: UserId) -> Result<(), DomainError> {
        if user_id != self.owner_id {
            return Err(DomainError::InvalidEditing(
                "only the owner can disable a spot".into(),
            ));
        }
        self.disabled = true;
        Ok(())
    }

    /// Re-enables a disabled spot.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidEditing`] when the caller is not
    /// the owner.
    pub fn enable(&mut self, user_id: UserId) -> Result<(), DomainError> {
        if user_id != self.owner_id {
            return Err(DomainError::InvalidEditing(
                "only the owner can enable a spot".into(),
            ));
        }
        self.disabled = false;
        Ok(())
    }

    /// Checks that the spot can be deleted by `user_id` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDeletion`] when the caller is not
    /// the owner or any booking is still ongoing or in the future.
    pub fn ensure_deletable(&self, now: DateTime<Utc>, user_id: UserId) -> Result<(), DomainError> {
        if user_id != self.owner_id {
            return Err(DomainError::InvalidDeletion(
                "only the owner can delete a spot".into(),
            ));
        }
        if self.bookings.iter().any(|b| b.range().to() > now) {
            return Err(DomainError::InvalidDeletion(
                "spot still has ongoing or future bookings".into(),
            ));
        }
        Ok(())
    }

    /// The still-bookable slices of one availability window.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AvailabilityNotFound`] when no such window
    /// exists.
    pub fn free_slices(
        &self,
        availability_id: AvailabilityId,
    ) -> Result<SmallVec<[TimeRange; 4]>, DomainError> {
        let availability = self
            .availabilities
            .iter()
            .find(|a| a.id() == availability_id)
            .ok_or(DomainError::AvailabilityNotFound)?;
        let mut inside: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| availability.range().contains(b.range()))
            .cloned()
            .collect();
        inside.sort_by_key(|b| b.range().from());
        Ok(availability.free_slices(&inside))
    }
}

impl Aggregate for Spot {
    type Event = SpotEvent;

    fn take_uncommitted(&mut self) -> Vec<SpotEvent> {
        self.events.take_uncommitted()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spotswap_core::environment::Clock;
    use spotswap_testing::mocks::test_clock;
    use spotswap_testing::scenario::AggregateTest;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, day, hour, 0, 0).unwrap()
    }

    fn spot(owner: UserId) -> Spot {
        Spot::new(owner, SpotName::new("A1").unwrap(), ParkingId::new())
    }

    fn available_spot(owner: UserId, from: DateTime<Utc>, to: DateTime<Utc>) -> Spot {
        let mut s = spot(owner);
        s.make_available(test_clock().now(), from, to).unwrap();
        s.take_uncommitted();
        s
    }

    #[test]
    fn publishing_a_fresh_window_earns_its_full_price() {
        let owner = UserId::new();
        AggregateTest::given(spot(owner))
            .when(|s| s.make_available(test_clock().now(), at(1, 8), at(1, 12)))
            .then_ok()
            .then_value(|outcome| {
                assert_eq!(outcome.earned_credits, Credits::new(4.0));
                assert!(!outcome.had_overlap);
            })
            .then_events(|events| {
                assert_eq!(events.len(), 1);
                let SpotEvent::SpotBecameAvailable { price, replaced, .. } = &events[0] else {
                    panic!("expected SpotBecameAvailable, got {events:?}");
                };
                assert_eq!(*price, Credits::new(4.0));
                assert!(replaced.is_empty());
            });
    }

    #[test]
    fn overlapping_windows_merge_and_only_added_time_is_earned() {
        let owner = UserId::new();
        let mut s = spot(owner);
        let now = test_clock().now();
        let first = s.make_available(now, at(1, 8), at(1, 12)).unwrap();
        s.take_uncommitted();

        let second = s.make_available(now, at(1, 10), at(1, 14)).unwrap();
        assert!(second.had_overlap);
        assert_eq!(second.earned_credits, Credits::new(2.0));
        assert_eq!(s.availabilities().len(), 1);
        assert_eq!(s.availabilities()[0].price(), Credits::new(6.0));

        let events = s.take_uncommitted();
        let SpotEvent::SpotBecameAvailable { replaced, availability_id, .. } = &events[0] else {
            panic!("expected SpotBecameAvailable, got {events:?}");
        };
        assert_eq!(replaced, &vec![first.availability_id]);
        assert_eq!(*availability_id, second.availability_id);
        assert_ne!(second.availability_id, first.availability_id);
    }

    #[test]
    fn touching_windows_merge_too() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 10));
        let outcome = s
            .make_available(test_clock().now(), at(1, 10), at(1, 12))
            .unwrap();
        assert!(outcome.had_overlap);
        assert_eq!(outcome.earned_credits, Credits::new(2.0));
        assert_eq!(s.availabilities().len(), 1);
    }

    #[test]
    fn disabled_spot_rejects_publishing_and_booking() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        s.disable(owner).unwrap();
        assert_eq!(
            s.make_available(test_clock().now(), at(2, 8), at(2, 12))
                .unwrap_err(),
            DomainError::Disabled
        );
        assert_eq!(
            s.book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(1))
                .unwrap_err(),
            DomainError::Disabled
        );
        s.enable(owner).unwrap();
        assert!(s
            .book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(1))
            .is_ok());
    }

    #[test]
    fn booking_requires_a_covering_window() {
        let owner = UserId::new();
        let user = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        // Straddles the end of the window.
        assert_eq!(
            s.book(test_clock().now(), user, at(1, 11), Duration::hours(2))
                .unwrap_err(),
            DomainError::NoAvailability
        );
        // Entirely outside.
        assert_eq!(
            s.book(test_clock().now(), user, at(2, 8), Duration::hours(1))
                .unwrap_err(),
            DomainError::NoAvailability
        );
    }

    #[test]
    fn booking_rejects_own_spot_past_start_and_zero_duration() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        assert_eq!(
            s.book(test_clock().now(), owner, at(1, 9), Duration::hours(1))
                .unwrap_err()
                .code(),
            "invalid_booking"
        );
        assert!(s
            .book(at(1, 10), UserId::new(), at(1, 9), Duration::hours(1))
            .is_err());
        assert!(s
            .book(test_clock().now(), UserId::new(), at(1, 9), Duration::zero())
            .is_err());
    }

    #[test]
    fn other_users_bookings_block_the_range() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        s.book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(2))
            .unwrap();
        assert_eq!(
            s.book(test_clock().now(), UserId::new(), at(1, 10), Duration::hours(1))
                .unwrap_err(),
            DomainError::NoAvailability
        );
    }

    #[test]
    fn same_user_overlap_is_absorbed_and_only_added_time_charged() {
        let owner = UserId::new();
        let user = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let first = s
            .book(test_clock().now(), user, at(1, 9), Duration::hours(2))
            .unwrap();
        assert_eq!(first.cost, Credits::new(2.0));
        s.take_uncommitted();

        let second = s
            .book(test_clock().now(), user, at(1, 10), Duration::hours(2))
            .unwrap();
        // Union is 9..12, already paid 2, so one more hour.
        assert_eq!(second.cost, Credits::new(1.0));
        assert_eq!(s.bookings().len(), 1);
        assert_eq!(
            *s.bookings()[0].range(),
            TimeRange::new(at(1, 9), at(1, 12)).unwrap()
        );
        assert_ne!(second.booking_id, first.booking_id);
    }

    #[test]
    fn absorbing_a_booking_never_refunds() {
        let owner = UserId::new();
        let user = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        // 20 minutes costs the one-credit floor.
        s.book(test_clock().now(), user, at(1, 9), Duration::minutes(20))
            .unwrap();
        // Widening to 30 minutes still costs one credit total.
        let outcome = s
            .book(test_clock().now(), user, at(1, 9), Duration::minutes(30))
            .unwrap();
        assert_eq!(outcome.cost, Credits::ZERO);
    }

    #[test]
    fn booking_user_cancels_any_time_before_the_end() {
        let owner = UserId::new();
        let user = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let booked = s
            .book(test_clock().now(), user, at(1, 9), Duration::hours(2))
            .unwrap();
        s.take_uncommitted();

        // Mid-booking is fine for the user.
        s.cancel_booking(at(1, 10), user, booked.booking_id).unwrap();
        let events = s.take_uncommitted();
        assert_eq!(events.len(), 1);
        let SpotEvent::BookingCancelled { cancelled_by, .. } = &events[0] else {
            panic!("expected BookingCancelled, got {events:?}");
        };
        assert_eq!(*cancelled_by, user);
        assert!(s.bookings().is_empty());
    }

    #[test]
    fn owner_cannot_cancel_inside_the_frozen_window() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let booked = s
            .book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(2))
            .unwrap();

        assert_eq!(
            s.cancel_booking(at(1, 8) + Duration::minutes(30), owner, booked.booking_id)
                .unwrap_err()
                .code(),
            "invalid_cancelling"
        );
        // Well before the frozen window the owner may cancel.
        s.cancel_booking(at(1, 7), owner, booked.booking_id).unwrap();
    }

    #[test]
    fn strangers_cannot_cancel() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let booked = s
            .book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(1))
            .unwrap();
        assert!(s
            .cancel_booking(at(1, 7), UserId::new(), booked.booking_id)
            .is_err());
    }

    #[test]
    fn cancelling_an_availability_cascades_to_contained_bookings() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let availability_id = s.availabilities()[0].id();
        s.book(test_clock().now(), UserId::new(), at(1, 8), Duration::hours(1))
            .unwrap();
        s.book(test_clock().now(), UserId::new(), at(1, 10), Duration::hours(1))
            .unwrap();
        s.take_uncommitted();

        s.cancel_availability(at(1, 6), owner, availability_id).unwrap();
        assert!(s.availabilities().is_empty());
        assert!(s.bookings().is_empty());

        let events = s.take_uncommitted();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SpotEvent::BookingCancelled { .. }));
        assert!(matches!(events[1], SpotEvent::BookingCancelled { .. }));
        assert!(matches!(events[2], SpotEvent::AvailabilityCancelled { .. }));
    }

    #[test]
    fn frozen_booking_blocks_the_whole_availability_cancellation() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let availability_id = s.availabilities()[0].id();
        s.book(test_clock().now(), UserId::new(), at(1, 8), Duration::hours(1))
            .unwrap();
        s.book(test_clock().now(), UserId::new(), at(1, 10), Duration::hours(1))
            .unwrap();
        s.take_uncommitted();

        // Half an hour before the first booking: frozen.
        let err = s
            .cancel_availability(at(1, 7) + Duration::minutes(30), owner, availability_id)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_cancelling");
        // Nothing was touched.
        assert_eq!(s.availabilities().len(), 1);
        assert_eq!(s.bookings().len(), 2);
        assert!(s.take_uncommitted().is_empty());
    }

    #[test]
    fn rating_flows_through_the_spot() {
        let owner = UserId::new();
        let user = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let booked = s
            .book(test_clock().now(), user, at(1, 9), Duration::hours(1))
            .unwrap();
        s.take_uncommitted();

        assert_eq!(
            s.rate_booking(at(1, 11), owner, booked.booking_id, Rating::Good)
                .unwrap_err()
                .code(),
            "invalid_rating"
        );
        s.rate_booking(at(1, 11), user, booked.booking_id, Rating::Bad)
            .unwrap();
        let events = s.take_uncommitted();
        assert!(matches!(
            events[0],
            SpotEvent::BookingRated { rating: Rating::Bad, .. }
        ));
    }

    #[test]
    fn completion_is_idempotent() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let booked = s
            .book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(1))
            .unwrap();
        s.take_uncommitted();

        s.mark_booking_complete(booked.booking_id);
        s.mark_booking_complete(booked.booking_id);
        s.mark_booking_complete(BookingId::new());
        assert_eq!(s.take_uncommitted().len(), 1);
    }

    #[test]
    fn deletion_requires_no_live_bookings() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let booked = s
            .book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(1))
            .unwrap();
        assert!(s.ensure_deletable(at(1, 9), owner).is_err());
        assert!(s.ensure_deletable(at(1, 11), UserId::new()).is_err());
        // After the booking ends the owner may delete.
        s.ensure_deletable(at(1, 11), owner).unwrap();
        // Cancelling also clears the way.
        s.cancel_booking(at(1, 7), owner, booked.booking_id).unwrap();
        s.ensure_deletable(at(1, 9), owner).unwrap();
    }

    #[test]
    fn rename_is_owner_only() {
        let owner = UserId::new();
        let mut s = spot(owner);
        assert!(s
            .rename(UserId::new(), SpotName::new("B2").unwrap())
            .is_err());
        s.rename(owner, SpotName::new("B2").unwrap()).unwrap();
        assert_eq!(s.name().as_str(), "B2");
    }

    #[test]
    fn free_slices_reflect_contained_bookings() {
        let owner = UserId::new();
        let mut s = available_spot(owner, at(1, 8), at(1, 12));
        let availability_id = s.availabilities()[0].id();
        s.book(test_clock().now(), UserId::new(), at(1, 9), Duration::hours(1))
            .unwrap();

        let slices = s.free_slices(availability_id).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].from(), at(1, 8));
        assert_eq!(slices[1].to(), at(1, 12));
        assert!(s.free_slices(AvailabilityId::new()).is_err());
    }
}

//! Parking communities and the booking-request state machine.
//!
//! When no published spot fits, a member can ask the whole community for
//! one. A request is open from creation until exactly one terminal
//! transition: accepted by another member, cancelled by the requester,
//! or expired when its start time arrives. Every terminal transition
//! also records a `BookingRequestExpired` event, which is what releases
//! the deposit reservation and the expiration job, so all three paths
//! converge on the same cleanup.

use crate::credits::Credits;
use crate::error::DomainError;
use crate::events::ParkingEvent;
use crate::time_range::TimeRange;
use crate::types::{BookingRequestId, ParkingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spotswap_core::{Aggregate, EventBuffer};

/// Result of opening a booking request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOutcome {
    /// The new request id.
    pub request_id: BookingRequestId,
    /// Deposit reserved from the requester.
    pub cost: Credits,
}

/// An open or accepted ask for a spot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    id: BookingRequestId,
    requester_id: UserId,
    range: TimeRange,
    bonus: Credits,
    accepted_by: Option<UserId>,
}

impl BookingRequest {
    /// The request id.
    #[must_use]
    pub const fn id(&self) -> BookingRequestId {
        self.id
    }

    /// The member asking.
    #[must_use]
    pub const fn requester_id(&self) -> UserId {
        self.requester_id
    }

    /// The wanted range.
    #[must_use]
    pub const fn range(&self) -> &TimeRange {
        &self.range
    }

    /// Extra credits offered on top of the time-based price.
    #[must_use]
    pub const fn bonus(&self) -> Credits {
        self.bonus
    }

    /// Who accepted the request, once someone has.
    #[must_use]
    pub const fn accepted_by(&self) -> Option<UserId> {
        self.accepted_by
    }

    /// Total cost: the booking price for the range (with the one-credit
    /// floor) plus the offered bonus.
    #[must_use]
    pub fn cost(&self) -> Credits {
        Credits::for_duration(self.range.duration()).max(Credits::ONE) + self.bonus
    }
}

/// A community of members sharing parking spots.
#[derive(Clone, Debug)]
pub struct Parking {
    id: ParkingId,
    members: Vec<UserId>,
    requests: Vec<BookingRequest>,
    events: EventBuffer<ParkingEvent>,
}

impl Parking {
    /// Creates a community with an initial member list.
    #[must_use]
    pub fn new(members: Vec<UserId>) -> Self {
        Self {
            id: ParkingId::new(),
            members,
            requests: Vec::new(),
            events: EventBuffer::new(),
        }
    }

    /// The community id.
    #[must_use]
    pub const fn id(&self) -> ParkingId {
        self.id
    }

    /// Current members.
    #[must_use]
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    /// Open and accepted requests.
    #[must_use]
    pub fn requests(&self) -> &[BookingRequest] {
        &self.requests
    }

    /// Adds a member. Joining twice is a no-op.
    pub fn add_member(&mut self, user_id: UserId) {
        if !self.members.contains(&user_id) {
            self.members.push(user_id);
        }
    }

    /// Opens a booking request and reserves its cost as a deposit.
    ///
    /// The recorded event carries a snapshot of the other members to
    /// notify, so later membership changes cannot alter who hears about
    /// this request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidBooking`] when the requester is not
    /// a member, the range is malformed or starts in the past, or the
    /// bonus is negative.
    pub fn request_booking(
        &mut self,
        now: DateTime<Utc>,
        requester_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bonus: Credits,
    ) -> Result<RequestOutcome, DomainError> {
        if !self.members.contains(&requester_id) {
            return Err(DomainError::InvalidBooking(
                "only members can request a booking".into(),
            ));
        }
        if from <= now {
            return Err(DomainError::InvalidBooking(
                "request must start in the future".into(),
            ));
        }
        let range = TimeRange::new(from, to).ok_or_else(|| {
            DomainError::InvalidBooking("request must end after it starts".into())
        })?;
        if bonus.is_negative() {
            return Err(DomainError::InvalidBooking("bonus cannot be negative".into()));
        }

        let request = BookingRequest {
            id: BookingRequestId::new(),
            requester_id,
            range,
            bonus,
            accepted_by: None,
        };
        let outcome = RequestOutcome {
            request_id: request.id,
            cost: request.cost(),
        };
        self.events.record(ParkingEvent::BookingRequested {
            parking_id: self.id,
            request_id: request.id,
            requester_id,
            from: range.from(),
            to: range.to(),
            bonus,
            cost: request.cost(),
            notified: self
                .members
                .iter()
                .copied()
                .filter(|m| *m != requester_id)
                .collect(),
        });
        self.requests.push(request);
        Ok(outcome)
    }

    /// Accepts an open request on behalf of another member.
    ///
    /// Records `BookingRequestExpired` (releasing the deposit
    /// reservation and the expiration job) followed by
    /// `BookingRequestAccepted` (charging the requester and crediting
    /// the acceptor).
    ///
    /// # Errors
    ///
    /// - [`DomainError::BookingNotFound`] when no such request exists.
    /// - [`DomainError::InvalidBooking`] when the acceptor is the
    ///   requester, not a member, or the request is no longer open.
    pub fn accept_booking_request(
        &mut self,
        user_id: UserId,
        request_id: BookingRequestId,
    ) -> Result<(), DomainError> {
        if !self.members.contains(&user_id) {
            return Err(DomainError::InvalidBooking(
                "only members can accept a request".into(),
            ));
        }
        let parking_id = self.id;
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(DomainError::BookingNotFound)?;
        if request.requester_id == user_id {
            return Err(DomainError::InvalidBooking(
                "cannot accept your own request".into(),
            ));
        }
        if request.accepted_by.is_some() {
            return Err(DomainError::InvalidBooking("request already accepted".into()));
        }

        request.accepted_by = Some(user_id);
        let requester_id = request.requester_id;
        let cost = request.cost();
        self.events.record(ParkingEvent::BookingRequestExpired {
            parking_id,
            request_id,
            requester_id,
        });
        self.events.record(ParkingEvent::BookingRequestAccepted {
            parking_id,
            request_id,
            requester_id,
            accepted_by: user_id,
            cost,
        });
        Ok(())
    }

    /// Withdraws an open request. Only the requester can, and only
    /// before the request's start time.
    ///
    /// # Errors
    ///
    /// - [`DomainError::BookingNotFound`] when no such request exists.
    /// - [`DomainError::InvalidCancelling`] when the caller is not the
    ///   requester, the request was accepted, or it already started.
    pub fn cancel_booking_request(
        &mut self,
        now: DateTime<Utc>,
        user_id: UserId,
        request_id: BookingRequestId,
    ) -> Result<(), DomainError> {
        let request = self
            .requests
            .iter()
            .find(|r| r.id == request_id)
            .ok_or(DomainError::BookingNotFound)?;
        if request.requester_id != user_id {
            return Err(DomainError::InvalidCancelling(
                "only the requester can cancel a request".into(),
            ));
        }
        if request.accepted_by.is_some() {
            return Err(DomainError::InvalidCancelling(
                "request was already accepted".into(),
            ));
        }
        if now >= request.range.from() {
            return Err(DomainError::InvalidCancelling(
                "request has already started".into(),
            ));
        }

        let requester_id = request.requester_id;
        self.requests.retain(|r| r.id != request_id);
        self.events.record(ParkingEvent::BookingRequestCancelled {
            parking_id: self.id,
            request_id,
            requester_id,
        });
        self.events.record(ParkingEvent::BookingRequestExpired {
            parking_id: self.id,
            request_id,
            requester_id,
        });
        Ok(())
    }

    /// Expires a request whose start time arrived with nobody accepting.
    /// Idempotent: unknown ids and already-accepted requests are no-ops,
    /// so the scheduled expiration job can safely be re-run.
    pub fn mark_request_expired(&mut self, request_id: BookingRequestId) {
        let Some(request) = self.requests.iter().find(|r| r.id == request_id) else {
            return;
        };
        if request.accepted_by.is_some() {
            return;
        }
        let requester_id = request.requester_id;
        self.requests.retain(|r| r.id != request_id);
        self.events.record(ParkingEvent::BookingRequestExpired {
            parking_id: self.id,
            request_id,
            requester_id,
        });
    }
}

impl Aggregate for Parking {
    type Event = ParkingEvent;

    fn take_uncommitted(&mut self) -> Vec<ParkingEvent> {
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

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    fn community(members: &[UserId]) -> Parking {
        Parking::new(members.to_vec())
    }

    #[test]
    fn request_cost_is_floored_price_plus_bonus() {
        let requester = UserId::new();
        let mut parking = community(&[requester, UserId::new()]);
        let outcome = parking
            .request_booking(
                test_clock().now(),
                requester,
                at(8),
                at(8) + chrono::Duration::minutes(30),
                Credits::new(0.5),
            )
            .unwrap();
        // Half an hour floors to one credit, plus the bonus.
        assert_eq!(outcome.cost, Credits::new(1.5));
    }

    #[test]
    fn request_notifies_every_other_member() {
        let requester = UserId::new();
        let (a, b) = (UserId::new(), UserId::new());
        let mut parking = community(&[requester, a, b]);
        parking
            .request_booking(test_clock().now(), requester, at(8), at(10), Credits::ZERO)
            .unwrap();
        let events = parking.take_uncommitted();
        let ParkingEvent::BookingRequested { notified, .. } = &events[0] else {
            panic!("expected BookingRequested, got {events:?}");
        };
        assert_eq!(notified, &vec![a, b]);
    }

    #[test]
    fn non_members_past_starts_and_negative_bonuses_are_rejected() {
        let member = UserId::new();
        let mut parking = community(&[member]);
        assert!(parking
            .request_booking(test_clock().now(), UserId::new(), at(8), at(10), Credits::ZERO)
            .is_err());
        assert!(parking
            .request_booking(at(9), member, at(8), at(10), Credits::ZERO)
            .is_err());
        assert!(parking
            .request_booking(test_clock().now(), member, at(8), at(10), Credits::new(-1.0))
            .is_err());
        assert!(parking.take_uncommitted().is_empty());
    }

    #[test]
    fn accepting_emits_expired_then_accepted() {
        let requester = UserId::new();
        let acceptor = UserId::new();
        let mut parking = community(&[requester, acceptor]);
        let outcome = parking
            .request_booking(test_clock().now(), requester, at(8), at(10), Credits::ONE)
            .unwrap();
        parking.take_uncommitted();

        parking
            .accept_booking_request(acceptor, outcome.request_id)
            .unwrap();
        let events = parking.take_uncommitted();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ParkingEvent::BookingRequestExpired { .. }));
        let ParkingEvent::BookingRequestAccepted { accepted_by, cost, .. } = &events[1] else {
            panic!("expected BookingRequestAccepted, got {events:?}");
        };
        assert_eq!(*accepted_by, acceptor);
        assert_eq!(*cost, Credits::new(3.0));
        assert_eq!(parking.requests()[0].accepted_by(), Some(acceptor));
    }

    #[test]
    fn acceptance_is_single_shot_and_not_for_the_requester() {
        let requester = UserId::new();
        let acceptor = UserId::new();
        let mut parking = community(&[requester, acceptor, UserId::new()]);
        let outcome = parking
            .request_booking(test_clock().now(), requester, at(8), at(10), Credits::ZERO)
            .unwrap();

        assert!(parking
            .accept_booking_request(requester, outcome.request_id)
            .is_err());
        parking
            .accept_booking_request(acceptor, outcome.request_id)
            .unwrap();
        assert_eq!(
            parking
                .accept_booking_request(acceptor, outcome.request_id)
                .unwrap_err()
                .code(),
            "invalid_booking"
        );
        assert!(parking
            .accept_booking_request(UserId::new(), BookingRequestId::new())
            .is_err());
    }

    #[test]
    fn requester_cancellation_pairs_with_expired() {
        let requester = UserId::new();
        let mut parking = community(&[requester, UserId::new()]);
        let outcome = parking
            .request_booking(test_clock().now(), requester, at(8), at(10), Credits::ZERO)
            .unwrap();
        parking.take_uncommitted();

        assert!(parking
            .cancel_booking_request(at(7), UserId::new(), outcome.request_id)
            .is_err());
        parking
            .cancel_booking_request(at(7), requester, outcome.request_id)
            .unwrap();
        let events = parking.take_uncommitted();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ParkingEvent::BookingRequestCancelled { .. }));
        assert!(matches!(events[1], ParkingEvent::BookingRequestExpired { .. }));
        assert!(parking.requests().is_empty());
    }

    #[test]
    fn cancellation_is_blocked_after_the_start_or_acceptance() {
        let requester = UserId::new();
        let acceptor = UserId::new();
        let mut parking = community(&[requester, acceptor]);
        let outcome = parking
            .request_booking(test_clock().now(), requester, at(8), at(10), Credits::ZERO)
            .unwrap();

        assert!(parking
            .cancel_booking_request(at(8), requester, outcome.request_id)
            .is_err());
        parking
            .accept_booking_request(acceptor, outcome.request_id)
            .unwrap();
        assert!(parking
            .cancel_booking_request(at(7), requester, outcome.request_id)
            .is_err());
    }

    #[test]
    fn expiration_is_idempotent_and_skips_accepted_requests() {
        let requester = UserId::new();
        let acceptor = UserId::new();
        let mut parking = community(&[requester, acceptor]);
        let open = parking
            .request_booking(test_clock().now(), requester, at(8), at(10), Credits::ZERO)
            .unwrap();
        let accepted = parking
            .request_booking(test_clock().now(), requester, at(12), at(14), Credits::ZERO)
            .unwrap();
        parking
            .accept_booking_request(acceptor, accepted.request_id)
            .unwrap();
        parking.take_uncommitted();

        parking.mark_request_expired(open.request_id);
        parking.mark_request_expired(open.request_id);
        parking.mark_request_expired(accepted.request_id);
        let events = parking.take_uncommitted();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ParkingEvent::BookingRequestExpired { .. }));
    }

    #[test]
    fn joining_twice_is_a_no_op() {
        let member = UserId::new();
        let mut parking = community(&[member]);
        parking.add_member(member);
        assert_eq!(parking.members().len(), 1);
    }
}

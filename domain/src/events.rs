//! Domain events recorded by the marketplace aggregates.
//!
//! Events marked `#[integration]` reach beyond their own aggregate: their
//! handlers touch wallets, reputations, or the durable scheduler. The
//! rest settle entirely inside the dispatch pass.

use crate::booking::Rating;
use crate::credits::Credits;
use crate::types::{AvailabilityId, BookingId, BookingRequestId, ParkingId, SpotId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spotswap_macros::DomainEvent;

/// Events recorded by the [`Spot`](crate::Spot) aggregate.
#[derive(DomainEvent, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpotEvent {
    /// A new availability window exists, possibly replacing overlapping
    /// windows it merged with.
    #[integration]
    SpotBecameAvailable {
        /// The spot that became available.
        spot_id: SpotId,
        /// The spot owner, who earns the pending credits.
        owner_id: UserId,
        /// Id of the (possibly merged) availability window.
        availability_id: AvailabilityId,
        /// Full price of the window.
        price: Credits,
        /// When the window closes, and pending credits become confirmable.
        available_until: DateTime<Utc>,
        /// Old availability ids absorbed by the merge, if any.
        replaced: Vec<AvailabilityId>,
    },

    /// An availability window was withdrawn by its owner.
    #[integration]
    AvailabilityCancelled {
        /// The spot the window belonged to.
        spot_id: SpotId,
        /// The withdrawn window.
        availability_id: AvailabilityId,
        /// The spot owner.
        owner_id: UserId,
    },

    /// A booking was placed on the spot.
    #[integration]
    SpotBooked {
        /// The booked spot.
        spot_id: SpotId,
        /// The new booking.
        booking_id: BookingId,
        /// The spot owner.
        owner_id: UserId,
        /// The booking user, who pays the cost.
        user_id: UserId,
        /// Total cost of the booking, absorbed overlaps included.
        cost: Credits,
        /// When the booking ends.
        booked_until: DateTime<Utc>,
        /// Same-user bookings absorbed into this one, if any.
        absorbed: Vec<BookingId>,
    },

    /// A booking was cancelled before it ended.
    #[integration]
    BookingCancelled {
        /// The spot the booking was on.
        spot_id: SpotId,
        /// The cancelled booking.
        booking_id: BookingId,
        /// The spot owner.
        owner_id: UserId,
        /// The user who had booked, and is refunded.
        user_id: UserId,
        /// Who cancelled: the booking user or the spot owner.
        cancelled_by: UserId,
    },

    /// A booking ran to its end.
    #[integration]
    BookingCompleted {
        /// The spot the booking was on.
        spot_id: SpotId,
        /// The finished booking.
        booking_id: BookingId,
        /// The spot owner.
        owner_id: UserId,
        /// The user who booked.
        user_id: UserId,
    },

    /// A finished booking was rated by its user.
    BookingRated {
        /// The spot the booking was on.
        spot_id: SpotId,
        /// The rated booking.
        booking_id: BookingId,
        /// The spot owner, whose reputation moves with the rating.
        owner_id: UserId,
        /// The rating left.
        rating: Rating,
    },
}

/// Events recorded by the [`Parking`](crate::Parking) aggregate.
#[derive(DomainEvent, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParkingEvent {
    /// A member asked the community for a spot.
    #[integration]
    BookingRequested {
        /// The parking community.
        parking_id: ParkingId,
        /// The new request.
        request_id: BookingRequestId,
        /// The member asking.
        requester_id: UserId,
        /// Wanted from.
        from: DateTime<Utc>,
        /// Wanted until. The request expires at `from` if nobody
        /// accepts first.
        to: DateTime<Utc>,
        /// Extra credits offered on top of the time-based price.
        bonus: Credits,
        /// Total deposit reserved from the requester.
        cost: Credits,
        /// Members to notify, snapshot at request time.
        notified: Vec<UserId>,
    },

    /// A member accepted an open request.
    #[integration]
    BookingRequestAccepted {
        /// The parking community.
        parking_id: ParkingId,
        /// The accepted request.
        request_id: BookingRequestId,
        /// The member who asked and now pays.
        requester_id: UserId,
        /// The member who offered their spot and earns the cost.
        accepted_by: UserId,
        /// Amount charged and credited.
        cost: Credits,
    },

    /// The requester withdrew their own open request.
    BookingRequestCancelled {
        /// The parking community.
        parking_id: ParkingId,
        /// The withdrawn request.
        request_id: BookingRequestId,
        /// The member who had asked.
        requester_id: UserId,
    },

    /// A request left the open state. Emitted on every terminal
    /// transition (accept, cancel, or timeout) so the deposit
    /// reservation and the expiration job are released exactly once.
    #[integration]
    BookingRequestExpired {
        /// The parking community.
        parking_id: ParkingId,
        /// The request that is no longer open.
        request_id: BookingRequestId,
        /// The member who had asked.
        requester_id: UserId,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use spotswap_core::Event;

    #[test]
    fn event_types_are_versioned_variant_names() {
        let event = SpotEvent::BookingRated {
            spot_id: SpotId::new(),
            booking_id: BookingId::new(),
            owner_id: UserId::new(),
            rating: Rating::Good,
        };
        assert_eq!(event.event_type(), "BookingRated.v1");
        assert!(!event.is_integration());
    }

    #[test]
    fn integration_events_are_flagged() {
        let event = ParkingEvent::BookingRequestExpired {
            parking_id: ParkingId::new(),
            request_id: BookingRequestId::new(),
            requester_id: UserId::new(),
        };
        assert!(event.is_integration());
    }

    #[test]
    fn events_round_trip_through_bytes() {
        let event = SpotEvent::BookingCompleted {
            spot_id: SpotId::new(),
            booking_id: BookingId::new(),
            owner_id: UserId::new(),
            user_id: UserId::new(),
        };
        let bytes = event.to_bytes().unwrap();
        let decoded = SpotEvent::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, event);
    }
}

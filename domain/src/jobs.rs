//! Durable job commands and their deterministic keys.
//!
//! Everything the marketplace defers (notifications, request
//! expirations, booking completions, credit confirmation) is written to
//! the durable scheduler as a [`JobCommand`] under a key derived from
//! the entity it belongs to. Deterministic keys are what make the
//! outbox idempotent: re-dispatching an event re-schedules the same key,
//! which the scheduler treats as a no-op, and cancelling an entity
//! cancels its whole key group.

use crate::types::{AvailabilityId, BookingId, BookingRequestId, ParkingId, SpotId, UserId};
use serde::{Deserialize, Serialize};
use spotswap_core::JobKey;
use spotswap_macros::DomainEvent;

/// A deferred command executed by the job runner.
#[derive(DomainEvent, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobCommand {
    /// Push a notification to a user.
    Notify {
        /// The recipient.
        user_id: UserId,
        /// Short headline.
        title: String,
        /// Message body.
        body: String,
    },

    /// Expire a booking request whose start time arrived unanswered.
    ExpireBookingRequest {
        /// The community holding the request.
        parking_id: ParkingId,
        /// The request to expire.
        request_id: BookingRequestId,
    },

    /// Mark a booking complete once its end time passes.
    CompleteBooking {
        /// The spot holding the booking.
        spot_id: SpotId,
        /// The booking to complete.
        booking_id: BookingId,
    },

    /// Confirm the pending credits earned by a closed availability.
    ConfirmCredits {
        /// The wallet owner.
        user_id: UserId,
        /// Ledger reference of the pending entry.
        reference: String,
    },
}

/// Key for the completion job of a booking.
#[must_use]
pub fn booking_complete_key(booking_id: BookingId) -> JobKey {
    JobKey::new(booking_group(booking_id), "complete")
}

/// Key for a notification tied to a booking, one per recipient.
#[must_use]
pub fn booking_notify_key(booking_id: BookingId, recipient: UserId) -> JobKey {
    JobKey::new(booking_group(booking_id), format!("notify:{recipient}"))
}

/// Key group holding every job of a booking.
#[must_use]
pub fn booking_group(booking_id: BookingId) -> String {
    format!("booking:{booking_id}")
}

/// Key for the credit-confirmation job of an availability window.
#[must_use]
pub fn availability_confirm_key(availability_id: AvailabilityId) -> JobKey {
    JobKey::new(availability_group(availability_id), "confirm")
}

/// Key group holding every job of an availability window.
#[must_use]
pub fn availability_group(availability_id: AvailabilityId) -> String {
    format!("availability:{availability_id}")
}

/// Key for the expiration job of a booking request.
#[must_use]
pub fn request_expire_key(request_id: BookingRequestId) -> JobKey {
    JobKey::new(request_group(request_id), "expire")
}

/// Key for a notification tied to a booking request, one per recipient.
#[must_use]
pub fn request_notify_key(request_id: BookingRequestId, recipient: UserId) -> JobKey {
    JobKey::new(request_group(request_id), format!("notify:{recipient}"))
}

/// Key group holding every job of a booking request.
#[must_use]
pub fn request_group(request_id: BookingRequestId) -> String {
    format!("request:{request_id}")
}

//! Domain errors.
//!
//! Every rule violation in the marketplace maps to exactly one variant of
//! [`DomainError`], and each variant carries a stable machine-readable
//! [`code`](DomainError::code) so callers can branch without parsing
//! display strings.

use crate::credits::Credits;
use thiserror::Error;

/// Errors raised by domain operations.
///
/// Validation failures never mutate aggregate state and never record
/// events: an operation either succeeds completely or returns one of
/// these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The availability window is malformed (in the past, or ends before
    /// it starts).
    #[error("invalid availability window: {0}")]
    InvalidAvailabilities(String),

    /// The booking parameters are malformed or forbidden (own spot, past
    /// start, non-positive duration).
    #[error("invalid booking: {0}")]
    InvalidBooking(String),

    /// No single availability window fully covers the requested range.
    #[error("no availability covers the requested range")]
    NoAvailability,

    /// The spot is disabled and accepts no new bookings or availabilities.
    #[error("the spot is disabled")]
    Disabled,

    /// The cancellation is forbidden (wrong user, frozen window, or the
    /// booking already ended).
    #[error("invalid cancelling: {0}")]
    InvalidCancelling(String),

    /// No booking (or booking request) with the given id exists.
    #[error("booking not found")]
    BookingNotFound,

    /// No availability with the given id exists on the spot.
    #[error("availability not found")]
    AvailabilityNotFound,

    /// The rating is forbidden (wrong user, booking not finished, or
    /// already rated).
    #[error("invalid rating: {0}")]
    InvalidRating(String),

    /// The credits transfer is malformed (non-positive amount or
    /// self-transfer).
    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    /// The edit is forbidden (wrong user) or the new value is invalid.
    #[error("invalid editing: {0}")]
    InvalidEditing(String),

    /// The spot cannot be deleted while future or ongoing bookings exist.
    #[error("invalid deletion: {0}")]
    InvalidDeletion(String),

    /// The wallet balance does not cover the charge.
    #[error("not enough credits: needed {needed}, available {available}")]
    NotEnoughCredits {
        /// Amount the charge required.
        needed: Credits,
        /// Confirmed balance actually available.
        available: Credits,
    },

    /// A charge was attempted with a negative amount.
    #[error("charge amount cannot be negative")]
    NegativeChargeAmount,

    /// No pending transaction with the given reference exists to confirm.
    #[error("no pending transaction to confirm for reference '{0}'")]
    CannotConfirmPending(String),
}

impl DomainError {
    /// Stable machine-readable code for this error.
    ///
    /// Codes never change once shipped; display messages may.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAvailabilities(_) => "invalid_availabilities",
            Self::InvalidBooking(_) => "invalid_booking",
            Self::NoAvailability => "no_availability",
            Self::Disabled => "disabled",
            Self::InvalidCancelling(_) => "invalid_cancelling",
            Self::BookingNotFound => "booking_not_found",
            Self::AvailabilityNotFound => "availability_not_found",
            Self::InvalidRating(_) => "invalid_rating",
            Self::InvalidTransfer(_) => "invalid_transfer",
            Self::InvalidEditing(_) => "invalid_editing",
            Self::InvalidDeletion(_) => "invalid_deletion",
            Self::NotEnoughCredits { .. } => "not_enough_credits",
            Self::NegativeChargeAmount => "negative_charge_amount",
            Self::CannotConfirmPending(_) => "cannot_confirm_pending",
        }
    }
}

//! Availability windows published by spot owners.

use crate::booking::Booking;
use crate::credits::Credits;
use crate::error::DomainError;
use crate::time_range::TimeRange;
use crate::types::AvailabilityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A window during which a spot can be booked.
///
/// Availabilities on a spot never overlap: publishing a window that
/// touches existing ones merges them into a single new availability
/// (see [`Spot::make_available`](crate::Spot::make_available)).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    id: AvailabilityId,
    range: TimeRange,
}

impl Availability {
    /// Creates a new availability window.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAvailabilities`] when the window
    /// starts in the past or ends before it starts.
    pub fn new(
        now: DateTime<Utc>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if from < now {
            return Err(DomainError::InvalidAvailabilities(
                "availability cannot start in the past".into(),
            ));
        }
        let range = TimeRange::new(from, to).ok_or_else(|| {
            DomainError::InvalidAvailabilities("availability must end after it starts".into())
        })?;
        Ok(Self {
            id: AvailabilityId::new(),
            range,
        })
    }

    /// The window id.
    #[must_use]
    pub const fn id(&self) -> AvailabilityId {
        self.id
    }

    /// The covered range.
    #[must_use]
    pub const fn range(&self) -> &TimeRange {
        &self.range
    }

    /// Merges two overlapping (or touching) windows into a single new
    /// window with a fresh id covering both.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAvailabilities`] when the windows
    /// neither overlap nor touch.
    pub fn merge(&self, other: &Self) -> Result<Self, DomainError> {
        if !self.range.overlaps(&other.range) {
            return Err(DomainError::InvalidAvailabilities(
                "cannot merge disjoint availabilities".into(),
            ));
        }
        Ok(Self {
            id: AvailabilityId::new(),
            range: self.range.union(&other.range),
        })
    }

    /// Credits this window earns its owner: one per hour, fractional,
    /// with no floor.
    #[must_use]
    pub fn price(&self) -> Credits {
        Credits::for_duration(self.range.duration())
    }

    /// The still-bookable slices of this window, given the bookings that
    /// lie inside it sorted by start time.
    ///
    /// Each slice edge that borders a booking is trimmed by the border
    /// margin so a new booking can never touch an existing one. Edges at
    /// the window boundary are left untrimmed, so with no bookings the
    /// full window comes back as a single slice.
    #[must_use]
    pub fn free_slices(&self, bookings: &[Booking]) -> SmallVec<[TimeRange; 4]> {
        let margin = crate::border_margin();
        let mut slices = SmallVec::new();
        let mut cursor = self.range.from();
        let mut after_booking = false;

        for booking in bookings {
            let start = if after_booking { cursor + margin } else { cursor };
            let end = booking.range().from() - margin;
            if let Some(slice) = TimeRange::new(start, end) {
                slices.push(slice);
            }
            cursor = booking.range().to();
            after_booking = true;
        }

        let start = if after_booking { cursor + margin } else { cursor };
        if let Some(slice) = TimeRange::new(start, self.range.to()) {
            slices.push(slice);
        }
        slices
    }
}

//! The marketplace service: the surface an API shell would call.
//!
//! Every operation follows the same commit pattern: run the domain
//! operation through the store's update closure, then dispatch the
//! events the aggregate recorded. Validation failures surface before
//! anything is persisted; handler failures surface after, with every
//! handler written to tolerate re-delivery.

use crate::booking::Rating;
use crate::credits::Credits;
use crate::error::DomainError;
use crate::events::{ParkingEvent, SpotEvent};
use crate::handlers::{self, MarketplaceEnv};
use crate::jobs;
use crate::parking::{Parking, RequestOutcome};
use crate::ports::{ParkingStore, SpotStore, StoreError, UserStore, WalletStore};
use crate::spot::{BookingOutcome, PublishOutcome, Spot};
use crate::time_range::TimeRange;
use crate::types::{
    AvailabilityId, BookingId, BookingRequestId, ParkingId, SpotId, SpotName, UserId,
};
use crate::wallet::Wallet;
use chrono::{DateTime, Duration, Utc};
use smallvec::SmallVec;
use spotswap_core::{Dispatcher, environment::Clock};
use tracing::{info, instrument};

/// The marketplace application service.
pub struct Marketplace {
    env: MarketplaceEnv,
    spot_handlers: Dispatcher<SpotEvent, MarketplaceEnv, StoreError>,
    parking_handlers: Dispatcher<ParkingEvent, MarketplaceEnv, StoreError>,
}

impl Marketplace {
    /// Builds the service over an environment.
    #[must_use]
    pub fn new(env: MarketplaceEnv) -> Self {
        Self {
            env,
            spot_handlers: handlers::spot_handlers(),
            parking_handlers: handlers::parking_handlers(),
        }
    }

    /// The environment this service runs against.
    #[must_use]
    pub const fn env(&self) -> &MarketplaceEnv {
        &self.env
    }

    /// Creates a parking community.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    pub fn create_parking(&self, members: Vec<UserId>) -> Result<ParkingId, StoreError> {
        let parking = Parking::new(members);
        let id = parking.id();
        self.env.parkings.insert(parking)?;
        Ok(id)
    }

    /// Registers a spot inside a community.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    pub fn register_spot(
        &self,
        owner_id: UserId,
        name: SpotName,
        parking_id: ParkingId,
    ) -> Result<SpotId, StoreError> {
        let spot = Spot::new(owner_id, name, parking_id);
        let id = spot.id();
        self.env.spots.insert(spot)?;
        info!(spot = %id, owner = %owner_id, "spot registered");
        Ok(id)
    }

    /// Publishes an availability window on a spot.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    #[instrument(skip(self))]
    pub fn make_available(
        &self,
        spot_id: SpotId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PublishOutcome, StoreError> {
        let now = self.env.clock.now();
        let mut outcome = None;
        let events = self.env.spots.update(spot_id, &mut |spot| {
            outcome = Some(spot.make_available(now, from, to)?);
            Ok(())
        })?;
        self.spot_handlers.dispatch_all(&events, &self.env)?;
        outcome.ok_or_else(|| StoreError::Storage("update ran without an outcome".into()))
    }

    /// Withdraws an availability window and every booking inside it.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    #[instrument(skip(self))]
    pub fn cancel_availability(
        &self,
        spot_id: SpotId,
        user_id: UserId,
        availability_id: AvailabilityId,
    ) -> Result<(), StoreError> {
        let now = self.env.clock.now();
        let events = self.env.spots.update(spot_id, &mut |spot| {
            spot.cancel_availability(now, user_id, availability_id)
        })?;
        self.spot_handlers.dispatch_all(&events, &self.env)
    }

    /// Books a spot.
    ///
    /// Plan limits gate the attempt: bookings further ahead than the
    /// user's plan allows, or beyond its parallel-booking cap on this
    /// spot, are rejected. Funds are probed on a snapshot before the
    /// booking commits so an empty wallet fails cleanly.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation, including
    /// [`DomainError::NotEnoughCredits`], or a [`StoreError`] from the
    /// backend.
    #[instrument(skip(self))]
    pub fn book(
        &self,
        spot_id: SpotId,
        user_id: UserId,
        from: DateTime<Utc>,
        duration: Duration,
    ) -> Result<BookingOutcome, StoreError> {
        let now = self.env.clock.now();
        let limits = self.env.plans.limits_for(user_id);
        if from - now > limits.max_advance {
            return Err(DomainError::InvalidBooking(
                "booking starts further ahead than your plan allows".into(),
            )
            .into());
        }

        // Probe on a snapshot: compute the net cost and check both the
        // parallel-booking cap and the wallet before committing.
        let mut probe = self.env.spots.get(spot_id)?;
        let probed = probe.book(now, user_id, from, duration)?;
        let live = probe
            .bookings()
            .iter()
            .filter(|b| b.user_id() == user_id && b.range().to() > now)
            .count();
        if live > limits.max_parallel_bookings {
            return Err(DomainError::InvalidBooking(
                "your plan does not allow another parallel booking".into(),
            )
            .into());
        }
        let wallet = self.env.wallets.get(user_id)?;
        if wallet.credits() < probed.cost {
            return Err(DomainError::NotEnoughCredits {
                needed: probed.cost,
                available: wallet.credits(),
            }
            .into());
        }

        let mut outcome = None;
        let events = self.env.spots.update(spot_id, &mut |spot| {
            outcome = Some(spot.book(now, user_id, from, duration)?);
            Ok(())
        })?;
        self.spot_handlers.dispatch_all(&events, &self.env)?;
        outcome.ok_or_else(|| StoreError::Storage("update ran without an outcome".into()))
    }

    /// Cancels a booking on behalf of the booking user or the owner.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    #[instrument(skip(self))]
    pub fn cancel_booking(
        &self,
        spot_id: SpotId,
        user_id: UserId,
        booking_id: BookingId,
    ) -> Result<(), StoreError> {
        let now = self.env.clock.now();
        let events = self.env.spots.update(spot_id, &mut |spot| {
            spot.cancel_booking(now, user_id, booking_id)
        })?;
        self.spot_handlers.dispatch_all(&events, &self.env)
    }

    /// Rates a finished booking.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    #[instrument(skip(self))]
    pub fn rate_booking(
        &self,
        spot_id: SpotId,
        user_id: UserId,
        booking_id: BookingId,
        rating: Rating,
    ) -> Result<(), StoreError> {
        let now = self.env.clock.now();
        let events = self.env.spots.update(spot_id, &mut |spot| {
            spot.rate_booking(now, user_id, booking_id, rating)
        })?;
        self.spot_handlers.dispatch_all(&events, &self.env)
    }

    /// Renames a spot.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    pub fn rename_spot(
        &self,
        spot_id: SpotId,
        user_id: UserId,
        name: SpotName,
    ) -> Result<(), StoreError> {
        self.env
            .spots
            .update(spot_id, &mut |spot| spot.rename(user_id, name.clone()))?;
        Ok(())
    }

    /// Disables a spot.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    pub fn disable_spot(&self, spot_id: SpotId, user_id: UserId) -> Result<(), StoreError> {
        self.env.spots.update(spot_id, &mut |spot| spot.disable(user_id))?;
        Ok(())
    }

    /// Re-enables a disabled spot.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    pub fn enable_spot(&self, spot_id: SpotId, user_id: UserId) -> Result<(), StoreError> {
        self.env.spots.update(spot_id, &mut |spot| spot.enable(user_id))?;
        Ok(())
    }

    /// Deletes a spot with no ongoing or future bookings, cleaning up
    /// its pending earnings and every scheduled job tied to it.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDeletion`] (wrapped) when the
    /// caller is not the owner or live bookings remain, or a
    /// [`StoreError`] from the backend.
    #[instrument(skip(self))]
    pub fn delete_spot(&self, spot_id: SpotId, user_id: UserId) -> Result<(), StoreError> {
        let now = self.env.clock.now();
        let spot = self.env.spots.get(spot_id)?;
        spot.ensure_deletable(now, user_id)?;

        let spot = self.env.spots.remove(spot_id)?;
        for availability in spot.availabilities() {
            let reference = availability.id().to_string();
            self.env.wallets.update(spot.owner_id(), &mut |wallet| {
                wallet.cancel_transaction(&reference);
                Ok(())
            })?;
            self.env
                .outbox
                .cancel_group(&jobs::availability_group(availability.id()))?;
        }
        for booking in spot.bookings() {
            self.env
                .outbox
                .cancel_group(&jobs::booking_group(booking.id()))?;
        }
        info!(spot = %spot_id, "spot deleted");
        Ok(())
    }

    /// The still-bookable slices of one availability window.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    pub fn free_slices(
        &self,
        spot_id: SpotId,
        availability_id: AvailabilityId,
    ) -> Result<SmallVec<[TimeRange; 4]>, StoreError> {
        Ok(self.env.spots.get(spot_id)?.free_slices(availability_id)?)
    }

    /// Opens a booking request towards a parking community.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation (the requester's plan
    /// must allow requests and the advance window), or a [`StoreError`]
    /// from the backend.
    #[instrument(skip(self))]
    pub fn request_booking(
        &self,
        parking_id: ParkingId,
        requester_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        bonus: Credits,
    ) -> Result<RequestOutcome, StoreError> {
        let now = self.env.clock.now();
        let limits = self.env.plans.limits_for(requester_id);
        if !limits.can_request {
            return Err(DomainError::InvalidBooking(
                "your plan does not allow booking requests".into(),
            )
            .into());
        }
        if from - now > limits.max_advance {
            return Err(DomainError::InvalidBooking(
                "request starts further ahead than your plan allows".into(),
            )
            .into());
        }

        let mut outcome = None;
        let events = self.env.parkings.update(parking_id, &mut |parking| {
            outcome = Some(parking.request_booking(now, requester_id, from, to, bonus)?);
            Ok(())
        })?;
        self.parking_handlers.dispatch_all(&events, &self.env)?;
        outcome.ok_or_else(|| StoreError::Storage("update ran without an outcome".into()))
    }

    /// Accepts an open booking request on behalf of another member.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation, including
    /// [`DomainError::NotEnoughCredits`] when the requester cannot pay,
    /// or a [`StoreError`] from the backend.
    #[instrument(skip(self))]
    pub fn accept_booking_request(
        &self,
        parking_id: ParkingId,
        user_id: UserId,
        request_id: BookingRequestId,
    ) -> Result<(), StoreError> {
        // Probe on a snapshot: acceptance releases the deposit and then
        // charges the requester, so the requester's wallet must cover
        // the cost before anything commits.
        let mut probe = self.env.parkings.get(parking_id)?;
        probe.accept_booking_request(user_id, request_id)?;
        if let Some(request) = probe.requests().iter().find(|r| r.id() == request_id) {
            let cost = request.cost();
            let wallet = self.env.wallets.get(request.requester_id())?;
            if wallet.credits() < cost {
                return Err(DomainError::NotEnoughCredits {
                    needed: cost,
                    available: wallet.credits(),
                }
                .into());
            }
        }

        let events = self.env.parkings.update(parking_id, &mut |parking| {
            parking.accept_booking_request(user_id, request_id)
        })?;
        self.parking_handlers.dispatch_all(&events, &self.env)
    }

    /// Withdraws an open booking request.
    ///
    /// # Errors
    ///
    /// Returns the domain error of the operation or a [`StoreError`]
    /// from the backend.
    #[instrument(skip(self))]
    pub fn cancel_booking_request(
        &self,
        parking_id: ParkingId,
        user_id: UserId,
        request_id: BookingRequestId,
    ) -> Result<(), StoreError> {
        let now = self.env.clock.now();
        let events = self.env.parkings.update(parking_id, &mut |parking| {
            parking.cancel_booking_request(now, user_id, request_id)
        })?;
        self.parking_handlers.dispatch_all(&events, &self.env)
    }

    /// Transfers confirmed credits between two users.
    ///
    /// `reference` is the caller's idempotency key: repeating a transfer
    /// under the same reference moves the credits once.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransfer`] (wrapped) for non-positive
    ///   amounts or self-transfers.
    /// - [`DomainError::NotEnoughCredits`] (wrapped) when the sender
    ///   cannot cover the amount.
    /// - A [`StoreError`] from the backend.
    #[instrument(skip(self))]
    pub fn transfer_credits(
        &self,
        reference: &str,
        from_user: UserId,
        to_user: UserId,
        amount: Credits,
    ) -> Result<(), StoreError> {
        if amount <= Credits::ZERO {
            return Err(DomainError::InvalidTransfer("amount must be positive".into()).into());
        }
        if from_user == to_user {
            return Err(DomainError::InvalidTransfer("cannot transfer to yourself".into()).into());
        }
        let out_ref = format!("transfer:{reference}:out");
        let in_ref = format!("transfer:{reference}:in");
        self.env
            .wallets
            .update(from_user, &mut |wallet| wallet.charge(&out_ref, amount))?;
        self.env.wallets.update(to_user, &mut |wallet| {
            wallet.credit_confirmed(&in_ref, amount);
            Ok(())
        })?;
        info!(%from_user, %to_user, %amount, "credits transferred");
        Ok(())
    }

    /// Snapshot of a user's wallet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    pub fn wallet(&self, user_id: UserId) -> Result<Wallet, StoreError> {
        self.env.wallets.get(user_id)
    }

    /// A user's current reputation.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    pub fn reputation(&self, user_id: UserId) -> Result<i64, StoreError> {
        Ok(self.env.users.get(user_id)?.reputation())
    }
}

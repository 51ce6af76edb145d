//! Event handler tables and the job executor.
//!
//! Every domain event fans out here. Handlers run synchronously in the
//! dispatch pass right after an aggregate commits: they move credits,
//! adjust reputations, and write deferred work to the durable scheduler
//! through the outbox. All of them are idempotent, because the job
//! runner may re-deliver the commands they schedule.

use crate::events::{ParkingEvent, SpotEvent};
use crate::jobs::{self, JobCommand};
use crate::ports::{NotificationSender, ParkingStore, PlanLookup, SpotStore, StoreError, UserStore, WalletStore};
use crate::types::{BookingId, BookingRequestId, ParkingId, SpotId, UserId};
use crate::{error::DomainError, memory};
use spotswap_core::environment::{Clock, SystemClock};
use spotswap_core::{Dispatcher, Event, Outbox};
use spotswap_runtime::{InMemoryScheduler, JobError, JobExecutor};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything the handlers and the service reach out to.
#[derive(Clone)]
pub struct MarketplaceEnv {
    /// Source of the current time.
    pub clock: Arc<dyn Clock>,
    /// Transactional writer to the durable scheduler.
    pub outbox: Outbox,
    /// Spot persistence.
    pub spots: Arc<dyn SpotStore>,
    /// Parking community persistence.
    pub parkings: Arc<dyn ParkingStore>,
    /// Credits ledger persistence.
    pub wallets: Arc<dyn WalletStore>,
    /// User record persistence.
    pub users: Arc<dyn UserStore>,
    /// Push notification delivery.
    pub notifier: Arc<dyn NotificationSender>,
    /// Subscription plan limits.
    pub plans: Arc<dyn PlanLookup>,
}

impl MarketplaceEnv {
    /// A fully in-memory environment around the given scheduler, with
    /// the system clock and unrestricted plans.
    #[must_use]
    pub fn with_scheduler(scheduler: Arc<InMemoryScheduler>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            outbox: Outbox::new(scheduler),
            spots: Arc::new(memory::InMemorySpots::new()),
            parkings: Arc::new(memory::InMemoryParkings::new()),
            wallets: Arc::new(memory::InMemoryWallets::new()),
            users: Arc::new(memory::InMemoryUsers::new()),
            notifier: Arc::new(memory::RecordingNotifier::new()),
            plans: Arc::new(memory::UniformPlans::unrestricted()),
        }
    }

    /// A fully in-memory environment with its own scheduler.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_scheduler(Arc::new(InMemoryScheduler::new()))
    }
}

/// The handler table for [`SpotEvent`]s.
#[must_use]
pub fn spot_handlers() -> Dispatcher<SpotEvent, MarketplaceEnv, StoreError> {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register("SpotBecameAvailable.v1", on_spot_became_available);
    dispatcher.register("AvailabilityCancelled.v1", on_availability_cancelled);
    dispatcher.register("SpotBooked.v1", on_spot_booked);
    dispatcher.register("BookingCancelled.v1", on_booking_cancelled);
    dispatcher.register("BookingCompleted.v1", on_booking_completed);
    dispatcher.register("BookingRated.v1", on_booking_rated);
    dispatcher
}

/// The handler table for [`ParkingEvent`]s.
#[must_use]
pub fn parking_handlers() -> Dispatcher<ParkingEvent, MarketplaceEnv, StoreError> {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register("BookingRequested.v1", on_booking_requested);
    dispatcher.register("BookingRequestExpired.v1", on_booking_request_expired);
    dispatcher.register("BookingRequestAccepted.v1", on_booking_request_accepted);
    dispatcher
}

fn on_spot_became_available(event: &SpotEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let SpotEvent::SpotBecameAvailable {
        owner_id,
        availability_id,
        price,
        available_until,
        replaced,
        ..
    } = event
    else {
        return Ok(());
    };
    // Re-key the pending earnings: the merged window replaces whatever
    // the absorbed windows had promised.
    env.wallets.update(*owner_id, &mut |wallet| {
        for old in replaced {
            wallet.cancel_transaction(&old.to_string());
        }
        wallet.credit_pending(&availability_id.to_string(), *price);
        Ok(())
    })?;
    for old in replaced {
        env.outbox.cancel_command(&jobs::availability_confirm_key(*old))?;
    }
    env.outbox.schedule_delayed_command(
        jobs::availability_confirm_key(*availability_id),
        &JobCommand::ConfirmCredits {
            user_id: *owner_id,
            reference: availability_id.to_string(),
        },
        *available_until + crate::confirm_grace(),
    )?;
    Ok(())
}

fn on_availability_cancelled(event: &SpotEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let SpotEvent::AvailabilityCancelled {
        availability_id,
        owner_id,
        ..
    } = event
    else {
        return Ok(());
    };
    env.wallets.update(*owner_id, &mut |wallet| {
        wallet.cancel_transaction(&availability_id.to_string());
        Ok(())
    })?;
    env.outbox
        .cancel_group(&jobs::availability_group(*availability_id))?;
    Ok(())
}

fn on_spot_booked(event: &SpotEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let SpotEvent::SpotBooked {
        spot_id,
        booking_id,
        owner_id,
        user_id,
        cost,
        booked_until,
        absorbed,
    } = event
    else {
        return Ok(());
    };
    // Re-key absorbed charges under the merged booking: erasing the old
    // references restores their credits, so the full-cost charge below
    // nets out to the added time only.
    env.wallets.update(*user_id, &mut |wallet| {
        for old in absorbed {
            wallet.cancel_transaction(&old.to_string());
        }
        wallet.charge(&booking_id.to_string(), *cost)
    })?;
    for old in absorbed {
        env.outbox.cancel_group(&jobs::booking_group(*old))?;
    }
    env.outbox.schedule_delayed_command(
        jobs::booking_complete_key(*booking_id),
        &JobCommand::CompleteBooking {
            spot_id: *spot_id,
            booking_id: *booking_id,
        },
        *booked_until,
    )?;
    env.outbox.schedule_side_effect(
        jobs::booking_notify_key(*booking_id, *owner_id),
        &JobCommand::Notify {
            user_id: *owner_id,
            title: "Your spot was booked".into(),
            body: format!("A neighbour booked your spot for {cost} credits."),
        },
    )?;
    Ok(())
}

fn on_booking_cancelled(event: &SpotEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let SpotEvent::BookingCancelled {
        booking_id,
        owner_id,
        user_id,
        cancelled_by,
        ..
    } = event
    else {
        return Ok(());
    };
    // Refund by erasing the charge.
    env.wallets.update(*user_id, &mut |wallet| {
        wallet.cancel_transaction(&booking_id.to_string());
        Ok(())
    })?;
    if cancelled_by == owner_id {
        env.users.adjust_reputation(*owner_id, -1)?;
    }
    env.outbox
        .cancel_command(&jobs::booking_complete_key(*booking_id))?;

    let (recipient, body) = if cancelled_by == user_id {
        (*owner_id, "A booking on your spot was cancelled.")
    } else {
        (*user_id, "The owner cancelled your booking.")
    };
    env.outbox.schedule_side_effect(
        jobs::booking_notify_key(*booking_id, recipient),
        &JobCommand::Notify {
            user_id: recipient,
            title: "Booking cancelled".into(),
            body: body.into(),
        },
    )?;
    Ok(())
}

fn on_booking_completed(event: &SpotEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let SpotEvent::BookingCompleted {
        booking_id,
        user_id,
        ..
    } = event
    else {
        return Ok(());
    };
    env.users.adjust_reputation(*user_id, 1)?;
    env.outbox.schedule_side_effect(
        jobs::booking_notify_key(*booking_id, *user_id),
        &JobCommand::Notify {
            user_id: *user_id,
            title: "How was your stay?".into(),
            body: "Your booking ended. Rate the spot to help your neighbours.".into(),
        },
    )?;
    Ok(())
}

fn on_booking_rated(event: &SpotEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let SpotEvent::BookingRated {
        owner_id, rating, ..
    } = event
    else {
        return Ok(());
    };
    env.users
        .adjust_reputation(*owner_id, rating.reputation_delta())?;
    Ok(())
}

fn on_booking_requested(event: &ParkingEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let ParkingEvent::BookingRequested {
        parking_id,
        request_id,
        requester_id,
        from,
        bonus,
        cost,
        notified,
        ..
    } = event
    else {
        return Ok(());
    };
    // Reserve the deposit as a negative pending entry.
    env.wallets.update(*requester_id, &mut |wallet| {
        wallet.credit_pending(&request_id.to_string(), -*cost);
        Ok(())
    })?;
    env.outbox.schedule_delayed_command(
        jobs::request_expire_key(*request_id),
        &JobCommand::ExpireBookingRequest {
            parking_id: *parking_id,
            request_id: *request_id,
        },
        *from,
    )?;
    let bonus_note = if bonus.is_zero() {
        String::new()
    } else {
        format!(" ({bonus} bonus credits offered)")
    };
    for member in notified {
        env.outbox.schedule_side_effect(
            jobs::request_notify_key(*request_id, *member),
            &JobCommand::Notify {
                user_id: *member,
                title: "A neighbour needs a spot".into(),
                body: format!("Someone asked for a parking spot{bonus_note}."),
            },
        )?;
    }
    Ok(())
}

fn on_booking_request_expired(event: &ParkingEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let ParkingEvent::BookingRequestExpired {
        request_id,
        requester_id,
        ..
    } = event
    else {
        return Ok(());
    };
    // Release the deposit reservation and the expiration job. Runs on
    // every terminal transition, and both steps tolerate re-delivery.
    env.wallets.update(*requester_id, &mut |wallet| {
        wallet.cancel_transaction(&request_id.to_string());
        Ok(())
    })?;
    env.outbox
        .cancel_command(&jobs::request_expire_key(*request_id))?;
    Ok(())
}

fn on_booking_request_accepted(event: &ParkingEvent, env: &MarketplaceEnv) -> Result<(), StoreError> {
    let ParkingEvent::BookingRequestAccepted {
        request_id,
        requester_id,
        accepted_by,
        cost,
        ..
    } = event
    else {
        return Ok(());
    };
    env.wallets
        .update(*requester_id, &mut |wallet| wallet.charge(&request_id.to_string(), *cost))?;
    env.wallets.update(*accepted_by, &mut |wallet| {
        wallet.credit_confirmed(&format!("{request_id}:earn"), *cost);
        Ok(())
    })?;
    env.users.adjust_reputation(*accepted_by, 1)?;
    env.outbox.schedule_side_effect(
        jobs::request_notify_key(*request_id, *requester_id),
        &JobCommand::Notify {
            user_id: *requester_id,
            title: "Request accepted".into(),
            body: format!("A neighbour offered their spot for {cost} credits."),
        },
    )?;
    Ok(())
}

/// Executes the deferred [`JobCommand`]s written by the handlers.
///
/// Idempotent by construction: the aggregates treat completion and
/// expiration of unknown or already-settled entities as no-ops, and the
/// wallet keys every money move by reference.
pub struct MarketplaceExecutor {
    env: MarketplaceEnv,
    spot_handlers: Dispatcher<SpotEvent, MarketplaceEnv, StoreError>,
    parking_handlers: Dispatcher<ParkingEvent, MarketplaceEnv, StoreError>,
}

impl MarketplaceExecutor {
    /// Creates an executor over the shared environment.
    #[must_use]
    pub fn new(env: MarketplaceEnv) -> Self {
        Self {
            env,
            spot_handlers: spot_handlers(),
            parking_handlers: parking_handlers(),
        }
    }

    fn expire_request(
        &self,
        parking_id: ParkingId,
        request_id: BookingRequestId,
    ) -> Result<(), JobError> {
        let events = match self.env.parkings.update(parking_id, &mut |parking| {
            parking.mark_request_expired(request_id);
            Ok(())
        }) {
            Ok(events) => events,
            Err(StoreError::AggregateMissing { .. }) => {
                warn!(%parking_id, %request_id, "parking gone before request expiration");
                return Ok(());
            }
            Err(err) => return Err(JobError::ExecutionFailed(err.to_string())),
        };
        self.parking_handlers
            .dispatch_all(&events, &self.env)
            .map_err(|err| JobError::ExecutionFailed(err.to_string()))
    }

    fn complete_booking(
        &self,
        spot_id: SpotId,
        booking_id: BookingId,
    ) -> Result<(), JobError> {
        let events = match self.env.spots.update(spot_id, &mut |spot| {
            spot.mark_booking_complete(booking_id);
            Ok(())
        }) {
            Ok(events) => events,
            Err(StoreError::AggregateMissing { .. }) => {
                warn!(%spot_id, %booking_id, "spot gone before booking completion");
                return Ok(());
            }
            Err(err) => return Err(JobError::ExecutionFailed(err.to_string())),
        };
        self.spot_handlers
            .dispatch_all(&events, &self.env)
            .map_err(|err| JobError::ExecutionFailed(err.to_string()))
    }

    fn confirm_credits(&self, user_id: UserId, reference: &str) -> Result<(), JobError> {
        let result = self.env.wallets.update(user_id, &mut |wallet| {
            wallet.confirm_pending(reference)
        });
        match result {
            Ok(()) => Ok(()),
            // The pending entry is gone: the availability was cancelled
            // or replaced after this job became due. Nothing to confirm.
            Err(StoreError::Domain(DomainError::CannotConfirmPending(_))) => {
                debug!(%user_id, reference, "pending credits already settled");
                Ok(())
            }
            Err(err) => Err(JobError::ExecutionFailed(err.to_string())),
        }
    }
}

impl JobExecutor for MarketplaceExecutor {
    fn execute(&self, job: &spotswap_core::ScheduledJob) -> Result<(), JobError> {
        let command =
            JobCommand::from_bytes(&job.payload.data).map_err(|err| JobError::BadPayload {
                key: job.key.clone(),
                reason: err.to_string(),
            })?;
        match command {
            JobCommand::Notify {
                user_id,
                title,
                body,
            } => self
                .env
                .notifier
                .push(user_id, &title, &body)
                .map_err(|err| JobError::ExecutionFailed(err.to_string())),
            JobCommand::ExpireBookingRequest {
                parking_id,
                request_id,
            } => self.expire_request(parking_id, request_id),
            JobCommand::CompleteBooking {
                spot_id,
                booking_id,
            } => self.complete_booking(spot_id, booking_id),
            JobCommand::ConfirmCredits { user_id, reference } => {
                self.confirm_credits(user_id, &reference)
            }
        }
    }
}

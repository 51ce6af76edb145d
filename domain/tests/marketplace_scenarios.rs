//! End-to-end marketplace scenarios through the service layer:
//! publishing, booking, cancelling, and transferring, with every wallet
//! and reputation consequence asserted.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use spotswap_core::environment::Clock;
use spotswap_domain::{
    Credits, DomainError, Marketplace, MarketplaceEnv, ParkingId, Rating, SpotId, SpotName,
    SpotStore, StoreError, UserId, WalletStore,
};
use spotswap_runtime::InMemoryScheduler;
use spotswap_testing::mocks::{FixedClock, test_clock};
use std::sync::Arc;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
}

fn marketplace_at(now: DateTime<Utc>) -> Marketplace {
    let mut env = MarketplaceEnv::with_scheduler(Arc::new(InMemoryScheduler::new()));
    env.clock = Arc::new(FixedClock::new(now));
    Marketplace::new(env)
}

fn marketplace() -> Marketplace {
    marketplace_at(test_clock().now())
}

fn fund(marketplace: &Marketplace, user: UserId, amount: f64) {
    marketplace
        .env()
        .wallets
        .update(user, &mut |wallet| {
            wallet.credit_confirmed("seed", Credits::new(amount));
            Ok(())
        })
        .unwrap();
}

fn spot_with_owner(marketplace: &Marketplace) -> (SpotId, UserId, ParkingId) {
    let owner = UserId::new();
    let parking_id = marketplace.create_parking(vec![owner]).unwrap();
    let spot_id = marketplace
        .register_spot(owner, SpotName::new("A1").unwrap(), parking_id)
        .unwrap();
    (spot_id, owner, parking_id)
}

fn domain_err(err: StoreError) -> DomainError {
    match err {
        StoreError::Domain(err) => err,
        other => panic!("expected a domain error, got {other}"),
    }
}

#[test]
fn publishing_earns_pending_credits() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);

    let outcome = marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();
    assert_eq!(outcome.earned_credits, Credits::new(4.0));

    let wallet = marketplace.wallet(owner).unwrap();
    assert_eq!(wallet.pending_credits(), Credits::new(4.0));
    assert_eq!(wallet.credits(), Credits::ZERO);
}

#[test]
fn republishing_an_overlap_keeps_one_pending_entry() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);

    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();
    let merged = marketplace
        .make_available(spot_id, at(2, 10), at(2, 14))
        .unwrap();
    assert!(merged.had_overlap);
    assert_eq!(merged.earned_credits, Credits::new(2.0));

    let wallet = marketplace.wallet(owner).unwrap();
    // One re-keyed entry holding the merged window's full price.
    assert_eq!(wallet.transactions().len(), 1);
    assert_eq!(wallet.pending_credits(), Credits::new(6.0));
}

#[test]
fn booking_charges_the_user_immediately() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 10.0);
    let outcome = marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(2))
        .unwrap();
    assert_eq!(outcome.cost, Credits::new(2.0));
    assert_eq!(marketplace.wallet(user).unwrap().credits(), Credits::new(8.0));
    // The owner's earnings are availability-based, not booking-based.
    assert_eq!(
        marketplace.wallet(owner).unwrap().pending_credits(),
        Credits::new(4.0)
    );
}

#[test]
fn booking_without_funds_is_rejected_before_committing() {
    let marketplace = marketplace();
    let (spot_id, _, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();

    let user = UserId::new();
    let err = domain_err(
        marketplace
            .book(spot_id, user, at(2, 9), Duration::hours(2))
            .unwrap_err(),
    );
    assert_eq!(err.code(), "not_enough_credits");
    // Nothing was persisted.
    let spot = marketplace.env().spots.get(spot_id).unwrap();
    assert!(spot.bookings().is_empty());
}

#[test]
fn user_cancellation_refunds_in_full() {
    let marketplace = marketplace();
    let (spot_id, _, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    let outcome = marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(2))
        .unwrap();
    assert_eq!(marketplace.wallet(user).unwrap().credits(), Credits::new(3.0));

    marketplace
        .cancel_booking(spot_id, user, outcome.booking_id)
        .unwrap();
    assert_eq!(marketplace.wallet(user).unwrap().credits(), Credits::new(5.0));
}

#[test]
fn cancelling_a_merged_booking_refunds_the_absorbed_charges_too() {
    let marketplace = marketplace();
    let (spot_id, _, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 10.0);
    marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(2))
        .unwrap();
    // Extending over the first booking charges only the added hour; the
    // old charge is re-keyed under the merged booking.
    let merged = marketplace
        .book(spot_id, user, at(2, 10), Duration::hours(2))
        .unwrap();
    assert_eq!(merged.cost, Credits::new(1.0));
    let wallet = marketplace.wallet(user).unwrap();
    assert_eq!(wallet.credits(), Credits::new(7.0));
    // The seed plus one charge for the whole merged range.
    assert_eq!(wallet.transactions().len(), 2);

    marketplace
        .cancel_booking(spot_id, user, merged.booking_id)
        .unwrap();
    assert_eq!(
        marketplace.wallet(user).unwrap().credits(),
        Credits::new(10.0)
    );
}

#[test]
fn owner_cancellation_costs_reputation() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    let outcome = marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(1))
        .unwrap();

    marketplace
        .cancel_booking(spot_id, owner, outcome.booking_id)
        .unwrap();
    assert_eq!(marketplace.reputation(owner).unwrap(), -1);
    assert_eq!(marketplace.wallet(user).unwrap().credits(), Credits::new(5.0));
}

#[test]
fn owner_cannot_cancel_a_frozen_booking() {
    // The clock sits 30 minutes before the booking starts.
    let marketplace = marketplace_at(at(2, 8) + Duration::minutes(30));
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 9), at(2, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    let outcome = marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(1))
        .unwrap();

    let err = domain_err(
        marketplace
            .cancel_booking(spot_id, owner, outcome.booking_id)
            .unwrap_err(),
    );
    assert_eq!(err.code(), "invalid_cancelling");
    // The user still can.
    marketplace
        .cancel_booking(spot_id, user, outcome.booking_id)
        .unwrap();
}

#[test]
fn frozen_booking_blocks_availability_withdrawal_entirely() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    // Bookings at 08:00, 10:00, and 00:30 (the last inside the frozen
    // window relative to the 00:00 test clock).
    marketplace
        .make_available(spot_id, at(1, 0), at(1, 12))
        .unwrap();
    let availability_id = marketplace.env().spots.get(spot_id).unwrap().availabilities()[0].id();

    for (user_funds, from) in [
        (5.0, at(1, 8)),
        (5.0, at(1, 10)),
        (5.0, at(1, 0) + Duration::minutes(30)),
    ] {
        let user = UserId::new();
        fund(&marketplace, user, user_funds);
        marketplace
            .book(spot_id, user, from, Duration::hours(1))
            .unwrap();
    }

    let err = domain_err(
        marketplace
            .cancel_availability(spot_id, owner, availability_id)
            .unwrap_err(),
    );
    assert_eq!(err.code(), "invalid_cancelling");

    // Atomicity: all three bookings and the availability survive.
    let spot = marketplace.env().spots.get(spot_id).unwrap();
    assert_eq!(spot.bookings().len(), 3);
    assert_eq!(spot.availabilities().len(), 1);
}

#[test]
fn availability_withdrawal_refunds_everyone_and_drops_the_earnings() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();
    let availability_id = marketplace.env().spots.get(spot_id).unwrap().availabilities()[0].id();

    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(2))
        .unwrap();

    marketplace
        .cancel_availability(spot_id, owner, availability_id)
        .unwrap();
    assert_eq!(marketplace.wallet(user).unwrap().credits(), Credits::new(5.0));
    assert_eq!(marketplace.wallet(owner).unwrap().pending_credits(), Credits::ZERO);
    // Cascade counts as an owner cancellation.
    assert_eq!(marketplace.reputation(owner).unwrap(), -1);
}

#[test]
fn rating_moves_the_owners_reputation() {
    let marketplace = marketplace_at(at(1, 0));
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(1, 8), at(1, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    let outcome = marketplace
        .book(spot_id, user, at(1, 9), Duration::hours(1))
        .unwrap();

    // Rating is blocked until the booking ends.
    let err = domain_err(
        marketplace
            .rate_booking(spot_id, user, outcome.booking_id, Rating::Good)
            .unwrap_err(),
    );
    assert_eq!(err.code(), "invalid_rating");

    let marketplace = Marketplace::new(MarketplaceEnv {
        clock: Arc::new(FixedClock::new(at(1, 11))),
        ..marketplace.env().clone()
    });
    marketplace
        .rate_booking(spot_id, user, outcome.booking_id, Rating::Bad)
        .unwrap();
    assert_eq!(marketplace.reputation(owner).unwrap(), -1);
}

#[test]
fn disabled_spots_reject_new_business_but_keep_old() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();
    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    let outcome = marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(1))
        .unwrap();

    marketplace.disable_spot(spot_id, owner).unwrap();
    assert_eq!(
        domain_err(
            marketplace
                .book(spot_id, UserId::new(), at(2, 10), Duration::hours(1))
                .unwrap_err()
        ),
        DomainError::Disabled
    );
    // The existing booking is untouched and still cancellable.
    marketplace
        .cancel_booking(spot_id, user, outcome.booking_id)
        .unwrap();

    marketplace.enable_spot(spot_id, owner).unwrap();
    fund(&marketplace, user, 5.0);
    marketplace
        .book(spot_id, user, at(2, 10), Duration::hours(1))
        .unwrap();
}

#[test]
fn deleting_a_spot_requires_a_clear_ledger() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(2, 8), at(2, 12))
        .unwrap();
    let user = UserId::new();
    fund(&marketplace, user, 5.0);
    let outcome = marketplace
        .book(spot_id, user, at(2, 9), Duration::hours(1))
        .unwrap();

    let err = domain_err(marketplace.delete_spot(spot_id, owner).unwrap_err());
    assert_eq!(err.code(), "invalid_deletion");
    assert!(marketplace.delete_spot(spot_id, UserId::new()).is_err());

    marketplace
        .cancel_booking(spot_id, user, outcome.booking_id)
        .unwrap();
    marketplace.delete_spot(spot_id, owner).unwrap();
    // The never-realized earnings are gone with the spot.
    assert_eq!(marketplace.wallet(owner).unwrap().pending_credits(), Credits::ZERO);
    assert!(marketplace.env().spots.get(spot_id).is_err());
}

#[test]
fn renaming_validates_the_new_name() {
    let marketplace = marketplace();
    let (spot_id, owner, _) = spot_with_owner(&marketplace);
    assert!(SpotName::new("b!").is_err());
    marketplace
        .rename_spot(spot_id, owner, SpotName::new("B2").unwrap())
        .unwrap();
    assert_eq!(
        marketplace.env().spots.get(spot_id).unwrap().name().as_str(),
        "B2"
    );
}

#[test]
fn transfers_are_validated_and_idempotent() {
    let marketplace = marketplace();
    let (sender, receiver) = (UserId::new(), UserId::new());
    fund(&marketplace, sender, 5.0);

    assert_eq!(
        domain_err(
            marketplace
                .transfer_credits("t1", sender, receiver, Credits::ZERO)
                .unwrap_err()
        )
        .code(),
        "invalid_transfer"
    );
    assert_eq!(
        domain_err(
            marketplace
                .transfer_credits("t1", sender, sender, Credits::new(1.0))
                .unwrap_err()
        )
        .code(),
        "invalid_transfer"
    );
    assert_eq!(
        domain_err(
            marketplace
                .transfer_credits("t1", sender, receiver, Credits::new(9.0))
                .unwrap_err()
        )
        .code(),
        "not_enough_credits"
    );

    marketplace
        .transfer_credits("t1", sender, receiver, Credits::new(2.0))
        .unwrap();
    // Re-running the same transfer reference moves nothing further.
    marketplace
        .transfer_credits("t1", sender, receiver, Credits::new(2.0))
        .unwrap();
    assert_eq!(marketplace.wallet(sender).unwrap().credits(), Credits::new(3.0));
    assert_eq!(marketplace.wallet(receiver).unwrap().credits(), Credits::new(2.0));
}

#[test]
fn plan_limits_gate_advance_and_requests() {
    let marketplace = {
        let mut env = MarketplaceEnv::with_scheduler(Arc::new(InMemoryScheduler::new()));
        env.clock = Arc::new(test_clock());
        env.plans = Arc::new(spotswap_domain::UniformPlans::new(
            spotswap_domain::ports::PlanLimits {
                can_request: false,
                max_advance: Duration::days(7),
                max_parallel_bookings: 1,
            },
        ));
        Marketplace::new(env)
    };
    let (spot_id, _, parking_id) = spot_with_owner(&marketplace);
    marketplace
        .make_available(spot_id, at(20, 8), at(20, 12))
        .unwrap();

    let user = UserId::new();
    fund(&marketplace, user, 10.0);
    // The 20th is beyond the 7-day advance window of the plan.
    assert_eq!(
        domain_err(
            marketplace
                .book(spot_id, user, at(20, 9), Duration::hours(1))
                .unwrap_err()
        )
        .code(),
        "invalid_booking"
    );
    assert_eq!(
        domain_err(
            marketplace
                .request_booking(parking_id, user, at(3, 8), at(3, 10), Credits::ZERO)
                .unwrap_err()
        )
        .code(),
        "invalid_booking"
    );

    // Inside the window, the parallel cap bites on the second booking.
    marketplace
        .make_available(spot_id, at(3, 8), at(3, 12))
        .unwrap();
    marketplace
        .book(spot_id, user, at(3, 8), Duration::hours(1))
        .unwrap();
    assert_eq!(
        domain_err(
            marketplace
                .book(spot_id, user, at(3, 10), Duration::hours(1))
                .unwrap_err()
        )
        .code(),
        "invalid_booking"
    );
}

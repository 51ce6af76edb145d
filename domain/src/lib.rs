//! # Spotswap Domain
//!
//! The domain core of the peer-to-peer parking marketplace: spots publish
//! availability windows, neighbours book them, and every exchange of value
//! flows through an idempotent credits ledger.
//!
//! ## Architecture
//!
//! Aggregates ([`Spot`], [`Parking`], [`Wallet`], [`User`]) own their state
//! and record domain events into an [`EventBuffer`](spotswap_core::EventBuffer)
//! as operations succeed. The [`Marketplace`] service drains those events
//! after each commit and fans them out through [`Dispatcher`](spotswap_core::Dispatcher)
//! tables, which update downstream aggregates synchronously and hand
//! deferred work (notifications, expirations, completions, credit
//! confirmation) to the durable scheduler via the [`Outbox`](spotswap_core::Outbox).
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use spotswap_domain::{Marketplace, MarketplaceEnv, SpotName, UserId};
//!
//! let env = MarketplaceEnv::in_memory();
//! let marketplace = Marketplace::new(env);
//!
//! let owner = UserId::new();
//! let parking = marketplace.create_parking(vec![owner])?;
//! let name = SpotName::new("A1")?;
//! let spot = marketplace.register_spot(owner, name, parking)?;
//!
//! let from = Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).single().ok_or("bad date")?;
//! let outcome = marketplace.make_available(spot, from, from + Duration::hours(8))?;
//! assert!(!outcome.had_overlap);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod availability;
pub mod booking;
pub mod credits;
pub mod error;
pub mod events;
pub mod handlers;
pub mod jobs;
pub mod memory;
pub mod parking;
pub mod ports;
pub mod service;
pub mod spot;
pub mod time_range;
pub mod types;
pub mod user;
pub mod wallet;

pub use availability::Availability;
pub use booking::{Booking, Rating};
pub use credits::Credits;
pub use error::DomainError;
pub use events::{ParkingEvent, SpotEvent};
pub use handlers::{MarketplaceEnv, MarketplaceExecutor};
pub use jobs::JobCommand;
pub use memory::{
    InMemoryParkings, InMemorySpots, InMemoryUsers, InMemoryWallets, RecordingNotifier,
    UniformPlans,
};
pub use parking::{BookingRequest, Parking, RequestOutcome};
pub use ports::{
    NotificationError, NotificationSender, ParkingStore, PlanLimits, PlanLookup, SpotStore,
    StoreError, UserStore, WalletStore,
};
pub use service::Marketplace;
pub use spot::{BookingOutcome, PublishOutcome, Spot};
pub use time_range::TimeRange;
pub use types::{AvailabilityId, BookingId, BookingRequestId, ParkingId, SpotId, SpotName, UserId};
pub use user::User;
pub use wallet::{CreditsTransaction, TransactionState, Wallet};

use chrono::Duration;

/// How long before a booking starts the spot owner loses the right to
/// cancel it (or any availability containing it).
#[must_use]
pub fn frozen_for() -> Duration {
    Duration::hours(1)
}

/// Margin trimmed from a free slice wherever it borders an existing
/// booking, so back-to-back bookings never touch.
#[must_use]
pub fn border_margin() -> Duration {
    Duration::minutes(1)
}

/// Grace period after an availability window closes before the pending
/// credits earned from it are confirmed.
#[must_use]
pub fn confirm_grace() -> Duration {
    Duration::seconds(60)
}

//! Ports to the outside world: persistence, notifications, and plans.
//!
//! Stores expose an update-closure shape: load the aggregate, run the
//! domain operation against it, and persist plus return the recorded
//! events only when the operation succeeded. A failed operation must
//! leave the stored aggregate untouched.

use crate::error::DomainError;
use crate::events::{ParkingEvent, SpotEvent};
use crate::parking::Parking;
use crate::spot::Spot;
use crate::types::{ParkingId, SpotId, UserId};
use crate::user::User;
use crate::wallet::Wallet;
use chrono::Duration;
use spotswap_core::SchedulerError;
use thiserror::Error;

/// Failure to deliver a push notification.
#[derive(Error, Debug, Clone)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Delivers push notifications to users. Called only from the job
/// runner, never from a domain operation.
pub trait NotificationSender: Send + Sync {
    /// Pushes one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] on delivery failure; the job runner
    /// retries with backoff.
    fn push(&self, user_id: UserId, title: &str, body: &str) -> Result<(), NotificationError>;
}

/// What a user's subscription plan allows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanLimits {
    /// Whether the user may open booking requests.
    pub can_request: bool,
    /// How far ahead bookings and requests may start.
    pub max_advance: Duration,
    /// How many simultaneous bookings the user may hold on one spot.
    pub max_parallel_bookings: usize,
}

impl Default for PlanLimits {
    /// The free plan: no requests, two weeks ahead, one booking at a
    /// time.
    fn default() -> Self {
        Self {
            can_request: false,
            max_advance: Duration::weeks(2),
            max_parallel_bookings: 1,
        }
    }
}

/// Resolves the plan limits of a user.
pub trait PlanLookup: Send + Sync {
    /// The limits currently applying to `user_id`.
    fn limits_for(&self, user_id: UserId) -> PlanLimits;
}

/// Errors crossing a store boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed aggregate does not exist.
    #[error("{kind} '{id}' does not exist")]
    AggregateMissing {
        /// Aggregate kind, for the message.
        kind: &'static str,
        /// The missing id.
        id: String,
    },

    /// The domain operation inside the update rejected the change.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The durable scheduler failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The storage backend itself failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Operation run against a loaded [`Spot`] inside a store update.
pub type SpotOp<'a> = &'a mut dyn FnMut(&mut Spot) -> Result<(), DomainError>;

/// Operation run against a loaded [`Parking`] inside a store update.
pub type ParkingOp<'a> = &'a mut dyn FnMut(&mut Parking) -> Result<(), DomainError>;

/// Operation run against a loaded [`Wallet`] inside a store update.
pub type WalletOp<'a> = &'a mut dyn FnMut(&mut Wallet) -> Result<(), DomainError>;

/// Persistence for [`Spot`] aggregates.
pub trait SpotStore: Send + Sync {
    /// Inserts a new spot.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    fn insert(&self, spot: Spot) -> Result<(), StoreError>;

    /// Loads a snapshot of a spot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AggregateMissing`] for unknown ids.
    fn get(&self, id: SpotId) -> Result<Spot, StoreError>;

    /// Runs `op` against the spot and, on success, persists the change
    /// and returns the events it recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AggregateMissing`] for unknown ids, or the
    /// domain error `op` returned (in which case nothing was persisted).
    fn update(&self, id: SpotId, op: SpotOp<'_>) -> Result<Vec<SpotEvent>, StoreError>;

    /// Removes a spot, returning its final state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AggregateMissing`] for unknown ids.
    fn remove(&self, id: SpotId) -> Result<Spot, StoreError>;
}

/// Persistence for [`Parking`] aggregates.
pub trait ParkingStore: Send + Sync {
    /// Inserts a new community.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    fn insert(&self, parking: Parking) -> Result<(), StoreError>;

    /// Loads a snapshot of a community.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AggregateMissing`] for unknown ids.
    fn get(&self, id: ParkingId) -> Result<Parking, StoreError>;

    /// Runs `op` against the community and, on success, persists the
    /// change and returns the events it recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AggregateMissing`] for unknown ids, or the
    /// domain error `op` returned.
    fn update(&self, id: ParkingId, op: ParkingOp<'_>) -> Result<Vec<ParkingEvent>, StoreError>;
}

/// Persistence for [`Wallet`] ledgers.
///
/// Wallets record no events; updates either commit or roll back.
pub trait WalletStore: Send + Sync {
    /// Loads a snapshot of a wallet. Unknown users get an empty wallet.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    fn get(&self, user_id: UserId) -> Result<Wallet, StoreError>;

    /// Runs `op` against the wallet, creating it on first use, and
    /// persists the change on success.
    ///
    /// # Errors
    ///
    /// Returns the domain error `op` returned, in which case nothing was
    /// persisted.
    fn update(&self, user_id: UserId, op: WalletOp<'_>) -> Result<(), StoreError>;
}

/// Persistence for [`User`] records.
pub trait UserStore: Send + Sync {
    /// Loads a snapshot of a user. Unknown ids get a fresh record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    fn get(&self, user_id: UserId) -> Result<User, StoreError>;

    /// Adjusts a user's reputation, creating the record on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] from the backend.
    fn adjust_reputation(&self, user_id: UserId, delta: i64) -> Result<(), StoreError>;
}

//! In-memory store implementations.
//!
//! Each store keeps its aggregates in a mutex-guarded map and applies
//! updates copy-on-write: the operation runs against a clone, and only a
//! successful result is written back. A rejected operation therefore
//! leaves the stored aggregate byte-for-byte untouched, matching the
//! rollback contract of the ports.

use crate::parking::Parking;
use crate::ports::{
    ParkingOp, ParkingStore, SpotOp, SpotStore, StoreError, UserStore, WalletOp, WalletStore,
};
use crate::spot::Spot;
use crate::types::{ParkingId, SpotId, UserId};
use crate::user::User;
use crate::wallet::Wallet;
use spotswap_core::Aggregate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Storage("store mutex poisoned".into()))
}

/// In-memory [`SpotStore`].
#[derive(Debug, Default)]
pub struct InMemorySpots {
    spots: Mutex<HashMap<SpotId, Spot>>,
}

impl InMemorySpots {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpotStore for InMemorySpots {
    fn insert(&self, spot: Spot) -> Result<(), StoreError> {
        lock(&self.spots)?.insert(spot.id(), spot);
        Ok(())
    }

    fn get(&self, id: SpotId) -> Result<Spot, StoreError> {
        lock(&self.spots)?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::AggregateMissing {
                kind: "spot",
                id: id.to_string(),
            })
    }

    fn update(&self, id: SpotId, op: SpotOp<'_>) -> Result<Vec<crate::events::SpotEvent>, StoreError> {
        let mut spots = lock(&self.spots)?;
        let stored = spots.get(&id).ok_or_else(|| StoreError::AggregateMissing {
            kind: "spot",
            id: id.to_string(),
        })?;
        let mut working = stored.clone();
        op(&mut working)?;
        let events = working.take_uncommitted();
        spots.insert(id, working);
        Ok(events)
    }

    fn remove(&self, id: SpotId) -> Result<Spot, StoreError> {
        lock(&self.spots)?
            .remove(&id)
            .ok_or_else(|| StoreError::AggregateMissing {
                kind: "spot",
                id: id.to_string(),
            })
    }
}

/// In-memory [`ParkingStore`].
#[derive(Debug, Default)]
pub struct InMemoryParkings {
    parkings: Mutex<HashMap<ParkingId, Parking>>,
}

impl InMemoryParkings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParkingStore for InMemoryParkings {
    fn insert(&self, parking: Parking) -> Result<(), StoreError> {
        lock(&self.parkings)?.insert(parking.id(), parking);
        Ok(())
    }

    fn get(&self, id: ParkingId) -> Result<Parking, StoreError> {
        lock(&self.parkings)?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::AggregateMissing {
                kind: "parking",
                id: id.to_string(),
            })
    }

    fn update(
        &self,
        id: ParkingId,
        op: ParkingOp<'_>,
    ) -> Result<Vec<crate::events::ParkingEvent>, StoreError> {
        let mut parkings = lock(&self.parkings)?;
        let stored = parkings
            .get(&id)
            .ok_or_else(|| StoreError::AggregateMissing {
                kind: "parking",
                id: id.to_string(),
            })?;
        let mut working = stored.clone();
        op(&mut working)?;
        let events = working.take_uncommitted();
        parkings.insert(id, working);
        Ok(events)
    }
}

/// In-memory [`WalletStore`]. Wallets materialize on first touch.
#[derive(Debug, Default)]
pub struct InMemoryWallets {
    wallets: Mutex<HashMap<UserId, Wallet>>,
}

impl InMemoryWallets {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for InMemoryWallets {
    fn get(&self, user_id: UserId) -> Result<Wallet, StoreError> {
        Ok(lock(&self.wallets)?
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Wallet::new(user_id)))
    }

    fn update(&self, user_id: UserId, op: WalletOp<'_>) -> Result<(), StoreError> {
        let mut wallets = lock(&self.wallets)?;
        let mut working = wallets
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Wallet::new(user_id));
        op(&mut working)?;
        wallets.insert(user_id, working);
        Ok(())
    }
}

/// In-memory [`UserStore`]. Users materialize on first touch.
#[derive(Debug, Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUsers {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUsers {
    fn get(&self, user_id: UserId) -> Result<User, StoreError> {
        Ok(lock(&self.users)?
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| User::new(user_id)))
    }

    fn adjust_reputation(&self, user_id: UserId, delta: i64) -> Result<(), StoreError> {
        lock(&self.users)?
            .entry(user_id)
            .or_insert_with(|| User::new(user_id))
            .adjust_reputation(delta);
        Ok(())
    }
}

/// Notification sender that records pushes instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, String)>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recipient and title of every notification pushed so far.
    #[must_use]
    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl crate::ports::NotificationSender for RecordingNotifier {
    fn push(
        &self,
        user_id: UserId,
        title: &str,
        _body: &str,
    ) -> Result<(), crate::ports::NotificationError> {
        self.sent
            .lock()
            .map_err(|_| crate::ports::NotificationError("notifier mutex poisoned".into()))?
            .push((user_id, title.to_owned()));
        Ok(())
    }
}

/// Plan lookup that hands every user the same limits.
#[derive(Debug, Clone)]
pub struct UniformPlans {
    limits: crate::ports::PlanLimits,
}

impl UniformPlans {
    /// Gives every user the supplied limits.
    #[must_use]
    pub const fn new(limits: crate::ports::PlanLimits) -> Self {
        Self { limits }
    }

    /// Gives every user an unrestricted plan.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::new(crate::ports::PlanLimits {
            can_request: true,
            max_advance: chrono::Duration::weeks(52 * 10),
            max_parallel_bookings: usize::MAX,
        })
    }
}

impl Default for UniformPlans {
    fn default() -> Self {
        Self::new(crate::ports::PlanLimits::default())
    }
}

impl crate::ports::PlanLookup for UniformPlans {
    fn limits_for(&self, _user_id: UserId) -> crate::ports::PlanLimits {
        self.limits.clone()
    }
}

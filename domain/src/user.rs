//! Marketplace users and their reputation.

use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// A marketplace user.
///
/// Reputation moves with behaviour: completing a stay or helping a
/// neighbour raises it, cancelling on someone or earning a bad rating
/// lowers it. It can go negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    reputation: i64,
}

impl User {
    /// Creates a user with zero reputation.
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self { id, reputation: 0 }
    }

    /// The user id.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Current reputation.
    #[must_use]
    pub const fn reputation(&self) -> i64 {
        self.reputation
    }

    /// Moves reputation by a signed delta.
    pub const fn adjust_reputation(&mut self, delta: i64) {
        self.reputation += delta;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn reputation_moves_and_may_go_negative() {
        let mut user = User::new(UserId::new());
        user.adjust_reputation(1);
        user.adjust_reputation(-3);
        assert_eq!(user.reputation(), -2);
    }
}

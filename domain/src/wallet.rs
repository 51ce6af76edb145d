//! The idempotent credits ledger.
//!
//! A wallet is a flat list of transactions, each keyed by a caller-chosen
//! reference string. Writing the same reference again replaces the
//! earlier transaction instead of stacking a second one, which is what
//! makes every money-moving handler safe to re-deliver. Balances are
//! always derived by summation, never stored.

use crate::credits::Credits;
use crate::error::DomainError;
use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// Whether a transaction counts toward the spendable balance yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Reserved or promised, not spendable.
    Pending,
    /// Settled, part of the spendable balance.
    Confirmed,
}

/// One ledger entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreditsTransaction {
    reference: String,
    credits: Credits,
    state: TransactionState,
}

impl CreditsTransaction {
    /// The idempotency reference this entry is keyed by.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The signed amount. Negative for charges and reservations.
    #[must_use]
    pub const fn credits(&self) -> Credits {
        self.credits
    }

    /// Whether the entry is pending or confirmed.
    #[must_use]
    pub const fn state(&self) -> TransactionState {
        self.state
    }
}

/// One user's credits ledger.
#[derive(Clone, Debug, Default)]
pub struct Wallet {
    user_id: UserId,
    transactions: Vec<CreditsTransaction>,
}

impl Wallet {
    /// Creates an empty wallet for a user.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            transactions: Vec::new(),
        }
    }

    /// The wallet owner.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// All ledger entries, oldest first.
    #[must_use]
    pub fn transactions(&self) -> &[CreditsTransaction] {
        &self.transactions
    }

    /// Spendable balance: the sum of confirmed entries.
    #[must_use]
    pub fn credits(&self) -> Credits {
        self.transactions
            .iter()
            .filter(|t| t.state == TransactionState::Confirmed)
            .map(|t| t.credits)
            .sum()
    }

    /// Sum of pending entries: promised earnings minus reservations.
    #[must_use]
    pub fn pending_credits(&self) -> Credits {
        self.transactions
            .iter()
            .filter(|t| t.state == TransactionState::Pending)
            .map(|t| t.credits)
            .sum()
    }

    /// Writes a transaction under a reference. A zero amount is a
    /// no-op, leaving any existing entry under the reference in place;
    /// a non-zero amount replaces the existing entry.
    pub fn idempotent_transaction(
        &mut self,
        reference: impl Into<String>,
        credits: Credits,
        state: TransactionState,
    ) {
        if credits.is_zero() {
            return;
        }
        let reference = reference.into();
        self.transactions.retain(|t| t.reference != reference);
        self.transactions.push(CreditsTransaction {
            reference,
            credits,
            state,
        });
    }

    /// Confirms an immediate debit of `amount` under `reference`.
    ///
    /// The balance check ignores any earlier entry under the same
    /// reference, so re-delivering a charge neither double-bills nor
    /// spuriously runs out of credits.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NegativeChargeAmount`] when `amount` is below
    ///   zero.
    /// - [`DomainError::NotEnoughCredits`] when the confirmed balance
    ///   (excluding this reference) does not cover `amount`.
    pub fn charge(&mut self, reference: &str, amount: Credits) -> Result<(), DomainError> {
        if amount.is_negative() {
            return Err(DomainError::NegativeChargeAmount);
        }
        let available: Credits = self
            .transactions
            .iter()
            .filter(|t| t.state == TransactionState::Confirmed && t.reference != reference)
            .map(|t| t.credits)
            .sum();
        if available < amount {
            return Err(DomainError::NotEnoughCredits {
                needed: amount,
                available,
            });
        }
        self.idempotent_transaction(reference, -amount, TransactionState::Confirmed);
        Ok(())
    }

    /// Writes a pending entry: a promised earning (positive) or a
    /// deposit reservation (negative).
    pub fn credit_pending(&mut self, reference: &str, amount: Credits) {
        self.idempotent_transaction(reference, amount, TransactionState::Pending);
    }

    /// Writes a confirmed credit.
    pub fn credit_confirmed(&mut self, reference: &str, amount: Credits) {
        self.idempotent_transaction(reference, amount, TransactionState::Confirmed);
    }

    /// Promotes the pending entry under `reference` to confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::CannotConfirmPending`] when no pending
    /// entry with that reference exists (it may already have been
    /// cancelled or confirmed).
    pub fn confirm_pending(&mut self, reference: &str) -> Result<(), DomainError> {
        let entry = self
            .transactions
            .iter_mut()
            .find(|t| t.reference == reference && t.state == TransactionState::Pending)
            .ok_or_else(|| DomainError::CannotConfirmPending(reference.to_owned()))?;
        entry.state = TransactionState::Confirmed;
        Ok(())
    }

    /// Removes the entry under `reference`, whatever its state. Removing
    /// an absent reference is a no-op, so refunds and reservation
    /// releases can be re-delivered freely.
    pub fn cancel_transaction(&mut self, reference: &str) {
        self.transactions.retain(|t| t.reference != reference);
    }
}

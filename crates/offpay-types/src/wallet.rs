//! Escrow wallet model.
//!
//! A user locks funds into an escrow wallet before going offline. Offline
//! payments are later settled against `locked_amount`, which the bank only
//! ever decreases by amounts it covers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, UserId, WalletId};

/// Approval state of an escrow wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// An escrow account backing offline payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    pub wallet_id: WalletId,
    pub owner_user_id: UserId,
    /// Limit approved by the bank during onboarding.
    pub approved_limit: Amount,
    pub current_balance: Amount,
    /// Total settled against this wallet so far.
    pub used_amount: Amount,
    /// Funds still available to back offline payments.
    pub locked_amount: Amount,
    pub status: WalletStatus,
}

impl EscrowAccount {
    /// Create an approved wallet with `locked` funds held in escrow.
    #[must_use]
    pub fn approved(wallet_id: WalletId, owner: UserId, locked: Amount) -> Self {
        Self {
            wallet_id,
            owner_user_id: owner,
            approved_limit: locked,
            current_balance: locked,
            used_amount: Amount::ZERO,
            locked_amount: locked,
            status: WalletStatus::Approved,
        }
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == WalletStatus::Approved
    }

    /// Whether the locked balance covers `amount`.
    #[must_use]
    pub fn covers(&self, amount: Amount) -> bool {
        self.locked_amount >= amount
    }

    /// Debit `amount` from the locked balance and record it as used.
    ///
    /// Returns `false` and leaves the account untouched if the locked
    /// balance does not cover the amount.
    pub fn debit_locked(&mut self, amount: Amount) -> bool {
        if !self.covers(amount) {
            return false;
        }
        self.locked_amount = Amount::new(self.locked_amount.value() - amount.value());
        self.used_amount = Amount::new(self.used_amount.value() + amount.value());
        true
    }
}

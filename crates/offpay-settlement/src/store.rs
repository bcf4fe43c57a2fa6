//! Storage seams of the settlement engine.
//!
//! Both traits are synchronous. A database-backed store wraps its own
//! transactions; the engine only relies on the guarantees documented on
//! each method.

use offpay_types::{
    Amount, AuditLogEntry, EscrowAccount, OffpayError, ParticipantRole, SettlementRecord, UserId,
    WalletId,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A settlement record with this `txn_id` already exists.
    #[error("settlement for {0} already exists")]
    DuplicateKey(String),

    #[error("wallet {0} not found")]
    WalletNotFound(WalletId),

    /// The guarded decrement refused: `locked < needed`.
    #[error("insufficient escrow in {wallet_id}: need {needed}, locked {locked}")]
    InsufficientEscrow {
        wallet_id: WalletId,
        needed: Amount,
        locked: Amount,
    },

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for OffpayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(txn_id) => Self::ReplayDetected(txn_id),
            StoreError::WalletNotFound(wallet_id) => Self::WalletNotFound(wallet_id),
            StoreError::InsufficientEscrow {
                wallet_id,
                needed,
                locked,
            } => Self::InsufficientEscrow {
                wallet_id,
                needed,
                locked,
            },
            StoreError::Backend(reason) => Self::Store(reason),
        }
    }
}

/// Persistent state the settlement engine reads and writes.
pub trait SettlementStore: Send + Sync {
    fn find_settlement(&self, txn_id: &str) -> Result<Option<SettlementRecord>, StoreError>;

    /// Insert a record. [`StoreError::DuplicateKey`] if `txn_id` is taken.
    fn insert_settlement(&self, record: SettlementRecord) -> Result<(), StoreError>;

    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<EscrowAccount>, StoreError>;

    /// Decrease `locked_amount` by `amount` only if `locked_amount >= amount`,
    /// as one atomic step. Returns the updated account.
    fn decrement_locked(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
    ) -> Result<EscrowAccount, StoreError>;

    /// Map an external bank id to a registered user. `Ok(None)` when unknown.
    fn resolve_user_by_bank_id(
        &self,
        bank_id: &str,
        role: ParticipantRole,
    ) -> Result<Option<UserId>, StoreError>;

    /// Insert `record` and debit its wallet by `record.amount`.
    ///
    /// When [`provides_atomic_commit`](Self::provides_atomic_commit) is
    /// `true`, either both happen or neither does.
    fn commit_escrow_settlement(&self, record: SettlementRecord) -> Result<(), StoreError>;

    /// Whether [`commit_escrow_settlement`](Self::commit_escrow_settlement)
    /// is a single atomic unit. When `false` the engine serializes each
    /// wallet's check-then-commit with [`WalletLocks`](crate::WalletLocks).
    fn provides_atomic_commit(&self) -> bool {
        true
    }
}

/// Append-only audit trail.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError>;

    /// Page through entries, newest first.
    fn recent(&self, limit: usize, offset: usize) -> Result<Vec<AuditLogEntry>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_replay() {
        let err: OffpayError = StoreError::DuplicateKey("t1".into()).into();
        assert!(matches!(err, OffpayError::ReplayDetected(ref id) if id == "t1"));
        assert_eq!(
            err.to_string(),
            "OP_ERR_400: Transaction t1 already settled (replay detected)"
        );
    }

    #[test]
    fn guarded_decrement_refusal_is_escrow_error() {
        let err: OffpayError = StoreError::InsufficientEscrow {
            wallet_id: WalletId::new("w"),
            needed: Amount::from_units(5),
            locked: Amount::from_units(1),
        }
        .into();
        assert!(matches!(err, OffpayError::InsufficientEscrow { .. }));
    }

    #[test]
    fn backend_failure_is_store_error() {
        let err: OffpayError = StoreError::Backend("disk full".into()).into();
        assert!(matches!(err, OffpayError::Store(_)));
    }
}

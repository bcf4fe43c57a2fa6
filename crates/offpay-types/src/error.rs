//! Error types for OffPay.
//!
//! All errors use the `OP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by tier:
//! - 1xx: Malformed input
//! - 3xx: Authentication (signatures, transport)
//! - 4xx: Replay
//! - 5xx: Escrow
//! - 6xx: Identity
//! - 7xx: Store
//! - 9xx: General / internal errors

use std::fmt;

use thiserror::Error;

use crate::{Amount, ParticipantRole, WalletId, WalletStatus};

/// Coarse classification of an [`OffpayError`], used by callers that map
/// errors onto transport status codes or audit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTier {
    MalformedInput,
    Authentication,
    Replay,
    Escrow,
    Identity,
    Store,
    Internal,
}

impl fmt::Display for ErrorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedInput => "malformed_input",
            Self::Authentication => "authentication",
            Self::Replay => "replay",
            Self::Escrow => "escrow",
            Self::Identity => "identity",
            Self::Store => "store",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Central error enum for all OffPay operations.
#[derive(Debug, Error)]
pub enum OffpayError {
    // =================================================================
    // Malformed Input (1xx)
    // =================================================================
    /// The batch could not be decoded into any known format.
    #[error("OP_ERR_100: Malformed batch: {reason}")]
    MalformedBatch { reason: String },

    /// A transaction carries an amount that can never be settled.
    #[error("OP_ERR_101: Invalid amount {amount} for transaction {txn_id}")]
    InvalidAmount { txn_id: String, amount: Amount },

    // =================================================================
    // Authentication (3xx)
    // =================================================================
    /// A signature did not verify.
    #[error("OP_ERR_300: Signature invalid: {reason}")]
    SignatureInvalid { reason: String },

    /// The encrypted bundle could not be opened or authenticated.
    #[error("OP_ERR_301: Transport failure: {reason}")]
    TransportFailure { reason: String },

    // =================================================================
    // Replay (4xx)
    // =================================================================
    /// The transaction already has a settlement record.
    #[error("OP_ERR_400: Transaction {0} already settled (replay detected)")]
    ReplayDetected(String),

    // =================================================================
    // Escrow (5xx)
    // =================================================================
    /// The referenced escrow wallet does not exist.
    #[error("OP_ERR_500: Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// The wallet exists but is not approved for settlement.
    #[error("OP_ERR_501: {wallet_id} is not approved (status: {status})")]
    WalletNotApproved {
        wallet_id: WalletId,
        status: WalletStatus,
    },

    /// The wallet's locked balance does not cover the transaction.
    #[error("OP_ERR_502: Insufficient escrow in {wallet_id}: need {needed}, locked {locked}")]
    InsufficientEscrow {
        wallet_id: WalletId,
        needed: Amount,
        locked: Amount,
    },

    /// Escrow-less settlement is disabled and the transaction names no wallet.
    #[error("OP_ERR_503: Transaction {0} has no wallet_id and unescrowed settlement is disabled")]
    MissingWallet(String),

    /// The wallet named by a transaction belongs to someone other than its
    /// sender.
    #[error("OP_ERR_504: {wallet_id} is not owned by sender '{from_id}'")]
    WalletOwnerMismatch {
        wallet_id: WalletId,
        from_id: String,
    },

    // =================================================================
    // Identity (6xx)
    // =================================================================
    /// A bank id could not be resolved to a registered user.
    #[error("OP_ERR_600: Cannot resolve {role} '{bank_id}' to a registered user")]
    UnresolvedParticipant {
        bank_id: String,
        role: ParticipantRole,
    },

    // =================================================================
    // Store (7xx)
    // =================================================================
    /// The settlement store failed for a reason other than a domain rule.
    #[error("OP_ERR_700: Store error: {0}")]
    Store(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Serialization / deserialization error.
    #[error("OP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration or key material error.
    #[error("OP_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("OP_ERR_903: I/O error: {0}")]
    Io(String),
}

impl OffpayError {
    #[must_use]
    pub fn tier(&self) -> ErrorTier {
        match self {
            Self::MalformedBatch { .. } | Self::InvalidAmount { .. } => ErrorTier::MalformedInput,
            Self::SignatureInvalid { .. } | Self::TransportFailure { .. } => {
                ErrorTier::Authentication
            }
            Self::ReplayDetected(_) => ErrorTier::Replay,
            Self::WalletNotFound(_)
            | Self::WalletNotApproved { .. }
            | Self::InsufficientEscrow { .. }
            | Self::MissingWallet(_)
            | Self::WalletOwnerMismatch { .. } => ErrorTier::Escrow,
            Self::UnresolvedParticipant { .. } => ErrorTier::Identity,
            Self::Store(_) => ErrorTier::Store,
            Self::Serialization(_) | Self::Configuration(_) | Self::Io(_) => ErrorTier::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OffpayError>;

impl From<std::io::Error> for OffpayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OffpayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = OffpayError::ReplayDetected("t-1".into());
        let msg = format!("{err}");
        assert!(msg.starts_with("OP_ERR_400"), "Got: {msg}");
        assert!(msg.contains("already settled (replay detected)"));
    }

    #[test]
    fn insufficient_escrow_display() {
        let err = OffpayError::InsufficientEscrow {
            wallet_id: WalletId::new("w1"),
            needed: Amount::from_units(100),
            locked: Amount::from_units(60),
        };
        let msg = format!("{err}");
        assert!(msg.contains("OP_ERR_502"));
        assert!(msg.contains("wallet:w1"));
        assert!(msg.contains("100"));
        assert!(msg.contains("60"));
    }

    #[test]
    fn owner_mismatch_names_wallet_and_sender() {
        let err = OffpayError::WalletOwnerMismatch {
            wallet_id: WalletId::new("w-carol"),
            from_id: "alice".into(),
        };
        assert_eq!(
            err.to_string(),
            "OP_ERR_504: wallet:w-carol is not owned by sender 'alice'"
        );
        assert_eq!(err.tier(), ErrorTier::Escrow);
    }

    #[test]
    fn tiers_are_grouped() {
        assert_eq!(
            OffpayError::MalformedBatch { reason: "x".into() }.tier(),
            ErrorTier::MalformedInput
        );
        assert_eq!(
            OffpayError::TransportFailure { reason: "x".into() }.tier(),
            ErrorTier::Authentication
        );
        assert_eq!(OffpayError::ReplayDetected("t".into()).tier(), ErrorTier::Replay);
        assert_eq!(
            OffpayError::MissingWallet("t".into()).tier(),
            ErrorTier::Escrow
        );
        assert_eq!(
            OffpayError::UnresolvedParticipant {
                bank_id: "b".into(),
                role: ParticipantRole::Sender,
            }
            .tier(),
            ErrorTier::Identity
        );
        assert_eq!(OffpayError::Io("x".into()).tier(), ErrorTier::Internal);
    }

    #[test]
    fn all_errors_have_op_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(OffpayError::InvalidAmount {
                txn_id: "t".into(),
                amount: Amount::from_units(-1),
            }),
            Box::new(OffpayError::WalletNotFound(WalletId::new("w"))),
            Box::new(OffpayError::WalletNotApproved {
                wallet_id: WalletId::new("w"),
                status: WalletStatus::Pending,
            }),
            Box::new(OffpayError::Store("boom".into())),
            Box::new(OffpayError::Configuration("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OP_ERR_"),
                "Error missing OP_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: OffpayError = bad.unwrap_err().into();
        assert!(matches!(err, OffpayError::Serialization(_)));
    }
}

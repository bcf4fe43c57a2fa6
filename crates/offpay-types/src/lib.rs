//! # offpay-types
//!
//! Shared types, errors, and configuration for **OffPay**, the bank-side
//! verifier and settlement engine for offline payment ledgers.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`WalletId`], [`SettlementRecordId`], [`AuditLogId`]
//! - **Offline model**: [`Transaction`], [`Amount`], [`EcPublicJwk`], [`LedgerEntry`], [`Ledger`]
//! - **Escrow model**: [`EscrowAccount`], [`WalletStatus`]
//! - **Settlement model**: [`SettlementRecord`], [`ParticipantRole`]
//! - **Audit model**: [`AuditLogEntry`], [`AuditAction`], [`AuditStatus`]
//! - **Configuration**: [`BankConfig`], [`VerificationConfig`], [`SettlementConfig`],
//!   [`LoggingConfig`]
//! - **Errors**: [`OffpayError`] with `OP_ERR_` prefix codes
//! - **Constants**: wire-format anchors and defaults

pub mod amount;
pub mod audit;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod settlement;
pub mod transaction;
pub mod wallet;

// Re-export all primary types at crate root for ergonomic imports:
//   use offpay_types::{Transaction, Ledger, EscrowAccount, ...};

pub use amount::*;
pub use audit::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use ledger::*;
pub use settlement::*;
pub use transaction::*;
pub use wallet::*;

// Constants are accessed via `offpay_types::constants::FOO`
// (not re-exported to avoid name collisions).

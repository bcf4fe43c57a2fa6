//! # offpay-settlement
//!
//! **Finality plane**: turns a [`VerifiedLedger`](offpay_verify::VerifiedLedger)
//! into settlement records, debiting escrow wallets exactly once per
//! transaction.
//!
//! ## Architecture
//!
//! 1. **SettlementStore**: durable records, escrow wallets and the bank-id
//!    directory, behind a sync trait
//! 2. **AuditSink**: append-only audit trail; failures never change outcomes
//! 3. **WalletLocks**: per-wallet exclusion for stores that cannot commit
//!    check-then-debit as one unit
//! 4. **SettlementEngine**: per-transaction replay, escrow and identity
//!    checks followed by the commit
//! 5. **MemoryStore**: in-process implementation of both traits
//!
//! ## Flow
//!
//! ```text
//! VerifiedLedger → SettlementEngine::settle()
//!   for each entry: amount → replay → escrow → identity → commit → audit
//!   → settle_ledger_batch summary → SettlementOutcome
//! ```

pub mod engine;
pub mod memory;
pub mod store;
pub mod wallet_lock;

pub use engine::{SettlementEngine, SettlementOutcome, TxnRejection};
pub use memory::MemoryStore;
pub use store::{AuditSink, SettlementStore, StoreError};
pub use wallet_lock::WalletLocks;

//! # offpay-bank
//!
//! The bank-facing service layer. [`BankService`] takes an uploaded batch
//! as JSON, opens it if encrypted, verifies it and settles it, producing the
//! same response shapes the HTTP surface returns.
//!
//! ## Flow
//!
//! ```text
//! JSON → BatchFormat → (SecureTransportCodec) → Ledger
//!      → LedgerVerifier::verify()  → LedgerVerificationResponse
//!      → LedgerVerifier::admit()   → SettlementEngine::settle() → SettlementResponse
//! ```

pub mod response;
pub mod service;
pub mod telemetry;

pub use response::{AuditLogPage, LedgerVerificationResponse, SettlementResponse};
pub use service::BankService;
pub use telemetry::init_tracing;

//! # offpay-verify
//!
//! **Pure verification of offline payment ledgers.**
//!
//! Everything in this crate is a function of its input: no store access, no
//! clock, no randomness outside test fixtures. Verification can run on any
//! thread, in parallel, and twice with the same result.
//!
//! - **Canonical hashing**: the byte-exact transaction encoding shared with
//!   sender devices
//! - **Signatures**: ECDSA P-256 over the transaction hash, keys as JWK
//! - **Hash chain**: entry-to-entry linkage of a receiver's ledger
//! - **Duplicates**: repeated `txn_id`s within one batch
//! - **Verifier**: runs all of the above and mints [`VerifiedLedger`], the
//!   only input the settlement engine accepts

pub mod canonical;
pub mod chain;
pub mod duplicates;
pub mod encoding;
pub mod signature;
pub mod verifier;

#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;

pub use canonical::{ledger_digest, sha256_hex, transaction_hash, verify_transaction_hash};
pub use chain::{ChainReport, IntegrityIssue, IssueKind, verify_hash_chain};
pub use duplicates::{DuplicateReport, check_duplicates};
pub use signature::{JwkKey, VerificationError, sign_hash, signature_is_valid, verify_signature};
pub use verifier::{LedgerVerifier, VerificationReport, VerifiedLedger};

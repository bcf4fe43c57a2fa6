//! Hash-chain validation of a receiver ledger.
//!
//! The rolling anchor starts at `"GENESIS"` and advances to each entry's
//! *claimed* hash, not the recomputed one. A single corrupted link therefore
//! reports at most the entry itself and its immediate successor; the rest of
//! the tail is checked against what was actually claimed.

use std::fmt;

use offpay_types::{LedgerEntry, constants};
use tracing::warn;

use crate::canonical::{sha256_hex, verify_transaction_hash};

/// What went wrong at one ledger position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// `transaction.hash` differs from the canonical hash.
    TransactionHashMismatch,
    /// `entry.hash` differs from `SHA256(prev + transaction.hash)`.
    ChainBroken { expected: String, actual: String },
    /// The transaction signature did not verify.
    SignatureInvalid { cause: String },
}

/// A single integrity finding, tied to its ledger position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    pub entry_index: usize,
    pub kind: IssueKind,
}

fn preview(hash: &str) -> String {
    hash.chars().take(constants::HASH_PREVIEW_CHARS).collect()
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = self.entry_index;
        match &self.kind {
            IssueKind::TransactionHashMismatch => {
                write!(f, "Entry {i}: Transaction hash mismatch")
            }
            IssueKind::ChainBroken { expected, actual } => write!(
                f,
                "Entry {i}: Hash chain broken. Expected {}..., got {}...",
                preview(expected),
                preview(actual)
            ),
            IssueKind::SignatureInvalid { cause } => {
                write!(f, "Entry {i}: Transaction signature invalid ({cause})")
            }
        }
    }
}

/// Result of [`verify_hash_chain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub errors: Vec<IntegrityIssue>,
}

impl ChainReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Expected hash of an entry given its predecessor's hash.
#[must_use]
pub fn entry_hash(prev_entry_hash: &str, txn_hash: &str) -> String {
    sha256_hex(&format!("{prev_entry_hash}{txn_hash}"))
}

/// Check transaction hashes and entry linkage for every entry, in order.
///
/// Never short-circuits: every problem in the ledger is reported.
#[must_use]
pub fn verify_hash_chain(entries: &[LedgerEntry]) -> ChainReport {
    let mut report = ChainReport::default();
    let mut prev = constants::GENESIS_ANCHOR;

    for (i, entry) in entries.iter().enumerate() {
        let txn = &entry.transaction;

        // Not covered by any hash, so a mismatch is reported but not fatal.
        if usize::try_from(entry.ledger_index).ok() != Some(i) {
            warn!(
                txn_id = %txn.txn_id,
                position = i,
                ledger_index = entry.ledger_index,
                "Ledger index does not match entry position"
            );
        }

        if !verify_transaction_hash(txn) {
            report.errors.push(IntegrityIssue {
                entry_index: i,
                kind: IssueKind::TransactionHashMismatch,
            });
        }

        let expected = entry_hash(prev, &txn.hash);
        if expected != entry.hash {
            report.errors.push(IntegrityIssue {
                entry_index: i,
                kind: IssueKind::ChainBroken {
                    expected,
                    actual: entry.hash.clone(),
                },
            });
        }

        prev = &entry.hash;
    }

    report
}

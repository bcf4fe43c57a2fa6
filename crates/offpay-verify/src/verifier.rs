//! Ledger verifier.
//!
//! Runs the chain, duplicate, and per-entry signature checks over a whole
//! ledger and, only if all of them pass, hands back a [`VerifiedLedger`].
//! That type has no public constructor: the settlement engine accepts
//! nothing else, so an unverified batch cannot reach escrow.

use offpay_types::{Ledger, LedgerEntry, VerificationConfig};
use tracing::{debug, info, warn};

use crate::{
    canonical::ledger_digest,
    chain::{IntegrityIssue, IssueKind, verify_hash_chain},
    duplicates::{DuplicateReport, check_duplicates},
    signature::{VerificationError, check_signature_shape, verify_signature},
};

/// Message reported for a ledger with no entries.
pub const EMPTY_LEDGER_MESSAGE: &str = "Ledger is empty";

/// Everything the verifier found wrong with a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub receiver_id: String,
    pub total_entries: usize,
    /// Hash, chain, and signature findings, ordered by entry.
    pub issues: Vec<IntegrityIssue>,
    pub duplicates: DuplicateReport,
}

impl VerificationReport {
    #[must_use]
    pub fn is_empty_ledger(&self) -> bool {
        self.total_entries == 0
    }

    /// Whether the hash chain (transaction hashes and entry links) holds.
    #[must_use]
    pub fn chain_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| !matches!(i.kind, IssueKind::SignatureInvalid { .. }))
    }

    #[must_use]
    pub fn signatures_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| matches!(i.kind, IssueKind::SignatureInvalid { .. }))
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_empty_ledger() && self.issues.is_empty() && self.duplicates.no_duplicates()
    }

    /// Human-readable findings, in report order.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        if self.is_empty_ledger() {
            return vec![EMPTY_LEDGER_MESSAGE.to_string()];
        }
        let mut errors: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        errors.extend(self.duplicates.message());
        errors
    }
}

/// A ledger that passed every verification check.
#[derive(Debug, Clone)]
pub struct VerifiedLedger {
    ledger: Ledger,
    digest: String,
}

impl VerifiedLedger {
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.ledger.entries
    }

    #[must_use]
    pub fn receiver_id(&self) -> &str {
        &self.ledger.receiver_id
    }

    /// Canonical digest of the verified ledger.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Composes the individual checks under a [`VerificationConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerVerifier {
    config: VerificationConfig,
}

impl LedgerVerifier {
    #[must_use]
    pub fn new(config: VerificationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    fn check_entry_signature(&self, entry: &LedgerEntry) -> Result<(), VerificationError> {
        let txn = &entry.transaction;
        match &txn.sender_public_key {
            Some(jwk) => verify_signature(&txn.hash, &txn.signature, jwk),
            None if self.config.require_sender_keys => Err(VerificationError::MissingSenderKey),
            None => check_signature_shape(&txn.signature),
        }
    }

    /// Run every check and report all findings. Never short-circuits.
    #[must_use]
    pub fn verify(&self, ledger: &Ledger) -> VerificationReport {
        let mut issues = verify_hash_chain(&ledger.entries).errors;

        for (i, entry) in ledger.entries.iter().enumerate() {
            match self.check_entry_signature(entry) {
                Ok(()) => debug!(
                    index = i,
                    txn_id = %entry.transaction.txn_id,
                    "Signature verified"
                ),
                Err(cause) => {
                    warn!(
                        index = i,
                        txn_id = %entry.transaction.txn_id,
                        %cause,
                        "Signature rejected"
                    );
                    issues.push(IntegrityIssue {
                        entry_index: i,
                        kind: IssueKind::SignatureInvalid {
                            cause: cause.to_string(),
                        },
                    });
                }
            }
        }
        // Stable sort keeps hash, chain, signature order within an entry.
        issues.sort_by_key(|issue| issue.entry_index);

        let report = VerificationReport {
            receiver_id: ledger.receiver_id.clone(),
            total_entries: ledger.entries.len(),
            issues,
            duplicates: check_duplicates(&ledger.entries),
        };

        info!(
            receiver_id = %report.receiver_id,
            entries = report.total_entries,
            issues = report.issues.len(),
            duplicates = report.duplicates.duplicate_ids.len(),
            valid = report.is_valid(),
            "Ledger verified"
        );
        report
    }

    /// Verify and, on success, wrap the ledger as a [`VerifiedLedger`].
    pub fn admit(&self, ledger: Ledger) -> Result<VerifiedLedger, VerificationReport> {
        let report = self.verify(&ledger);
        if !report.is_valid() {
            return Err(report);
        }
        let digest = ledger_digest(&ledger);
        Ok(VerifiedLedger { ledger, digest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::LedgerBuilder;

    #[test]
    fn valid_ledger_is_admitted() {
        let ledger = LedgerBuilder::new("r1")
            .pay("alice", "bob", 10)
            .pay("carol", "bob", 4)
            .build();
        let verified = LedgerVerifier::default().admit(ledger.clone()).unwrap();
        assert_eq!(verified.entries().len(), 2);
        assert_eq!(verified.receiver_id(), "r1");
        assert_eq!(verified.digest(), ledger_digest(&ledger));
    }

    #[test]
    fn empty_ledger_is_not_admitted() {
        let ledger = LedgerBuilder::new("r1").build();
        let report = LedgerVerifier::default().admit(ledger).unwrap_err();
        assert!(report.is_empty_ledger());
        assert_eq!(report.errors(), vec!["Ledger is empty"]);
    }

    #[test]
    fn forged_signature_is_reported_with_cause() {
        let mut ledger = LedgerBuilder::new("r1")
            .pay("alice", "bob", 10)
            .pay("alice", "bob", 20)
            .build();
        let other = ledger.entries[0].transaction.signature.clone();
        ledger.entries[1].transaction.signature = other;

        let report = LedgerVerifier::default().verify(&ledger);
        assert!(!report.is_valid());
        assert!(report.chain_valid());
        assert!(!report.signatures_valid());
        assert_eq!(
            report.errors(),
            vec!["Entry 1: Transaction signature invalid (signature does not match)"]
        );
    }

    #[test]
    fn issues_are_ordered_by_entry() {
        let mut ledger = LedgerBuilder::new("r1")
            .pay("alice", "bob", 10)
            .pay("alice", "bob", 20)
            .build();
        ledger.entries[0].transaction.signature = "AAAA".into();
        ledger.entries[1].transaction.amount = offpay_types::Amount::from_units(99);

        let report = LedgerVerifier::default().verify(&ledger);
        let indices: Vec<usize> = report.issues.iter().map(|i| i.entry_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn duplicates_invalidate_an_otherwise_clean_ledger() {
        let ledger = LedgerBuilder::new("r1")
            .pay_with_id("A", "alice", "bob", 1)
            .pay_with_id("B", "alice", "bob", 2)
            .pay_with_id("A", "alice", "bob", 1)
            .build();
        let report = LedgerVerifier::default().verify(&ledger);
        assert!(report.issues.is_empty());
        assert!(!report.is_valid());
        assert_eq!(report.errors(), vec!["Duplicate transactions found: A"]);
    }

    #[test]
    fn keyless_entries_get_structural_check_by_default() {
        let ledger = LedgerBuilder::new("r1")
            .without_sender_keys()
            .pay("alice", "bob", 10)
            .build();
        assert!(LedgerVerifier::default().verify(&ledger).is_valid());
    }

    #[test]
    fn keyless_entries_rejected_when_keys_required() {
        let ledger = LedgerBuilder::new("r1")
            .without_sender_keys()
            .pay("alice", "bob", 10)
            .build();
        let verifier = LedgerVerifier::new(VerificationConfig {
            require_sender_keys: true,
        });
        let report = verifier.verify(&ledger);
        assert!(!report.is_valid());
        assert!(report.errors()[0].contains("no sender public key"));
    }

    #[test]
    fn keyless_short_signature_fails_structural_check() {
        let mut ledger = LedgerBuilder::new("r1")
            .without_sender_keys()
            .pay("alice", "bob", 10)
            .build();
        ledger.entries[0].transaction.signature = "c2hvcnQ=".into();
        assert!(!LedgerVerifier::default().verify(&ledger).is_valid());
    }
}

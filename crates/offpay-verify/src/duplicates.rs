//! Duplicate `txn_id` detection within one batch.

use std::collections::{BTreeSet, HashSet};

use offpay_types::LedgerEntry;

/// Transaction ids seen more than once in a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    pub duplicate_ids: BTreeSet<String>,
}

impl DuplicateReport {
    #[must_use]
    pub fn no_duplicates(&self) -> bool {
        self.duplicate_ids.is_empty()
    }

    /// `Duplicate transactions found: a, b`, or `None` when clean.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        if self.no_duplicates() {
            return None;
        }
        let ids: Vec<&str> = self.duplicate_ids.iter().map(String::as_str).collect();
        Some(format!("Duplicate transactions found: {}", ids.join(", ")))
    }
}

/// Single pass over `entries`, collecting every `txn_id` seen twice or more.
#[must_use]
pub fn check_duplicates(entries: &[LedgerEntry]) -> DuplicateReport {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
    let mut report = DuplicateReport::default();
    for entry in entries {
        let id = entry.transaction.txn_id.as_str();
        if !seen.insert(id) {
            report.duplicate_ids.insert(id.to_string());
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::LedgerBuilder;

    #[test]
    fn unique_ids_are_clean() {
        let ledger = LedgerBuilder::new("r").pay("a", "b", 1).pay("a", "b", 2).build();
        let report = check_duplicates(&ledger.entries);
        assert!(report.no_duplicates());
        assert_eq!(report.message(), None);
    }

    #[test]
    fn repeated_id_is_reported_once() {
        let ledger = LedgerBuilder::new("r")
            .pay_with_id("A", "a", "b", 1)
            .pay_with_id("B", "a", "b", 2)
            .pay_with_id("A", "a", "b", 1)
            .pay_with_id("A", "a", "b", 1)
            .build();
        let report = check_duplicates(&ledger.entries);
        assert_eq!(report.duplicate_ids.len(), 1);
        assert!(report.duplicate_ids.contains("A"));
        assert_eq!(
            report.message().as_deref(),
            Some("Duplicate transactions found: A")
        );
    }

    #[test]
    fn several_duplicates_are_sorted() {
        let ledger = LedgerBuilder::new("r")
            .pay_with_id("z", "a", "b", 1)
            .pay_with_id("m", "a", "b", 1)
            .pay_with_id("z", "a", "b", 1)
            .pay_with_id("m", "a", "b", 1)
            .build();
        assert_eq!(
            check_duplicates(&ledger.entries).message().as_deref(),
            Some("Duplicate transactions found: m, z")
        );
    }

    #[test]
    fn empty_is_clean() {
        assert!(check_duplicates(&[]).no_duplicates());
    }
}

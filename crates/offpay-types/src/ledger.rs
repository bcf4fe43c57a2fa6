//! Receiver ledger model.
//!
//! A receiver appends every transaction it accepts to a local, append-only
//! ledger. Each [`LedgerEntry`] commits to its predecessor:
//!
//! ```text
//! entry[0].hash = SHA256("GENESIS"        + txn[0].hash)
//! entry[i].hash = SHA256(entry[i-1].hash + txn[i].hash)
//! ```
//!
//! The chain of entry hashes, not the transaction hashes alone, is what
//! proves the receiver did not reorder, insert, or drop entries.

use serde::{Deserialize, Serialize};

use crate::{Transaction, constants};

fn default_entry_status() -> String {
    constants::DEFAULT_ENTRY_STATUS.to_string()
}

/// One position in a receiver's append-only ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// 0-based position in the ledger.
    pub ledger_index: u64,
    pub transaction: Transaction,
    /// Entry hash linking this entry to its predecessor.
    pub hash: String,
    #[serde(default = "default_entry_status")]
    pub status: String,
}

/// A complete ledger export from one receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub receiver_id: String,
    /// Entries in `ledger_index` order. Order is semantically meaningful.
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub exported_at: String,
}

impl Ledger {
    /// Wrap a bare entry list that arrived without receiver metadata.
    #[must_use]
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            receiver_id: constants::UNKNOWN_RECEIVER.to_string(),
            entries,
            exported_at: String::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Transaction ids in ledger order.
    #[must_use]
    pub fn txn_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.transaction.txn_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{
        "ledger_index": 0,
        "transaction": {"txn_id":"t1","from_id":"a","to_id":"b","amount":1,"hash":"h","signature":"s"},
        "hash": "e"
    }"#;

    #[test]
    fn entry_status_defaults_to_pending() {
        let entry: LedgerEntry = serde_json::from_str(ENTRY).unwrap();
        assert_eq!(entry.status, "pending");
    }

    #[test]
    fn from_entries_uses_unknown_receiver() {
        let entry: LedgerEntry = serde_json::from_str(ENTRY).unwrap();
        let ledger = Ledger::from_entries(vec![entry]);
        assert_eq!(ledger.receiver_id, "unknown");
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.txn_ids(), vec!["t1".to_string()]);
    }

    #[test]
    fn ledger_serde_roundtrip() {
        let entry: LedgerEntry = serde_json::from_str(ENTRY).unwrap();
        let ledger = Ledger {
            receiver_id: "r1".into(),
            entries: vec![entry],
            exported_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&ledger).unwrap();
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(ledger, back);
    }
}

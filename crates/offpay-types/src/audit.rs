//! Audit log model.
//!
//! Audit entries are write-only: nothing in verification or settlement
//! reads them back to make a decision.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuditLogId, constants};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    VerifyLedger,
    Settle,
    /// A settle upload that could not be decoded or decrypted.
    SettleLedger,
    SettleLedgerBatch,
    DecryptBundle,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VerifyLedger => write!(f, "verify_ledger"),
            Self::Settle => write!(f, "settle"),
            Self::SettleLedger => write!(f, "settle_ledger"),
            Self::SettleLedgerBatch => write!(f, "settle_ledger_batch"),
            Self::DecryptBundle => write!(f, "decrypt_bundle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
    Partial,
    Error,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Partial => write!(f, "partial"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub actor: String,
    pub action: AuditAction,
    pub txn_id: Option<String>,
    pub status: AuditStatus,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// New entry written by the bank actor, timestamped now.
    #[must_use]
    pub fn bank(action: AuditAction, status: AuditStatus, details: serde_json::Value) -> Self {
        Self {
            id: AuditLogId::new(),
            actor: constants::BANK_ACTOR.to_string(),
            action,
            txn_id: None,
            status,
            details,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_txn(mut self, txn_id: impl Into<String>) -> Self {
        self.txn_id = Some(txn_id.into());
        self
    }

    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuditAction::SettleLedgerBatch).unwrap(),
            "\"settle_ledger_batch\""
        );
        assert_eq!(AuditAction::VerifyLedger.to_string(), "verify_ledger");
        assert_eq!(AuditAction::SettleLedger.to_string(), "settle_ledger");
    }

    #[test]
    fn bank_entry_builder() {
        let entry = AuditLogEntry::bank(
            AuditAction::Settle,
            AuditStatus::Success,
            serde_json::json!({"amount": 5}),
        )
        .with_txn("t1");
        assert_eq!(entry.actor, "bank");
        assert_eq!(entry.txn_id.as_deref(), Some("t1"));
        assert_eq!(entry.status.to_string(), "success");
    }
}

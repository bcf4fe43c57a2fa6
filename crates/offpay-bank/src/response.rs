//! Response bodies returned to receivers and operators.

use offpay_types::AuditLogEntry;
use serde::{Deserialize, Serialize};

/// Result of `/verify-ledger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerVerificationResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    /// Every `txn_id` of the ledger when it verified, otherwise empty.
    #[serde(default)]
    pub verified_transactions: Vec<String>,
}

impl LedgerVerificationResponse {
    #[must_use]
    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
            verified_transactions: Vec::new(),
        }
    }
}

/// Result of `/settle-ledger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResponse {
    /// `true` if at least one transaction settled.
    pub settled: bool,
    pub settled_transactions: Vec<String>,
    pub errors: Vec<String>,
    #[serde(default)]
    pub audit_log_ids: Vec<String>,
}

impl SettlementResponse {
    #[must_use]
    pub fn refused(errors: Vec<String>) -> Self {
        Self {
            settled: false,
            settled_transactions: Vec::new(),
            errors,
            audit_log_ids: Vec::new(),
        }
    }
}

/// One page of `/bank-logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogPage {
    pub logs: Vec<AuditLogEntry>,
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
}

//! Identifiers used throughout OffPay.
//!
//! Bank-owned entity IDs use UUIDv7 for time-ordered lexicographic sorting.
//! `WalletId` wraps the external string reference carried inside offline
//! transactions, since the bank never mints it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Internal identifier of a bank customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// WalletId
// ---------------------------------------------------------------------------

/// Reference to an escrow account, as carried by offline transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub String);

impl WalletId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wallet:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SettlementRecordId
// ---------------------------------------------------------------------------

/// Identifier of a durable settlement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SettlementRecordId(pub Uuid);

impl SettlementRecordId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SettlementRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SettlementRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stl:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AuditLogId
// ---------------------------------------------------------------------------

/// Identifier of an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

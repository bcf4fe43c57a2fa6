//! Settlement records.
//!
//! A [`SettlementRecord`] is the durable proof that a transaction moved
//! money. Its `txn_id` is unique in the store; the record's existence is
//! the replay key.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, SettlementRecordId, UserId, WalletId};

/// Which side of a transaction a bank id was resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Sender,
    Receiver,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => write!(f, "sender"),
            Self::Receiver => write!(f, "receiver"),
        }
    }
}

/// Durable record of one settled transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub record_id: SettlementRecordId,
    pub txn_id: String,
    /// `None` only on the unescrowed (audit-only) path.
    pub wallet_id: Option<WalletId>,
    pub from_user_id: Option<UserId>,
    pub to_user_id: Option<UserId>,
    pub amount: Amount,
    pub ledger_index: u64,
    pub receiver_id: String,
    pub settled_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Whether this record debited an escrow wallet.
    #[must_use]
    pub fn is_escrowed(&self) -> bool {
        self.wallet_id.is_some()
    }
}

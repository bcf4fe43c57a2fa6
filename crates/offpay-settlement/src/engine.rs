//! Settlement engine.
//!
//! Settles each transaction of a verified ledger independently:
//! 1. Reject negative amounts
//! 2. Replay check (an existing settlement record wins)
//! 3. Escrow check on the named wallet
//! 4. Resolve sender and receiver bank ids to users; the sender must own
//!    the wallet
//! 5. Commit the record and the escrow debit
//! 6. Append a `settle` audit entry
//!
//! A failing transaction is recorded in the outcome and the batch moves on.
//! Records already committed stay committed, so re-submitting a batch only
//! settles what is left.

use std::sync::Arc;

use chrono::Utc;
use offpay_types::{
    AuditAction, AuditLogEntry, AuditLogId, AuditStatus, LedgerEntry, OffpayError,
    ParticipantRole, Result, SettlementConfig, SettlementRecord, SettlementRecordId, UserId,
    WalletId, constants,
};
use offpay_verify::VerifiedLedger;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    store::{AuditSink, SettlementStore},
    wallet_lock::WalletLocks,
};

/// A transaction the engine refused to settle.
#[derive(Debug)]
pub struct TxnRejection {
    pub txn_id: String,
    pub ledger_index: u64,
    pub error: OffpayError,
}

impl TxnRejection {
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    #[must_use]
    pub fn is_replay(&self) -> bool {
        matches!(self.error, OffpayError::ReplayDetected(_))
    }
}

/// Result of settling one ledger.
#[derive(Debug, Default)]
pub struct SettlementOutcome {
    pub receiver_id: String,
    pub total_transactions: usize,
    /// `txn_id`s settled by this call, in ledger order.
    pub settled_ids: Vec<String>,
    pub errors: Vec<TxnRejection>,
    pub record_ids: Vec<SettlementRecordId>,
    /// Per-transaction `settle` audit entries that were written.
    pub audit_log_ids: Vec<AuditLogId>,
    /// The `settle_ledger_batch` summary entry, if the sink accepted it.
    pub summary_log_id: Option<AuditLogId>,
}

impl SettlementOutcome {
    #[must_use]
    pub fn settled_any(&self) -> bool {
        !self.settled_ids.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Batch status: `success` with no rejections, `partial` when some
    /// transactions settled, `failed` when none did.
    #[must_use]
    pub fn status(&self) -> AuditStatus {
        if self.is_complete() {
            AuditStatus::Success
        } else if self.settled_any() {
            AuditStatus::Partial
        } else {
            AuditStatus::Failed
        }
    }

    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(TxnRejection::message).collect()
    }
}

/// Applies verified ledgers to a [`SettlementStore`].
pub struct SettlementEngine {
    store: Arc<dyn SettlementStore>,
    audit: Arc<dyn AuditSink>,
    config: SettlementConfig,
    locks: WalletLocks,
    actor: String,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn SettlementStore>,
        audit: Arc<dyn AuditSink>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            audit,
            config,
            locks: WalletLocks::new(),
            actor: constants::BANK_ACTOR.to_string(),
        }
    }

    /// Actor recorded on audit entries.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settle every entry of `ledger`. Never fails as a whole; per-entry
    /// failures land in [`SettlementOutcome::errors`].
    pub fn settle(&self, ledger: &VerifiedLedger) -> SettlementOutcome {
        let receiver_id = ledger.receiver_id();
        let mut outcome = SettlementOutcome {
            receiver_id: receiver_id.to_string(),
            total_transactions: ledger.entries().len(),
            ..SettlementOutcome::default()
        };

        for entry in ledger.entries() {
            let txn_id = &entry.transaction.txn_id;
            match self.settle_entry(receiver_id, entry) {
                Ok(record) => {
                    debug!(
                        %txn_id,
                        amount = %record.amount,
                        escrowed = record.is_escrowed(),
                        "Transaction settled"
                    );
                    if let Some(id) = self.audit_settled(&record, entry) {
                        outcome.audit_log_ids.push(id);
                    }
                    outcome.settled_ids.push(record.txn_id);
                    outcome.record_ids.push(record.record_id);
                }
                Err(error) => {
                    warn!(%txn_id, ledger_index = entry.ledger_index, %error, "Settlement rejected");
                    outcome.errors.push(TxnRejection {
                        txn_id: txn_id.clone(),
                        ledger_index: entry.ledger_index,
                        error,
                    });
                }
            }
        }

        outcome.summary_log_id = self.audit_batch(&outcome);
        info!(
            %receiver_id,
            total = outcome.total_transactions,
            settled = outcome.settled_ids.len(),
            rejected = outcome.errors.len(),
            status = %outcome.status(),
            "Ledger settlement finished"
        );
        outcome
    }

    fn settle_entry(&self, receiver_id: &str, entry: &LedgerEntry) -> Result<SettlementRecord> {
        let txn = &entry.transaction;
        if txn.amount.is_negative() {
            return Err(OffpayError::InvalidAmount {
                txn_id: txn.txn_id.clone(),
                amount: txn.amount,
            });
        }

        match &txn.wallet_id {
            Some(wallet_id) if self.store.provides_atomic_commit() => {
                self.settle_escrowed(receiver_id, entry, wallet_id)
            }
            Some(wallet_id) => self.locks.with_lock(wallet_id, || {
                self.settle_escrowed(receiver_id, entry, wallet_id)
            }),
            None => self.settle_unescrowed(receiver_id, entry),
        }
    }

    fn ensure_not_settled(&self, txn_id: &str) -> Result<()> {
        if self.store.find_settlement(txn_id)?.is_some() {
            return Err(OffpayError::ReplayDetected(txn_id.to_string()));
        }
        Ok(())
    }

    fn settle_escrowed(
        &self,
        receiver_id: &str,
        entry: &LedgerEntry,
        wallet_id: &WalletId,
    ) -> Result<SettlementRecord> {
        let txn = &entry.transaction;
        self.ensure_not_settled(&txn.txn_id)?;

        let wallet = self
            .store
            .get_wallet(wallet_id)?
            .ok_or_else(|| OffpayError::WalletNotFound(wallet_id.clone()))?;
        if !wallet.is_approved() {
            return Err(OffpayError::WalletNotApproved {
                wallet_id: wallet_id.clone(),
                status: wallet.status,
            });
        }
        if !wallet.covers(txn.amount) {
            return Err(OffpayError::InsufficientEscrow {
                wallet_id: wallet_id.clone(),
                needed: txn.amount,
                locked: wallet.locked_amount,
            });
        }

        let from = self.resolve(&txn.from_id, ParticipantRole::Sender)?;
        if wallet.owner_user_id != from {
            return Err(OffpayError::WalletOwnerMismatch {
                wallet_id: wallet_id.clone(),
                from_id: txn.from_id.clone(),
            });
        }
        let to = self.resolve(&txn.to_id, ParticipantRole::Receiver)?;

        let record = new_record(receiver_id, entry, Some(wallet_id.clone()), Some(from), Some(to));
        self.store.commit_escrow_settlement(record.clone())?;
        Ok(record)
    }

    fn settle_unescrowed(&self, receiver_id: &str, entry: &LedgerEntry) -> Result<SettlementRecord> {
        let txn = &entry.transaction;
        self.ensure_not_settled(&txn.txn_id)?;
        if !self.config.allow_unescrowed {
            return Err(OffpayError::MissingWallet(txn.txn_id.clone()));
        }
        let record = new_record(receiver_id, entry, None, None, None);
        self.store.insert_settlement(record.clone())?;
        Ok(record)
    }

    fn resolve(&self, bank_id: &str, role: ParticipantRole) -> Result<UserId> {
        self.store
            .resolve_user_by_bank_id(bank_id, role)?
            .ok_or_else(|| OffpayError::UnresolvedParticipant {
                bank_id: bank_id.to_string(),
                role,
            })
    }

    fn append_audit(&self, entry: AuditLogEntry) -> Option<AuditLogId> {
        let entry = entry.with_actor(self.actor.as_str());
        match self.audit.append(&entry) {
            Ok(()) => Some(entry.id),
            Err(error) => {
                warn!(action = %entry.action, %error, "Audit append failed");
                None
            }
        }
    }

    fn audit_settled(&self, record: &SettlementRecord, entry: &LedgerEntry) -> Option<AuditLogId> {
        let txn = &entry.transaction;
        let details = json!({
            "txn_id": txn.txn_id,
            "from_id": txn.from_id,
            "to_id": txn.to_id,
            "amount": txn.amount.json_number(),
            "receiver_id": record.receiver_id,
            "ledger_index": entry.ledger_index,
            "wallet_id": record.wallet_id,
            "record_id": record.record_id.to_string(),
        });
        self.append_audit(
            AuditLogEntry::bank(AuditAction::Settle, AuditStatus::Success, details)
                .with_txn(txn.txn_id.as_str()),
        )
    }

    fn audit_batch(&self, outcome: &SettlementOutcome) -> Option<AuditLogId> {
        let details = json!({
            "receiver_id": outcome.receiver_id,
            "total_transactions": outcome.total_transactions,
            "settled_count": outcome.settled_ids.len(),
            "errors": outcome.error_messages(),
        });
        self.append_audit(AuditLogEntry::bank(
            AuditAction::SettleLedgerBatch,
            outcome.status(),
            details,
        ))
    }
}

fn new_record(
    receiver_id: &str,
    entry: &LedgerEntry,
    wallet_id: Option<WalletId>,
    from_user_id: Option<UserId>,
    to_user_id: Option<UserId>,
) -> SettlementRecord {
    SettlementRecord {
        record_id: SettlementRecordId::new(),
        txn_id: entry.transaction.txn_id.clone(),
        wallet_id,
        from_user_id,
        to_user_id,
        amount: entry.transaction.amount,
        ledger_index: entry.ledger_index,
        receiver_id: receiver_id.to_string(),
        settled_at: Utc::now(),
    }
}

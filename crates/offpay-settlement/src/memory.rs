//! In-memory settlement store and audit sink.
//!
//! All state sits behind one `parking_lot::Mutex`, so every trait method is
//! atomic on its own. [`MemoryStore::non_atomic`] deliberately splits the
//! escrow commit into two lock acquisitions, standing in for a backend that
//! cannot insert and debit in one transaction.

use std::collections::HashMap;

use offpay_types::{
    Amount, AuditLogEntry, EscrowAccount, ParticipantRole, SettlementRecord, UserId, WalletId,
};
use parking_lot::Mutex;

use crate::store::{AuditSink, SettlementStore, StoreError};

#[derive(Debug, Default)]
struct State {
    settlements: HashMap<String, SettlementRecord>,
    wallets: HashMap<WalletId, EscrowAccount>,
    participants: HashMap<String, UserId>,
    audit: Vec<AuditLogEntry>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    atomic_commit: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            atomic_commit: true,
        }
    }

    /// Store whose escrow commit is two separate steps.
    #[must_use]
    pub fn non_atomic() -> Self {
        Self {
            atomic_commit: false,
            ..Self::new()
        }
    }

    /// Create or replace an escrow wallet.
    pub fn open_wallet(&self, account: EscrowAccount) {
        self.state
            .lock()
            .wallets
            .insert(account.wallet_id.clone(), account);
    }

    /// Register `bank_id` as a user and return the new user's id.
    /// Registering the same bank id again returns the existing user.
    pub fn register_participant(&self, bank_id: impl Into<String>) -> UserId {
        *self
            .state
            .lock()
            .participants
            .entry(bank_id.into())
            .or_insert_with(UserId::new)
    }

    #[must_use]
    pub fn wallet(&self, wallet_id: &WalletId) -> Option<EscrowAccount> {
        self.state.lock().wallets.get(wallet_id).cloned()
    }

    #[must_use]
    pub fn settlement(&self, txn_id: &str) -> Option<SettlementRecord> {
        self.state.lock().settlements.get(txn_id).cloned()
    }

    #[must_use]
    pub fn settlement_count(&self) -> usize {
        self.state.lock().settlements.len()
    }

    /// Audit entries, newest first.
    #[must_use]
    pub fn audit_logs(&self, limit: usize, offset: usize) -> Vec<AuditLogEntry> {
        self.state
            .lock()
            .audit
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn audit_count(&self) -> usize {
        self.state.lock().audit.len()
    }
}

fn debit(
    wallets: &mut HashMap<WalletId, EscrowAccount>,
    wallet_id: &WalletId,
    amount: Amount,
) -> Result<EscrowAccount, StoreError> {
    let wallet = wallets
        .get_mut(wallet_id)
        .ok_or_else(|| StoreError::WalletNotFound(wallet_id.clone()))?;
    if !wallet.debit_locked(amount) {
        return Err(StoreError::InsufficientEscrow {
            wallet_id: wallet_id.clone(),
            needed: amount,
            locked: wallet.locked_amount,
        });
    }
    Ok(wallet.clone())
}

impl SettlementStore for MemoryStore {
    fn find_settlement(&self, txn_id: &str) -> Result<Option<SettlementRecord>, StoreError> {
        Ok(self.settlement(txn_id))
    }

    fn insert_settlement(&self, record: SettlementRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.settlements.contains_key(&record.txn_id) {
            return Err(StoreError::DuplicateKey(record.txn_id));
        }
        state.settlements.insert(record.txn_id.clone(), record);
        Ok(())
    }

    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<EscrowAccount>, StoreError> {
        Ok(self.wallet(wallet_id))
    }

    fn decrement_locked(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
    ) -> Result<EscrowAccount, StoreError> {
        debit(&mut self.state.lock().wallets, wallet_id, amount)
    }

    fn resolve_user_by_bank_id(
        &self,
        bank_id: &str,
        _role: ParticipantRole,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(self.state.lock().participants.get(bank_id).copied())
    }

    fn commit_escrow_settlement(&self, record: SettlementRecord) -> Result<(), StoreError> {
        let wallet_id = record.wallet_id.clone().ok_or_else(|| {
            StoreError::Backend(format!("escrow commit for {} without wallet", record.txn_id))
        })?;

        if !self.atomic_commit {
            let txn_id = record.txn_id.clone();
            let amount = record.amount;
            // Insert first: a duplicate must never reach the debit.
            self.insert_settlement(record)?;
            if let Err(err) = self.decrement_locked(&wallet_id, amount) {
                self.state.lock().settlements.remove(&txn_id);
                return Err(err);
            }
            return Ok(());
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.settlements.contains_key(&record.txn_id) {
            return Err(StoreError::DuplicateKey(record.txn_id));
        }
        debit(&mut state.wallets, &wallet_id, record.amount)?;
        state.settlements.insert(record.txn_id.clone(), record);
        Ok(())
    }

    fn provides_atomic_commit(&self) -> bool {
        self.atomic_commit
    }
}

impl AuditSink for MemoryStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), StoreError> {
        self.state.lock().audit.push(entry.clone());
        Ok(())
    }

    fn recent(&self, limit: usize, offset: usize) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self.audit_logs(limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use offpay_types::{AuditAction, AuditStatus, SettlementRecordId, WalletStatus};

    use super::*;

    fn store_with_wallet(locked: i64) -> (MemoryStore, WalletId) {
        let store = MemoryStore::new();
        let wallet_id = WalletId::new("w1");
        store.open_wallet(EscrowAccount::approved(
            wallet_id.clone(),
            UserId::new(),
            Amount::from_units(locked),
        ));
        (store, wallet_id)
    }

    fn record(txn_id: &str, wallet: Option<&WalletId>, units: i64) -> SettlementRecord {
        SettlementRecord {
            record_id: SettlementRecordId::new(),
            txn_id: txn_id.to_string(),
            wallet_id: wallet.cloned(),
            from_user_id: None,
            to_user_id: None,
            amount: Amount::from_units(units),
            ledger_index: 0,
            receiver_id: "r".into(),
            settled_at: Utc::now(),
        }
    }

    #[test]
    fn insert_then_duplicate() {
        let store = MemoryStore::new();
        store.insert_settlement(record("t1", None, 1)).unwrap();
        assert_eq!(
            store.insert_settlement(record("t1", None, 1)),
            Err(StoreError::DuplicateKey("t1".into()))
        );
        assert_eq!(store.settlement_count(), 1);
        assert!(store.find_settlement("t1").unwrap().is_some());
        assert!(store.find_settlement("t2").unwrap().is_none());
    }

    #[test]
    fn guarded_decrement() {
        let (store, w) = store_with_wallet(100);
        let after = store.decrement_locked(&w, Amount::from_units(60)).unwrap();
        assert_eq!(after.locked_amount, Amount::from_units(40));
        assert_eq!(after.used_amount, Amount::from_units(60));

        let err = store.decrement_locked(&w, Amount::from_units(41)).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientEscrow { .. }));
        assert_eq!(store.wallet(&w).unwrap().locked_amount, Amount::from_units(40));
    }

    #[test]
    fn decrement_unknown_wallet() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.decrement_locked(&WalletId::new("nope"), Amount::from_units(1)),
            Err(StoreError::WalletNotFound(_))
        ));
    }

    #[test]
    fn atomic_commit_is_all_or_nothing() {
        let (store, w) = store_with_wallet(10);
        let err = store
            .commit_escrow_settlement(record("t1", Some(&w), 11))
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientEscrow { .. }));
        assert_eq!(store.settlement_count(), 0);

        store.commit_escrow_settlement(record("t1", Some(&w), 10)).unwrap();
        assert_eq!(store.wallet(&w).unwrap().locked_amount, Amount::ZERO);

        let err = store
            .commit_escrow_settlement(record("t1", Some(&w), 0))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey("t1".into()));
    }

    #[test]
    fn commit_without_wallet_is_backend_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.commit_escrow_settlement(record("t1", None, 1)),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn non_atomic_store_advertises_it() {
        assert!(MemoryStore::new().provides_atomic_commit());
        let store = MemoryStore::non_atomic();
        assert!(!store.provides_atomic_commit());
    }

    #[test]
    fn non_atomic_commit_rolls_back_record_when_debit_fails() {
        let store = MemoryStore::non_atomic();
        let w = WalletId::new("w1");
        store.open_wallet(EscrowAccount::approved(w.clone(), UserId::new(), Amount::from_units(10)));

        let err = store
            .commit_escrow_settlement(record("t1", Some(&w), 11))
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientEscrow { .. }));
        assert_eq!(store.settlement_count(), 0);
        assert_eq!(store.wallet(&w).unwrap().locked_amount, Amount::from_units(10));

        store.commit_escrow_settlement(record("t1", Some(&w), 10)).unwrap();
        assert_eq!(store.settlement_count(), 1);
        assert_eq!(store.wallet(&w).unwrap().locked_amount, Amount::ZERO);
    }

    #[test]
    fn non_atomic_duplicate_never_debits() {
        let store = MemoryStore::non_atomic();
        let w = WalletId::new("w1");
        store.open_wallet(EscrowAccount::approved(w.clone(), UserId::new(), Amount::from_units(10)));

        store.commit_escrow_settlement(record("t1", Some(&w), 4)).unwrap();
        let err = store
            .commit_escrow_settlement(record("t1", Some(&w), 4))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey("t1".into()));
        assert_eq!(store.wallet(&w).unwrap().locked_amount, Amount::from_units(6));
    }

    #[test]
    fn participants_resolve_by_bank_id() {
        let store = MemoryStore::new();
        let alice = store.register_participant("alice");
        assert_eq!(store.register_participant("alice"), alice);
        assert_eq!(
            store
                .resolve_user_by_bank_id("alice", ParticipantRole::Sender)
                .unwrap(),
            Some(alice)
        );
        assert_eq!(
            store
                .resolve_user_by_bank_id("mallory", ParticipantRole::Receiver)
                .unwrap(),
            None
        );
    }

    #[test]
    fn open_wallet_replaces() {
        let (store, w) = store_with_wallet(5);
        let mut pending = store.wallet(&w).unwrap();
        pending.status = WalletStatus::Pending;
        store.open_wallet(pending);
        assert!(!store.get_wallet(&w).unwrap().unwrap().is_approved());
    }

    #[test]
    fn audit_logs_newest_first_with_paging() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let entry = AuditLogEntry::bank(
                AuditAction::Settle,
                AuditStatus::Success,
                serde_json::json!({ "n": i }),
            );
            store.append(&entry).unwrap();
        }
        assert_eq!(store.audit_count(), 5);
        let page = store.audit_logs(2, 1);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].details["n"], 3);
        assert_eq!(page[1].details["n"], 2);
        assert!(store.audit_logs(10, 5).is_empty());
    }
}

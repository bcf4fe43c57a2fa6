//! Test fixtures: signed, correctly chained ledgers.
//!
//! Available under `#[cfg(test)]` and the `test-helpers` feature.

use std::collections::HashMap;

use offpay_types::{Amount, EcPublicJwk, Ledger, LedgerEntry, Transaction, WalletId, constants};
use p256::{PublicKey, ecdsa::SigningKey};
use rand::rngs::OsRng;

use crate::{
    canonical::transaction_hash,
    chain::entry_hash,
    signature::{JwkKey, sign_hash},
};

/// Builds a receiver ledger the way a receiver device would append to it.
///
/// Each sender gets its own random signing key and personal `prev_hash`
/// chain. Wallets are attached per sender with [`LedgerBuilder::with_wallet`].
pub struct LedgerBuilder {
    receiver_id: String,
    entries: Vec<LedgerEntry>,
    signers: HashMap<String, SigningKey>,
    sender_heads: HashMap<String, String>,
    wallets: HashMap<String, WalletId>,
    include_keys: bool,
}

impl LedgerBuilder {
    #[must_use]
    pub fn new(receiver_id: impl Into<String>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            entries: Vec::new(),
            signers: HashMap::new(),
            sender_heads: HashMap::new(),
            wallets: HashMap::new(),
            include_keys: true,
        }
    }

    /// Omit `sender_public_key` from subsequent transactions.
    #[must_use]
    pub fn without_sender_keys(mut self) -> Self {
        self.include_keys = false;
        self
    }

    /// Settle `sender`'s subsequent payments against `wallet`.
    #[must_use]
    pub fn with_wallet(mut self, sender: &str, wallet: impl Into<String>) -> Self {
        self.wallets.insert(sender.to_string(), WalletId::new(wallet));
        self
    }

    /// Append a payment with a generated `txn_id`.
    #[must_use]
    pub fn pay(self, from: &str, to: &str, units: i64) -> Self {
        let txn_id = format!("{}-txn-{}", self.receiver_id, self.entries.len());
        self.pay_amount(&txn_id, from, to, Amount::from_units(units))
    }

    /// Append a payment with an explicit `txn_id`.
    #[must_use]
    pub fn pay_with_id(self, txn_id: &str, from: &str, to: &str, units: i64) -> Self {
        self.pay_amount(txn_id, from, to, Amount::from_units(units))
    }

    /// Append a payment of an arbitrary amount.
    #[must_use]
    pub fn pay_amount(mut self, txn_id: &str, from: &str, to: &str, amount: Amount) -> Self {
        let key = self
            .signers
            .entry(from.to_string())
            .or_insert_with(|| SigningKey::random(&mut OsRng))
            .clone();
        let prev_hash = self.sender_heads.get(from).cloned();

        let mut txn = Transaction {
            txn_id: txn_id.to_string(),
            from_id: from.to_string(),
            to_id: to.to_string(),
            amount,
            timestamp: format!("2026-01-01T00:00:{:02}Z", self.entries.len() % 60),
            prev_hash,
            hash: String::new(),
            signature: String::new(),
            sender_public_key: self.include_keys.then(|| public_jwk(&key)),
            wallet_id: self.wallets.get(from).cloned(),
        };
        sign_transaction(&mut txn, &key);
        self.sender_heads.insert(from.to_string(), txn.hash.clone());

        let prev_entry = self
            .entries
            .last()
            .map_or(constants::GENESIS_ANCHOR, |e| e.hash.as_str());
        let hash = entry_hash(prev_entry, &txn.hash);
        self.entries.push(LedgerEntry {
            ledger_index: self.entries.len() as u64,
            transaction: txn,
            hash,
            status: constants::DEFAULT_ENTRY_STATUS.to_string(),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Ledger {
        Ledger {
            receiver_id: self.receiver_id,
            entries: self.entries,
            exported_at: "2026-01-01T00:01:00Z".to_string(),
        }
    }
}

/// JWK of a signing key's public half, tagged as a verification key.
#[must_use]
pub fn public_jwk(key: &SigningKey) -> EcPublicJwk {
    EcPublicJwk::from_public_key(&PublicKey::from(key.verifying_key())).for_signing()
}

/// Recompute `hash` and `signature` after a field was changed.
pub fn sign_transaction(txn: &mut Transaction, key: &SigningKey) {
    txn.hash = transaction_hash(txn);
    txn.signature = sign_hash(&txn.hash, key).unwrap_or_default();
}

/// Recompute every entry hash so the chain is consistent again.
pub fn rechain(entries: &mut [LedgerEntry]) {
    let mut prev = constants::GENESIS_ANCHOR.to_string();
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.ledger_index = i as u64;
        entry.hash = entry_hash(&prev, &entry.transaction.hash);
        prev.clone_from(&entry.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LedgerVerifier, verify_transaction_hash};

    #[test]
    fn sender_chain_links_prev_hash() {
        let ledger = LedgerBuilder::new("r")
            .pay("alice", "bob", 1)
            .pay("carol", "bob", 2)
            .pay("alice", "bob", 3)
            .build();
        let first_alice = &ledger.entries[0].transaction;
        let second_alice = &ledger.entries[2].transaction;
        assert_eq!(first_alice.prev_hash, None);
        assert_eq!(second_alice.prev_hash.as_deref(), Some(first_alice.hash.as_str()));
        assert_eq!(ledger.entries[1].transaction.prev_hash, None);
    }

    #[test]
    fn wallets_attach_per_sender() {
        let ledger = LedgerBuilder::new("r")
            .with_wallet("alice", "w-alice")
            .pay("alice", "bob", 1)
            .pay("carol", "bob", 1)
            .build();
        assert_eq!(
            ledger.entries[0].transaction.wallet_id,
            Some(WalletId::new("w-alice"))
        );
        assert_eq!(ledger.entries[1].transaction.wallet_id, None);
    }

    #[test]
    fn resigned_and_rechained_forgery_passes_hash_checks_but_not_other_keys() {
        let builder = LedgerBuilder::new("r").pay("alice", "bob", 10);
        let forger = SigningKey::random(&mut OsRng);
        let mut ledger = builder.build();
        ledger.entries[0].transaction.amount = Amount::from_units(1000);
        sign_transaction(&mut ledger.entries[0].transaction, &forger);
        rechain(&mut ledger.entries);

        assert!(verify_transaction_hash(&ledger.entries[0].transaction));
        let report = LedgerVerifier::default().verify(&ledger);
        assert!(report.chain_valid());
        assert!(!report.signatures_valid());
    }
}

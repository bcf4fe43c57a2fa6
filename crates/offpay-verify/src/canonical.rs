//! Canonical hashing.
//!
//! The transaction hash is computed independently by the sender device and
//! by the bank, so the encoding is fixed byte for byte: compact JSON, keys in
//! the order `txn_id, from_id, to_id, amount, timestamp, prev_hash`, non-ASCII
//! characters emitted as raw UTF-8, and `amount` written the way a JS
//! `Number` prints.

use offpay_types::{Amount, Ledger, Transaction};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Field-ordered view of a transaction. Declaration order is wire order.
#[derive(Serialize)]
struct CanonicalTxn<'a> {
    txn_id: &'a str,
    from_id: &'a str,
    to_id: &'a str,
    amount: Amount,
    timestamp: &'a str,
    prev_hash: &'a str,
}

/// Lower-case hex SHA-256 of a UTF-8 string.
#[must_use]
pub fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// The canonical encoding of a transaction, before hashing.
#[must_use]
pub fn canonical_string(txn: &Transaction) -> String {
    let view = CanonicalTxn {
        txn_id: &txn.txn_id,
        from_id: &txn.from_id,
        to_id: &txn.to_id,
        amount: txn.amount,
        timestamp: &txn.timestamp,
        prev_hash: txn.prev_hash_or_empty(),
    };
    // A struct of strings and a JSON number cannot fail to serialize.
    serde_json::to_string(&view).unwrap_or_default()
}

/// Canonical hash of a transaction (lower-case hex).
#[must_use]
pub fn transaction_hash(txn: &Transaction) -> String {
    sha256_hex(&canonical_string(txn))
}

/// Whether the transaction's claimed `hash` matches its canonical hash.
#[must_use]
pub fn verify_transaction_hash(txn: &Transaction) -> bool {
    transaction_hash(txn) == txn.hash
}

/// SHA-256 over the canonical ledger serialization: object keys sorted
/// recursively, compact, absent optionals omitted.
///
/// This is the digest a receiver signs when it seals a ledger for transport.
#[must_use]
pub fn ledger_digest(ledger: &Ledger) -> String {
    // Through text: `to_value` rejects amounts wider than 64 bits.
    let value = serde_json::to_string(ledger)
        .and_then(|text| serde_json::from_str::<Value>(&text))
        .unwrap_or(Value::Null);
    let sorted = sort_keys(value);
    sha256_hex(&sorted.to_string())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

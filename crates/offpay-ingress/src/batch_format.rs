//! Inbound batch shapes.
//!
//! Receivers upload ledgers in several shapes. The JSON is classified once
//! here; nothing downstream inspects raw JSON again.
//!
//! | Shape | Detected by | Variant |
//! |---|---|---|
//! | `[entry, ...]` | top-level array | `PlainArray` |
//! | `{"ledger": {...}}` | `ledger` object | `WrappedLedger` |
//! | `{"receiver_id", "entries", ...}` | `entries` key | `WrappedLedger` |
//! | `{"ledger_index", "transaction", ...}` | both keys | one-element `PlainArray` |
//! | `{"encrypted_payload", ...}` or `{"bundle": {...}}` | payload key | `EncryptedBundle` |

use offpay_types::{Ledger, LedgerEntry, OffpayError, Result, constants};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::transport::{EncryptedBundle, SecureTransportCodec};

/// A decoded inbound batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchFormat {
    PlainArray(Vec<LedgerEntry>),
    WrappedLedger(Ledger),
    EncryptedBundle(EncryptedBundle),
}

fn default_receiver() -> String {
    constants::UNKNOWN_RECEIVER.to_string()
}

/// Ledger object as uploaded; receiver metadata may be missing.
#[derive(Deserialize)]
struct UploadedLedger {
    #[serde(default = "default_receiver")]
    receiver_id: String,
    #[serde(default)]
    entries: Vec<LedgerEntry>,
    #[serde(default)]
    exported_at: String,
}

impl From<UploadedLedger> for Ledger {
    fn from(raw: UploadedLedger) -> Self {
        Self {
            receiver_id: raw.receiver_id,
            entries: raw.entries,
            exported_at: raw.exported_at,
        }
    }
}

fn malformed(reason: impl Into<String>) -> OffpayError {
    OffpayError::MalformedBatch {
        reason: reason.into(),
    }
}

fn decode_as<T: for<'de> Deserialize<'de>>(what: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| malformed(format!("{what}: {e}")))
}

impl BatchFormat {
    /// Classify and decode an inbound JSON value.
    pub fn decode(value: &Value) -> Result<Self> {
        let format = match value {
            Value::Array(_) => Self::PlainArray(decode_as("entry array", value)?),
            Value::Object(map) => Self::decode_object(map)?,
            _ => return Err(malformed("Unable to parse ledger data format")),
        };
        debug!(kind = format.kind(), "Batch decoded");
        Ok(format)
    }

    /// Parse raw bytes, then [`decode`](Self::decode).
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
        Self::decode(&value)
    }

    fn decode_object(map: &Map<String, Value>) -> Result<Self> {
        if let Some(inner @ Value::Object(_)) = map.get("ledger") {
            let ledger: UploadedLedger = decode_as("ledger", inner)?;
            return Ok(Self::WrappedLedger(ledger.into()));
        }
        if let Some(inner @ Value::Object(_)) = map.get("bundle") {
            return Ok(Self::EncryptedBundle(decode_as("bundle", inner)?));
        }
        if map.contains_key("encrypted_payload") {
            let bundle = EncryptedBundle::deserialize(&Value::Object(map.clone()))
                .map_err(|e| malformed(format!("bundle: {e}")))?;
            return Ok(Self::EncryptedBundle(bundle));
        }
        if map.contains_key("ledger_index") && map.contains_key("transaction") {
            let entry = LedgerEntry::deserialize(&Value::Object(map.clone()))
                .map_err(|e| malformed(format!("ledger entry: {e}")))?;
            return Ok(Self::PlainArray(vec![entry]));
        }
        if map.contains_key("entries") {
            let ledger = UploadedLedger::deserialize(&Value::Object(map.clone()))
                .map_err(|e| malformed(format!("ledger: {e}")))?;
            return Ok(Self::WrappedLedger(ledger.into()));
        }
        Err(malformed("Unable to parse ledger data format"))
    }

    /// Short name of the shape, for logs and audit details.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlainArray(_) => "plain_array",
            Self::WrappedLedger(_) => "wrapped_ledger",
            Self::EncryptedBundle(_) => "encrypted_bundle",
        }
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::EncryptedBundle(_))
    }

    /// Resolve to a plaintext ledger, decrypting through `codec` if needed.
    pub fn into_ledger(self, codec: &SecureTransportCodec) -> Result<Ledger> {
        match self {
            Self::PlainArray(entries) => Ok(Ledger::from_entries(entries)),
            Self::WrappedLedger(ledger) => Ok(ledger),
            Self::EncryptedBundle(bundle) => Ok(codec.decrypt(&bundle)?),
        }
    }
}

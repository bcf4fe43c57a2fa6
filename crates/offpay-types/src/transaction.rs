//! Offline transaction model.
//!
//! A [`Transaction`] is created and signed by the sender's device while
//! offline, handed to a receiver, and eventually forwarded to the bank
//! inside a ledger export. The bank treats it as an immutable artifact.

use serde::{Deserialize, Serialize};

use crate::{Amount, WalletId, constants};

/// Elliptic-curve public key in JWK form, as exported by WebCrypto.
///
/// `kty`/`crv` and the coordinates default to empty strings so a malformed
/// key surfaces as a precise verification cause instead of a decode error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcPublicJwk {
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub crv: String,
    /// Base64url affine X coordinate.
    #[serde(default)]
    pub x: String,
    /// Base64url affine Y coordinate.
    #[serde(default)]
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
}

impl EcPublicJwk {
    /// A bare P-256 public key with no role metadata.
    #[must_use]
    pub fn p256(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            kty: constants::JWK_KTY_EC.to_string(),
            crv: constants::JWK_CRV_P256.to_string(),
            x: x.into(),
            y: y.into(),
            alg: None,
            key_use: None,
            key_ops: None,
            ext: Some(true),
        }
    }

    /// Mark this key as an ECDSA verification key (`alg: ES256`, `key_ops: ["verify"]`).
    #[must_use]
    pub fn for_signing(mut self) -> Self {
        self.alg = Some("ES256".to_string());
        self.key_ops = Some(vec!["verify".to_string()]);
        self
    }

    #[must_use]
    pub fn is_p256(&self) -> bool {
        self.kty == constants::JWK_KTY_EC && self.crv == constants::JWK_CRV_P256
    }

    /// Whether the key metadata says it belongs to a signature scheme rather
    /// than key agreement.
    #[must_use]
    pub fn is_signing_role(&self) -> bool {
        let alg_is_ecdsa = self
            .alg
            .as_deref()
            .is_some_and(|alg| alg.starts_with("ES"));
        let use_is_sig = self.key_use.as_deref() == Some("sig");
        let ops_are_sig = self
            .key_ops
            .as_ref()
            .is_some_and(|ops| ops.iter().any(|op| op == "sign" || op == "verify"));
        alg_is_ecdsa || use_is_sig || ops_are_sig
    }
}

/// A signed offline payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Globally unique transaction id chosen by the sender device.
    pub txn_id: String,
    /// Bank-scoped id of the paying participant.
    pub from_id: String,
    /// Bank-scoped id of the paid participant.
    pub to_id: String,
    #[serde(default)]
    pub amount: Amount,
    /// Sender-local timestamp. Informational only; never used for ordering.
    #[serde(default)]
    pub timestamp: String,
    /// Hash of the previous transaction in the sender's personal chain.
    #[serde(default)]
    pub prev_hash: Option<String>,
    /// Claimed canonical hash.
    pub hash: String,
    /// Base64 ECDSA signature over `hash`.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<EcPublicJwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<WalletId>,
}

impl Transaction {
    /// `prev_hash` with absent and empty normalized to `""`.
    #[must_use]
    pub fn prev_hash_or_empty(&self) -> &str {
        self.prev_hash.as_deref().unwrap_or_default()
    }
}

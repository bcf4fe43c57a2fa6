//! Confidential ledger transport.
//!
//! A receiver ships its ledger to the bank without any pre-shared channel:
//!
//! ```text
//! shared   = ECDH(receiver ephemeral secret, bank public)
//! wrap_key = HKDF-SHA256(shared, salt = none, info = "aes-key-wrapping")
//! encrypted_aes_key = base64(iv || AES-256-GCM(wrap_key, iv, payload_key))
//! encrypted_payload = base64(AES-256-GCM(payload_key, iv, envelope JSON))
//! envelope = { ledger, hash = ledger_digest(ledger), signature, sender_public_key }
//! ```
//!
//! The bank reverses each step. Every failure keeps its own cause so audit
//! logs can tell a wrong key from a tampered payload from a bad signature.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use hkdf::Hkdf;
use offpay_types::{EcPublicJwk, Ledger, OffpayError, constants};
use offpay_verify::{
    JwkKey, VerificationError, encoding, ledger_digest, sign_hash, verify_signature,
};
use p256::{PublicKey, SecretKey, ecdsa::SigningKey};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info};

use crate::key_provider::{BankKeypair, KeyError, KeyProvider};

/// Encrypted ledger as sent by a receiver.
///
/// Every member is optional at the decode layer so a missing one is
/// reported as [`TransportError::MissingField`] rather than a JSON error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBundle {
    #[serde(default)]
    pub encrypted_aes_key: Option<String>,
    #[serde(default)]
    pub receiver_public_key: Option<EcPublicJwk>,
    #[serde(default)]
    pub encrypted_payload: Option<String>,
    #[serde(default)]
    pub iv: Option<String>,
}

/// Plaintext inside an [`EncryptedBundle`]: the ledger plus the receiver's
/// signature over its canonical digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub ledger: Ledger,
    pub hash: String,
    pub signature: String,
    pub sender_public_key: EcPublicJwk,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("bundle is missing `{0}`")]
    MissingField(&'static str),

    #[error("receiver key is not a usable EC P-256 key: {0}")]
    UnsupportedKey(String),

    #[error("receiver key is a signing key (ECDSA), expected a key-agreement key (ECDH)")]
    SigningRoleKey,

    #[error("`{field}` is not valid: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("key mismatch: the wrapped AES key does not open with this bank key")]
    KeyMismatch,

    #[error("unwrapped AES key is {0} bytes, expected 32")]
    InvalidKeyLength(usize),

    #[error("payload failed authentication")]
    PayloadAuthentication,

    #[error("payload is not a signed ledger envelope: {0}")]
    PayloadDecode(String),

    #[error("envelope hash mismatch: claimed {claimed}, computed {computed}")]
    HashMismatch { claimed: String, computed: String },

    #[error("envelope signature invalid: {0}")]
    SignatureInvalid(VerificationError),

    #[error("sealing failed: {0}")]
    Sealing(String),
}

impl From<TransportError> for OffpayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::SignatureInvalid(cause) => Self::SignatureInvalid {
                reason: cause.to_string(),
            },
            other => Self::TransportFailure {
                reason: other.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

type AesKey = [u8; constants::AES_KEY_LEN];
type AesIv = [u8; constants::AES_GCM_IV_LEN];

fn wrapping_key(secret: &SecretKey, peer: &PublicKey) -> Result<AesKey, TransportError> {
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let hk = Hkdf::<Sha256>::new(None, shared.raw_secret_bytes());
    let mut okm = [0u8; constants::AES_KEY_LEN];
    hk.expand(constants::KEY_WRAP_INFO, &mut okm)
        .map_err(|e| TransportError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

fn aes_open(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    if iv.len() != constants::AES_GCM_IV_LEN {
        return None;
    }
    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    cipher.decrypt(Nonce::from_slice(iv), ciphertext).ok()
}

fn aes_seal(key: &AesKey, iv: &AesIv, plaintext: &[u8]) -> Result<Vec<u8>, TransportError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| TransportError::Sealing(e.to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| TransportError::Sealing("AES-GCM encryption failed".to_string()))
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, TransportError> {
    encoding::STANDARD
        .decode(value.trim())
        .map_err(|e| TransportError::InvalidEncoding {
            field,
            reason: e.to_string(),
        })
}

fn required<'a>(field: &'static str, value: Option<&'a String>) -> Result<&'a str, TransportError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.as_str()),
        _ => Err(TransportError::MissingField(field)),
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Opens encrypted bundles addressed to the bank.
#[derive(Debug, Clone)]
pub struct SecureTransportCodec {
    keypair: BankKeypair,
}

impl SecureTransportCodec {
    /// Build a codec around the provider's keypair, creating one if the
    /// provider has none yet.
    pub fn new(provider: &dyn KeyProvider) -> Result<Self, KeyError> {
        Ok(Self::from_keypair(provider.load_or_generate()?))
    }

    #[must_use]
    pub fn from_keypair(keypair: BankKeypair) -> Self {
        Self { keypair }
    }

    /// The key receivers must encrypt to.
    #[must_use]
    pub fn bank_public_jwk(&self) -> EcPublicJwk {
        self.keypair.public_jwk()
    }

    /// Decrypt a bundle and return the verified envelope.
    pub fn open(&self, bundle: &EncryptedBundle) -> Result<SignedEnvelope, TransportError> {
        let wrapped_b64 = required("encrypted_aes_key", bundle.encrypted_aes_key.as_ref())?;
        let receiver_jwk = bundle
            .receiver_public_key
            .as_ref()
            .ok_or(TransportError::MissingField("receiver_public_key"))?;
        let payload_b64 = required("encrypted_payload", bundle.encrypted_payload.as_ref())?;
        let iv_b64 = required("iv", bundle.iv.as_ref())?;

        if !receiver_jwk.is_p256() {
            return Err(TransportError::UnsupportedKey(format!(
                "kty={:?} crv={:?}",
                receiver_jwk.kty, receiver_jwk.crv
            )));
        }
        if receiver_jwk.is_signing_role() {
            return Err(TransportError::SigningRoleKey);
        }
        let receiver_public = receiver_jwk
            .to_public_key()
            .map_err(|e| TransportError::UnsupportedKey(e.to_string()))?;

        let wrapped = decode_field("encrypted_aes_key", wrapped_b64)?;
        if wrapped.len() <= constants::AES_GCM_IV_LEN {
            return Err(TransportError::InvalidEncoding {
                field: "encrypted_aes_key",
                reason: format!("{} bytes is too short to hold an IV and key", wrapped.len()),
            });
        }
        let (wrap_iv, wrapped_key) = wrapped.split_at(constants::AES_GCM_IV_LEN);
        let wrap_key = wrapping_key(self.keypair.secret(), &receiver_public)?;
        let payload_key =
            aes_open(&wrap_key, wrap_iv, wrapped_key).ok_or(TransportError::KeyMismatch)?;
        if payload_key.len() != constants::AES_KEY_LEN {
            return Err(TransportError::InvalidKeyLength(payload_key.len()));
        }

        let iv = decode_field("iv", iv_b64)?;
        if iv.len() != constants::AES_GCM_IV_LEN {
            return Err(TransportError::InvalidEncoding {
                field: "iv",
                reason: format!("expected {} bytes, got {}", constants::AES_GCM_IV_LEN, iv.len()),
            });
        }
        let payload = decode_field("encrypted_payload", payload_b64)?;
        let plaintext =
            aes_open(&payload_key, &iv, &payload).ok_or(TransportError::PayloadAuthentication)?;
        debug!(bytes = plaintext.len(), "Bundle payload decrypted");

        let envelope: SignedEnvelope = serde_json::from_slice(&plaintext)
            .map_err(|e| TransportError::PayloadDecode(e.to_string()))?;

        let computed = ledger_digest(&envelope.ledger);
        if computed != envelope.hash {
            return Err(TransportError::HashMismatch {
                claimed: envelope.hash,
                computed,
            });
        }
        verify_signature(&envelope.hash, &envelope.signature, &envelope.sender_public_key)
            .map_err(TransportError::SignatureInvalid)?;

        info!(
            receiver_id = %envelope.ledger.receiver_id,
            entries = envelope.ledger.entries.len(),
            "Encrypted bundle opened"
        );
        Ok(envelope)
    }

    /// Decrypt a bundle down to its ledger.
    pub fn decrypt(&self, bundle: &EncryptedBundle) -> Result<Ledger, TransportError> {
        self.open(bundle).map(|envelope| envelope.ledger)
    }
}

/// Receiver side: sign `ledger` with `signer` and encrypt it to the bank.
///
/// Uses a fresh ephemeral ECDH key, a random payload key, and random IVs on
/// every call.
pub fn seal_ledger(
    ledger: &Ledger,
    bank_public: &EcPublicJwk,
    signer: &SigningKey,
) -> Result<EncryptedBundle, TransportError> {
    let bank_key = bank_public
        .to_public_key()
        .map_err(|e| TransportError::UnsupportedKey(e.to_string()))?;

    let hash = ledger_digest(ledger);
    let signature = sign_hash(&hash, signer).map_err(|e| TransportError::Sealing(e.to_string()))?;
    let envelope = SignedEnvelope {
        ledger: ledger.clone(),
        hash,
        signature,
        sender_public_key: EcPublicJwk::from_public_key(&PublicKey::from(signer.verifying_key()))
            .for_signing(),
    };
    let plaintext =
        serde_json::to_vec(&envelope).map_err(|e| TransportError::Sealing(e.to_string()))?;

    let ephemeral = SecretKey::random(&mut OsRng);
    let wrap_key = wrapping_key(&ephemeral, &bank_key)?;
    let payload_key: AesKey = random_bytes();

    let wrap_iv: AesIv = random_bytes();
    let mut wrapped = wrap_iv.to_vec();
    wrapped.extend(aes_seal(&wrap_key, &wrap_iv, &payload_key)?);

    let payload_iv: AesIv = random_bytes();
    let payload = aes_seal(&payload_key, &payload_iv, &plaintext)?;

    Ok(EncryptedBundle {
        encrypted_aes_key: Some(encoding::STANDARD.encode(wrapped)),
        receiver_public_key: Some(EcPublicJwk::from_public_key(&ephemeral.public_key())),
        encrypted_payload: Some(encoding::STANDARD.encode(payload)),
        iv: Some(encoding::STANDARD.encode(payload_iv)),
    })
}

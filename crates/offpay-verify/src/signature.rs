//! ECDSA P-256 signature verification over transaction hashes.
//!
//! A sender device signs the hex transaction hash with WebCrypto
//! `ECDSA { hash: SHA-256 }`: the signed message is the 32 raw bytes the hex
//! decodes to, and the primitive hashes them once more. Signatures arrive as
//! base64 raw `r || s` (64 bytes); DER is accepted as well.

use base64::Engine;
use offpay_types::{EcPublicJwk, constants};
use p256::{
    EncodedPoint, FieldBytes, PublicKey,
    ecdsa::{
        Signature, SigningKey, VerifyingKey,
        signature::{Signer, Verifier},
    },
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
};
use thiserror::Error;

use crate::encoding;

/// Why a signature (or the key it is checked against) was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("unsupported key type: kty={kty:?} crv={crv:?} (expected EC P-256)")]
    UnsupportedKey { kty: String, crv: String },

    #[error("invalid {coordinate} coordinate: {reason}")]
    InvalidCoordinate {
        coordinate: &'static str,
        reason: String,
    },

    #[error("public key point is not on the P-256 curve")]
    PointNotOnCurve,

    #[error("transaction hash is not valid hex")]
    InvalidHashHex,

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("signature does not match")]
    SignatureMismatch,

    #[error("transaction carries no sender public key")]
    MissingSenderKey,
}

/// Conversion between JWK public keys and `p256` keys.
pub trait JwkKey: Sized {
    /// Reconstruct the curve point. Fails unless the key is EC P-256 with
    /// 32-byte coordinates that lie on the curve.
    fn to_public_key(&self) -> Result<PublicKey, VerificationError>;

    /// Export a public key the way WebCrypto does (unpadded base64url).
    fn from_public_key(key: &PublicKey) -> Self;
}

impl JwkKey for EcPublicJwk {
    fn to_public_key(&self) -> Result<PublicKey, VerificationError> {
        if !self.is_p256() {
            return Err(VerificationError::UnsupportedKey {
                kty: self.kty.clone(),
                crv: self.crv.clone(),
            });
        }
        let x = decode_coordinate("x", &self.x)?;
        let y = decode_coordinate("y", &self.y)?;
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&x),
            FieldBytes::from_slice(&y),
            false,
        );
        let key: Option<PublicKey> = PublicKey::from_encoded_point(&point).into();
        key.ok_or(VerificationError::PointNotOnCurve)
    }

    fn from_public_key(key: &PublicKey) -> Self {
        let point = key.to_encoded_point(false);
        let x = point.x().map(|x| encoding::URL_SAFE.encode(x)).unwrap_or_default();
        let y = point.y().map(|y| encoding::URL_SAFE.encode(y)).unwrap_or_default();
        EcPublicJwk::p256(x, y)
    }
}

fn decode_coordinate(
    coordinate: &'static str,
    encoded: &str,
) -> Result<[u8; constants::P256_COORDINATE_LEN], VerificationError> {
    let bytes = encoding::URL_SAFE
        .decode(encoded.trim())
        .map_err(|e| VerificationError::InvalidCoordinate {
            coordinate,
            reason: e.to_string(),
        })?;
    <[u8; constants::P256_COORDINATE_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        VerificationError::InvalidCoordinate {
            coordinate,
            reason: format!(
                "expected {} bytes, got {}",
                constants::P256_COORDINATE_LEN,
                bytes.len()
            ),
        }
    })
}

fn decode_signature(signature_b64: &str) -> Result<Signature, VerificationError> {
    let bytes = encoding::STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| VerificationError::InvalidSignatureEncoding(e.to_string()))?;
    let parsed = if bytes.len() == constants::RAW_SIGNATURE_LEN {
        Signature::from_slice(&bytes)
    } else {
        Signature::from_der(&bytes)
    };
    parsed.map_err(|_| {
        VerificationError::InvalidSignatureEncoding(format!(
            "{} bytes is neither raw r||s nor DER",
            bytes.len()
        ))
    })
}

/// Verify `signature_b64` over the hex hash `hash_hex` with `jwk`.
pub fn verify_signature(
    hash_hex: &str,
    signature_b64: &str,
    jwk: &EcPublicJwk,
) -> Result<(), VerificationError> {
    let key = jwk.to_public_key()?;
    let message = hex::decode(hash_hex).map_err(|_| VerificationError::InvalidHashHex)?;
    let signature = decode_signature(signature_b64)?;
    VerifyingKey::from(&key)
        .verify(&message, &signature)
        .map_err(|_| VerificationError::SignatureMismatch)
}

/// Fail-closed boolean form of [`verify_signature`].
#[must_use]
pub fn signature_is_valid(hash_hex: &str, signature_b64: &str, jwk: &EcPublicJwk) -> bool {
    verify_signature(hash_hex, signature_b64, jwk).is_ok()
}

/// Structural check for signatures that arrive without a sender key:
/// the value must be base64 of a plausible P-256 ECDSA signature length.
pub fn check_signature_shape(signature_b64: &str) -> Result<(), VerificationError> {
    if signature_b64.is_empty() {
        return Err(VerificationError::InvalidSignatureEncoding(
            "signature is empty".to_string(),
        ));
    }
    let bytes = encoding::STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| VerificationError::InvalidSignatureEncoding(e.to_string()))?;
    let len = bytes.len();
    if (constants::RAW_SIGNATURE_LEN..=constants::MAX_DER_SIGNATURE_LEN).contains(&len) {
        Ok(())
    } else {
        Err(VerificationError::InvalidSignatureEncoding(format!(
            "{len} bytes is outside the {}..={} byte range",
            constants::RAW_SIGNATURE_LEN,
            constants::MAX_DER_SIGNATURE_LEN
        )))
    }
}

/// Sign a hex hash the way a sender device does, returning base64 raw `r || s`.
pub fn sign_hash(hash_hex: &str, key: &SigningKey) -> Result<String, VerificationError> {
    let message = hex::decode(hash_hex).map_err(|_| VerificationError::InvalidHashHex)?;
    let signature: Signature = key.sign(&message);
    Ok(encoding::STANDARD.encode(signature.to_bytes()))
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;
    use crate::sha256_hex;

    fn keypair() -> (SigningKey, EcPublicJwk) {
        let sk = SigningKey::random(&mut OsRng);
        let jwk = EcPublicJwk::from_public_key(&PublicKey::from(sk.verifying_key()));
        (sk, jwk)
    }

    #[test]
    fn sign_then_verify() {
        let (sk, jwk) = keypair();
        let hash = sha256_hex("payload");
        let sig = sign_hash(&hash, &sk).unwrap();
        assert_eq!(verify_signature(&hash, &sig, &jwk), Ok(()));
        assert!(signature_is_valid(&hash, &sig, &jwk));
    }

    #[test]
    fn der_signature_is_accepted() {
        let (sk, jwk) = keypair();
        let hash = sha256_hex("payload");
        let message = hex::decode(&hash).unwrap();
        let signature: Signature = sk.sign(&message);
        let der = encoding::STANDARD.encode(signature.to_der().as_bytes());
        assert_eq!(verify_signature(&hash, &der, &jwk), Ok(()));
    }

    #[test]
    fn unpadded_signature_is_accepted() {
        let (sk, jwk) = keypair();
        let hash = sha256_hex("payload");
        let sig = sign_hash(&hash, &sk).unwrap();
        let trimmed = sig.trim_end_matches('=');
        assert_eq!(verify_signature(&hash, trimmed, &jwk), Ok(()));
    }

    #[test]
    fn other_hash_mismatches() {
        let (sk, jwk) = keypair();
        let sig = sign_hash(&sha256_hex("a"), &sk).unwrap();
        assert_eq!(
            verify_signature(&sha256_hex("b"), &sig, &jwk),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn other_key_mismatches() {
        let (sk, _) = keypair();
        let (_, other) = keypair();
        let hash = sha256_hex("a");
        let sig = sign_hash(&hash, &sk).unwrap();
        assert!(!signature_is_valid(&hash, &sig, &other));
    }

    #[test]
    fn wrong_curve_is_unsupported() {
        let (_, mut jwk) = keypair();
        jwk.crv = "P-384".into();
        assert!(matches!(
            jwk.to_public_key(),
            Err(VerificationError::UnsupportedKey { .. })
        ));
    }

    #[test]
    fn short_coordinate_is_rejected() {
        let (_, mut jwk) = keypair();
        jwk.x = encoding::URL_SAFE.encode([1u8; 31]);
        assert!(matches!(
            jwk.to_public_key(),
            Err(VerificationError::InvalidCoordinate { coordinate: "x", .. })
        ));
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let (_, mut jwk) = keypair();
        jwk.y = encoding::URL_SAFE.encode([7u8; 32]);
        assert_eq!(jwk.to_public_key(), Err(VerificationError::PointNotOnCurve));
    }

    #[test]
    fn bad_hash_hex() {
        let (sk, jwk) = keypair();
        let sig = sign_hash(&sha256_hex("a"), &sk).unwrap();
        assert_eq!(
            verify_signature("not-hex", &sig, &jwk),
            Err(VerificationError::InvalidHashHex)
        );
    }

    #[test]
    fn garbage_signature_encoding() {
        let (_, jwk) = keypair();
        assert!(matches!(
            verify_signature(&sha256_hex("a"), "!!!", &jwk),
            Err(VerificationError::InvalidSignatureEncoding(_))
        ));
        assert!(matches!(
            verify_signature(&sha256_hex("a"), &encoding::STANDARD.encode([0u8; 10]), &jwk),
            Err(VerificationError::InvalidSignatureEncoding(_))
        ));
    }

    #[test]
    fn jwk_roundtrip_preserves_key() {
        let (sk, jwk) = keypair();
        let back = jwk.to_public_key().unwrap();
        assert_eq!(back, PublicKey::from(sk.verifying_key()));
        assert!(!jwk.x.contains('='));
    }

    #[test]
    fn signature_shape_bounds() {
        assert!(check_signature_shape(&encoding::STANDARD.encode([0u8; 64])).is_ok());
        assert!(check_signature_shape(&encoding::STANDARD.encode([0u8; 72])).is_ok());
        assert!(check_signature_shape(&encoding::STANDARD.encode([0u8; 63])).is_err());
        assert!(check_signature_shape(&encoding::STANDARD.encode([0u8; 73])).is_err());
        assert!(check_signature_shape("").is_err());
        assert!(check_signature_shape("%%%").is_err());
    }
}

//! Receiver-to-bank transport across a persisted bank key.

use offpay_ingress::{BatchFormat, FileKeyProvider, KeyProvider, SecureTransportCodec, seal_ledger};
use offpay_verify::{LedgerVerifier, fixtures::LedgerBuilder};
use p256::ecdsa::SigningKey;
use rand::rngs::OsRng;

#[test]
fn bundle_sealed_before_restart_opens_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("bank_keys.json");

    // First process: generate the key and publish the public half.
    let published = {
        let provider = FileKeyProvider::new(&key_path);
        SecureTransportCodec::new(&provider).unwrap().bank_public_jwk()
    };

    // Receiver seals against the published key.
    let ledger = LedgerBuilder::new("receiver-7")
        .pay("alice", "bob", 12)
        .pay("carol", "bob", 3)
        .build();
    let receiver_key = SigningKey::random(&mut OsRng);
    let bundle = seal_ledger(&ledger, &published, &receiver_key).unwrap();
    let wire = serde_json::to_vec(&serde_json::json!({ "bundle": bundle })).unwrap();

    // Second process: reload the key from disk and open the upload.
    let provider = FileKeyProvider::new(&key_path);
    assert!(provider.load().is_ok());
    let codec = SecureTransportCodec::new(&provider).unwrap();
    assert_eq!(codec.bank_public_jwk(), published);

    let opened = BatchFormat::from_slice(&wire)
        .unwrap()
        .into_ledger(&codec)
        .unwrap();
    assert_eq!(opened, ledger);
    assert!(LedgerVerifier::default().verify(&opened).is_valid());
}

#[test]
fn bundle_for_a_rotated_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("bank_keys.json");
    let provider = FileKeyProvider::new(&key_path);
    let old = SecureTransportCodec::new(&provider).unwrap();

    let ledger = LedgerBuilder::new("r").pay("alice", "bob", 1).build();
    let bundle = seal_ledger(&ledger, &old.bank_public_jwk(), &SigningKey::random(&mut OsRng))
        .unwrap();

    provider.generate_and_persist().unwrap();
    let rotated = SecureTransportCodec::new(&provider).unwrap();
    assert_ne!(rotated.bank_public_jwk(), old.bank_public_jwk());

    let err = BatchFormat::EncryptedBundle(bundle)
        .into_ledger(&rotated)
        .unwrap_err();
    assert!(err.to_string().contains("key mismatch"), "{err}");
}

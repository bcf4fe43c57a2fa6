//! # offpay-ingress
//!
//! **Ingress plane**: everything between raw bytes arriving at the bank and
//! a plaintext [`Ledger`](offpay_types::Ledger) ready for verification.
//!
//! ## Architecture
//!
//! 1. **BatchFormat**: decodes the inbound JSON exactly once into one of the
//!    accepted shapes (plain entry array, wrapped ledger, encrypted bundle)
//! 2. **KeyProvider**: loads or creates the bank's static P-256
//!    key-agreement keypair
//! 3. **SecureTransportCodec**: opens encrypted bundles (ECDH, HKDF, AES-GCM)
//!    and checks the receiver's signed envelope
//!
//! ## Flow
//!
//! ```text
//! JSON → BatchFormat::decode() → [EncryptedBundle → SecureTransportCodec::decrypt()]
//!      → Ledger → offpay-verify
//! ```

pub mod batch_format;
pub mod key_provider;
pub mod transport;

pub use batch_format::BatchFormat;
pub use key_provider::{BankKeypair, FileKeyProvider, KeyError, KeyProvider, StaticKeyProvider};
pub use transport::{
    EncryptedBundle, SecureTransportCodec, SignedEnvelope, TransportError, seal_ledger,
};

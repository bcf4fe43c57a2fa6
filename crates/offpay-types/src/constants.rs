//! System-wide constants for OffPay.

/// Anchor value that seeds the ledger hash chain before the first entry.
pub const GENESIS_ANCHOR: &str = "GENESIS";

/// HKDF `info` context used to derive the key-wrapping key from the ECDH secret.
pub const KEY_WRAP_INFO: &[u8] = b"aes-key-wrapping";

/// AES-GCM nonce (IV) length in bytes.
pub const AES_GCM_IV_LEN: usize = 12;

/// AES-256 key length in bytes.
pub const AES_KEY_LEN: usize = 32;

/// Length of one P-256 affine coordinate in bytes.
pub const P256_COORDINATE_LEN: usize = 32;

/// Raw `r || s` ECDSA P-256 signature length.
pub const RAW_SIGNATURE_LEN: usize = 64;

/// Upper bound of a DER-encoded P-256 signature accepted by the legacy
/// structural signature check.
pub const MAX_DER_SIGNATURE_LEN: usize = 72;

/// JWK `kty` for elliptic-curve keys.
pub const JWK_KTY_EC: &str = "EC";

/// JWK `crv` for NIST P-256.
pub const JWK_CRV_P256: &str = "P-256";

/// Receiver id reported for batches that arrive without ledger metadata.
pub const UNKNOWN_RECEIVER: &str = "unknown";

/// Default status of a freshly exported ledger entry.
pub const DEFAULT_ENTRY_STATUS: &str = "pending";

/// Actor name written to audit log entries produced by the bank.
pub const BANK_ACTOR: &str = "bank";

/// Default location of the bank's key-agreement keypair.
pub const DEFAULT_KEY_FILE: &str = "bank_keys.json";

/// `tracing` filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Page size of an audit log query when the caller gives none.
pub const DEFAULT_AUDIT_PAGE_LIMIT: usize = 100;

/// Number of hex characters of a hash shown in chain-break diagnostics.
pub const HASH_PREVIEW_CHARS: usize = 16;

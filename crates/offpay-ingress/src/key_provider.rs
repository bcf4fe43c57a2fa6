//! Bank key-agreement keypair management.
//!
//! The bank holds one static P-256 keypair. Receivers encrypt to its public
//! half; the [`SecureTransportCodec`](crate::SecureTransportCodec) uses the
//! private half. Where the key lives is a [`KeyProvider`] decision, so tests
//! and embedders never touch process-global state.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use offpay_types::{EcPublicJwk, OffpayError};
use offpay_verify::JwkKey;
use p256::{
    PublicKey, SecretKey,
    pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding},
};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("no bank key found at {0}")]
    NotFound(String),

    #[error("key storage I/O failed: {0}")]
    Io(String),

    #[error("key material is malformed: {0}")]
    Malformed(String),
}

impl From<KeyError> for OffpayError {
    fn from(err: KeyError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// The bank's static P-256 key-agreement keypair.
#[derive(Clone)]
pub struct BankKeypair {
    secret: SecretKey,
}

impl BankKeypair {
    /// Fresh random keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    #[must_use]
    pub fn from_secret(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Parse a PEM private key, PKCS#8 or SEC1.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        SecretKey::from_pkcs8_pem(pem)
            .or_else(|_| SecretKey::from_sec1_pem(pem))
            .map(Self::from_secret)
            .map_err(|e| KeyError::Malformed(format!("private key PEM: {e}")))
    }

    /// PKCS#8 PEM of the private key.
    pub fn to_pkcs8_pem(&self) -> Result<String, KeyError> {
        self.secret
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| KeyError::Malformed(e.to_string()))
    }

    #[must_use]
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Public key to hand to receivers. Carries no signing-role metadata.
    #[must_use]
    pub fn public_jwk(&self) -> EcPublicJwk {
        EcPublicJwk::from_public_key(&self.public_key())
    }
}

impl fmt::Debug for BankKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankKeypair")
            .field("public_jwk", &self.public_jwk())
            .finish_non_exhaustive()
    }
}

/// Source of the bank's keypair.
pub trait KeyProvider: Send + Sync {
    /// Load an existing keypair. [`KeyError::NotFound`] when none exists yet.
    fn load(&self) -> Result<BankKeypair, KeyError>;

    /// Create a new keypair and store it so later `load` calls return it.
    fn generate_and_persist(&self) -> Result<BankKeypair, KeyError>;

    fn load_or_generate(&self) -> Result<BankKeypair, KeyError> {
        match self.load() {
            Err(KeyError::NotFound(location)) => {
                let keypair = self.generate_and_persist()?;
                info!(%location, "Generated new bank key-agreement keypair");
                Ok(keypair)
            }
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// FileKeyProvider
// ---------------------------------------------------------------------------

/// On-disk layout of the key file.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    private_key: String,
    #[serde(default)]
    public_key_pem: String,
    #[serde(default)]
    public_key_jwk: Option<EcPublicJwk>,
}

/// Keeps the keypair in a JSON file holding the PKCS#8 PEM private key and
/// the public key as PEM and JWK.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

impl KeyProvider for FileKeyProvider {
    fn load(&self) -> Result<BankKeypair, KeyError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyError::NotFound(self.location()));
            }
            Err(e) => return Err(KeyError::Io(e.to_string())),
        };
        let file: KeyFile = serde_json::from_str(&raw)
            .map_err(|e| KeyError::Malformed(format!("{}: {e}", self.location())))?;
        BankKeypair::from_pem(&file.private_key)
    }

    fn generate_and_persist(&self) -> Result<BankKeypair, KeyError> {
        let keypair = BankKeypair::generate();
        let public_key_pem = keypair
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::Malformed(e.to_string()))?;
        let file = KeyFile {
            private_key: keypair.to_pkcs8_pem()?,
            public_key_pem,
            public_key_jwk: Some(keypair.public_jwk()),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| KeyError::Malformed(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| KeyError::Io(e.to_string()))?;
        }
        fs::write(&self.path, json).map_err(|e| KeyError::Io(e.to_string()))?;
        Ok(keypair)
    }
}

// ---------------------------------------------------------------------------
// StaticKeyProvider
// ---------------------------------------------------------------------------

/// In-memory provider, for tests and embedders that manage keys themselves.
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    keypair: Mutex<Option<BankKeypair>>,
}

impl StaticKeyProvider {
    /// Provider that already holds `keypair`.
    #[must_use]
    pub fn new(keypair: BankKeypair) -> Self {
        Self {
            keypair: Mutex::new(Some(keypair)),
        }
    }

    /// Provider with no key yet; the first `load_or_generate` creates one.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl KeyProvider for StaticKeyProvider {
    fn load(&self) -> Result<BankKeypair, KeyError> {
        self.keypair
            .lock()
            .clone()
            .ok_or_else(|| KeyError::NotFound("memory".to_string()))
    }

    fn generate_and_persist(&self) -> Result<BankKeypair, KeyError> {
        let keypair = BankKeypair::generate();
        *self.keypair.lock() = Some(keypair.clone());
        Ok(keypair)
    }
}

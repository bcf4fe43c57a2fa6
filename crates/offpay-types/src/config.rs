//! Configuration types for the OffPay bank.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Top-level bank configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Path of the key-agreement keypair file.
    pub key_file: String,
    /// Actor recorded on audit entries written by this bank.
    pub audit_actor: String,
    pub verification: VerificationConfig,
    pub settlement: SettlementConfig,
    pub logging: LoggingConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            key_file: constants::DEFAULT_KEY_FILE.to_string(),
            audit_actor: constants::BANK_ACTOR.to_string(),
            verification: VerificationConfig::default(),
            settlement: SettlementConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Ledger verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Reject entries that carry no `sender_public_key`.
    ///
    /// When `false`, such entries only get a structural signature check
    /// (base64 decoding to a plausible ECDSA length).
    pub require_sender_keys: bool,
}

/// Settlement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Settle transactions without a `wallet_id` as audit-only records.
    pub allow_unescrowed: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            allow_unescrowed: true,
        }
    }
}

/// Log output settings. `RUST_LOG` overrides `filter` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

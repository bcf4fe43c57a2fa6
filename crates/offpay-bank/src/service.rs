//! The bank service.
//!
//! Composes the ingress codec, the verifier and the settlement engine
//! behind the two upload operations and the audit query. Audit writes here
//! are best-effort: a failing sink is logged and the response is unchanged.

use std::sync::Arc;

use offpay_ingress::{BatchFormat, FileKeyProvider, KeyProvider, SecureTransportCodec};
use offpay_settlement::{AuditSink, MemoryStore, SettlementEngine, SettlementStore};
use offpay_types::{
    AuditAction, AuditLogEntry, AuditStatus, BankConfig, EcPublicJwk, Ledger, OffpayError, Result,
};
use offpay_verify::{LedgerVerifier, ledger_digest};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::response::{AuditLogPage, LedgerVerificationResponse, SettlementResponse};

/// Appended to verification findings when settlement is refused.
pub const SETTLEMENT_REFUSED_MESSAGE: &str = "Ledger verification failed. Cannot settle.";

pub struct BankService {
    config: BankConfig,
    codec: SecureTransportCodec,
    verifier: LedgerVerifier,
    engine: SettlementEngine,
    audit: Arc<dyn AuditSink>,
}

impl BankService {
    /// Build a service. Loads the bank key from `keys`, generating one on
    /// first start.
    pub fn new(
        config: BankConfig,
        keys: &dyn KeyProvider,
        store: Arc<dyn SettlementStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        let codec = SecureTransportCodec::new(keys)?;
        let verifier = LedgerVerifier::new(config.verification);
        let engine = SettlementEngine::new(store, Arc::clone(&audit), config.settlement)
            .with_actor(config.audit_actor.as_str());
        info!(
            require_sender_keys = config.verification.require_sender_keys,
            allow_unescrowed = config.settlement.allow_unescrowed,
            "Bank service ready"
        );
        Ok(Self {
            config,
            codec,
            verifier,
            engine,
            audit,
        })
    }

    /// Service over a [`MemoryStore`], with the key kept in
    /// `config.key_file`. The store is returned for wallet and participant
    /// setup.
    pub fn in_memory(config: BankConfig) -> Result<(Self, Arc<MemoryStore>)> {
        let store = Arc::new(MemoryStore::new());
        let keys = FileKeyProvider::new(&config.key_file);
        let service = Self::new(config, &keys, store.clone(), store.clone())?;
        Ok((service, store))
    }

    #[must_use]
    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    /// The key receivers encrypt bundles to.
    #[must_use]
    pub fn bank_public_jwk(&self) -> EcPublicJwk {
        self.codec.bank_public_jwk()
    }

    /// Verify an uploaded batch without settling it.
    ///
    /// Only undecodable or undecryptable uploads are `Err`; every
    /// verification finding is reported in the response.
    pub fn verify_batch(&self, body: &Value) -> Result<LedgerVerificationResponse> {
        let ledger = self.load(body).inspect_err(|e| {
            self.record_error(AuditAction::VerifyLedger, "Verification error", e);
        })?;

        let report = self.verifier.verify(&ledger);
        let valid = report.is_valid();
        let errors = report.errors();
        let verified_transactions = if valid { ledger.txn_ids() } else { Vec::new() };

        let mut details = json!({
            "receiver_id": ledger.receiver_id,
            "entry_count": ledger.len(),
            "errors": errors,
            "verified_count": verified_transactions.len(),
        });
        if valid {
            details["ledger_digest"] = json!(ledger_digest(&ledger));
        }
        let status = if valid {
            AuditStatus::Success
        } else {
            AuditStatus::Failed
        };
        self.record(AuditLogEntry::bank(AuditAction::VerifyLedger, status, details));

        Ok(LedgerVerificationResponse {
            valid,
            errors,
            verified_transactions,
        })
    }

    /// Re-verify an uploaded batch and settle it.
    ///
    /// A ledger that fails verification settles nothing. Otherwise each
    /// transaction succeeds or fails on its own.
    pub fn settle_batch(&self, body: &Value) -> Result<SettlementResponse> {
        let ledger = self.load(body).inspect_err(|e| {
            self.record_error(AuditAction::SettleLedger, "Settlement error", e);
        })?;

        let verified = match self.verifier.admit(ledger) {
            Ok(verified) => verified,
            Err(report) => {
                let mut errors = report.errors();
                if !report.is_empty_ledger() {
                    errors.push(SETTLEMENT_REFUSED_MESSAGE.to_string());
                }
                warn!(
                    receiver_id = %report.receiver_id,
                    findings = errors.len(),
                    "Settlement refused"
                );
                self.record(AuditLogEntry::bank(
                    AuditAction::SettleLedgerBatch,
                    AuditStatus::Failed,
                    json!({
                        "receiver_id": report.receiver_id,
                        "total_transactions": report.total_entries,
                        "settled_count": 0,
                        "errors": errors,
                    }),
                ));
                return Ok(SettlementResponse::refused(errors));
            }
        };

        let outcome = self.engine.settle(&verified);
        Ok(SettlementResponse {
            settled: outcome.settled_any(),
            errors: outcome.error_messages(),
            audit_log_ids: outcome
                .audit_log_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
            settled_transactions: outcome.settled_ids,
        })
    }

    /// Audit entries, newest first.
    pub fn audit_logs(&self, limit: usize, offset: usize) -> Result<AuditLogPage> {
        let logs = self.audit.recent(limit, offset)?;
        Ok(AuditLogPage {
            count: logs.len(),
            logs,
            limit,
            offset,
        })
    }

    fn load(&self, body: &Value) -> Result<Ledger> {
        let format = BatchFormat::decode(body)?;
        if !format.is_encrypted() {
            return format.into_ledger(&self.codec);
        }
        let ledger = format
            .into_ledger(&self.codec)
            .inspect_err(|e| warn!(error = %e, "Encrypted bundle rejected"))?;
        self.record(AuditLogEntry::bank(
            AuditAction::DecryptBundle,
            AuditStatus::Success,
            json!({
                "receiver_id": ledger.receiver_id,
                "entry_count": ledger.len(),
            }),
        ));
        Ok(ledger)
    }

    fn record(&self, entry: AuditLogEntry) {
        let entry = entry.with_actor(self.config.audit_actor.as_str());
        if let Err(error) = self.audit.append(&entry) {
            warn!(action = %entry.action, %error, "Audit append failed");
        }
    }

    fn record_error(&self, action: AuditAction, context: &str, err: &OffpayError) {
        self.record(AuditLogEntry::bank(
            action,
            AuditStatus::Error,
            json!({ "error": format!("{context}: {err}") }),
        ));
    }
}

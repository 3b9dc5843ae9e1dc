//! # Transaction Flow Orchestrator
//!
//! Builds, screens, stores and anchors transactions, and answers the derived
//! queries (balances, listings, audit totals).
//!
//! ## Pipeline
//!
//! ```text
//! create:   bounds ─▶ commit ─▶ prove ─▶ encrypt ─▶ sign
//! submit:   screen ─▶ store ─▶ [anchor]
//! validate: structure ─▶ signature ─▶ range proof ─▶ compliance
//! ```
//!
//! The first failing step aborts the rest; nothing is written before
//! screening passes. The orchestrator only calls `prove`/`verify` on the
//! configured [`RangeProofSystem`] and never branches on which backend it is.
//!
//! Store handles and the clock are injected; the orchestrator opens nothing
//! itself.

use std::sync::Arc;

use veil_compliance::{ComplianceEngine, ComplianceResult};
use veil_core::{Address, Clock, Family, Timestamp, TxId, VeilError};
use veil_crypto::{
    commit, verify_opening, CommitmentOpening, Ed25519KeyPair, Ed25519PublicKey, ElGamalKeypair,
    ElGamalPublicKey, EncryptedAmount,
};
use veil_ledger::{
    LedgerStore, NotaryRecord, NotaryStore, Transaction, TransactionHeader, UnsignedTransaction,
};
use veil_store::KvStore;
use veil_zkp::{range_proof_system, RangeProofSystem};

use crate::config::FlowConfig;
use crate::lifecycle::{Signed, TxLifecycle};

/// The three stores a flow works against.
#[derive(Debug, Clone)]
pub struct FlowStores {
    /// Ledger transactions.
    pub ledger: Arc<dyn KvStore>,
    /// Notary anchors.
    pub notary: Arc<dyn KvStore>,
    /// Blacklist and whitelist.
    pub compliance: Arc<dyn KvStore>,
}

/// A freshly signed transaction and the opening of its commitment.
///
/// The opening goes back to the creator only; it is never stored.
#[derive(Debug)]
pub struct CreatedTransaction {
    /// The transaction, at `SIGNED`.
    pub lifecycle: TxLifecycle<Signed>,
    /// `(amount, blinding)` for the commitment.
    pub opening: CommitmentOpening,
}

impl CreatedTransaction {
    /// The signed transaction.
    pub fn transaction(&self) -> &Transaction {
        self.lifecycle.transaction()
    }
}

/// Outcome of a submitted transaction.
#[derive(Debug, Clone)]
pub struct FlowReceipt {
    /// The stored transaction.
    pub transaction: Transaction,
    /// The commitment opening, for the creator.
    pub opening: CommitmentOpening,
    /// The screening report.
    pub compliance: ComplianceResult,
    /// The anchor, when one was requested.
    pub anchor: Option<NotaryRecord>,
}

/// Orchestrates the confidential transaction flow.
pub struct TransactionFlow {
    config: FlowConfig,
    ledger: LedgerStore,
    notary: NotaryStore,
    compliance: ComplianceEngine,
    range_proofs: Arc<dyn RangeProofSystem>,
    auditor: ElGamalPublicKey,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TransactionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionFlow")
            .field("config", &self.config)
            .field("range_proofs", &self.range_proofs.backend())
            .field("auditor", &self.auditor.fingerprint())
            .finish_non_exhaustive()
    }
}

impl TransactionFlow {
    /// Validate `config`, select backends and bind the stores.
    ///
    /// Amounts are encrypted to `auditor`.
    ///
    /// # Errors
    ///
    /// [`VeilError::Configuration`] for invalid settings,
    /// [`VeilError::BackendUnavailable`] for a backend not compiled in.
    pub fn new(
        config: FlowConfig,
        stores: FlowStores,
        auditor: ElGamalPublicKey,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VeilError> {
        config.validate()?;
        let range_proofs = range_proof_system(config.range_proof_backend)?;
        let compliance = ComplianceEngine::new(stores.compliance, config.compliance());
        tracing::info!(
            range_proofs = %config.range_proof_backend,
            psi = %config.psi_scheme,
            level = %config.compliance_level,
            window_secs = config.cancellation_window_secs,
            "transaction flow ready"
        );
        Ok(Self {
            ledger: LedgerStore::new(stores.ledger),
            notary: NotaryStore::new(stores.notary, clock.clone()),
            compliance,
            range_proofs,
            auditor,
            clock,
            config,
        })
    }

    /// Active settings.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// The ledger store.
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// The notary store.
    pub fn notary(&self) -> &NotaryStore {
        &self.notary
    }

    /// The compliance engine.
    pub fn compliance(&self) -> &ComplianceEngine {
        &self.compliance
    }

    /// The auditor key amounts are encrypted to.
    pub fn auditor_key(&self) -> &ElGamalPublicKey {
        &self.auditor
    }

    /// The injected clock's current time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn check_bounds(&self, amount: u64) -> Result<(), VeilError> {
        if amount < self.config.min_amount || amount > self.config.max_amount {
            tracing::warn!(
                min = self.config.min_amount,
                max = self.config.max_amount,
                "amount outside permitted range"
            );
            return Err(VeilError::OutOfRange {
                min: self.config.min_amount,
                max: self.config.max_amount,
            });
        }
        Ok(())
    }

    /// Build and sign a transfer of `amount` from `sender` to `recipient`.
    ///
    /// # Errors
    ///
    /// [`VeilError::OutOfRange`] when `amount` is outside the configured
    /// bounds; no proof is produced for it.
    pub fn create_transaction(
        &self,
        sender: &Ed25519KeyPair,
        recipient: &Address,
        amount: u64,
    ) -> Result<CreatedTransaction, VeilError> {
        self.check_bounds(amount)?;
        let now = self.clock.now();
        let header = TransactionHeader {
            sender: sender.address(),
            recipient: recipient.clone(),
            timestamp: now,
            amount,
        };

        let (commitment, blinding) = commit(amount, None)?;
        let proof = self.range_proofs.prove(
            &commitment,
            amount,
            &blinding,
            self.config.min_amount,
            self.config.max_amount,
        )?;
        let encrypted = self.auditor.encrypt(amount)?;
        let unsigned =
            UnsignedTransaction::new(header, self.config.family.clone(), commitment, proof, encrypted)?;
        let lifecycle = TxLifecycle::new(unsigned).sign(sender, now)?;
        Ok(CreatedTransaction {
            lifecycle,
            opening: CommitmentOpening {
                value: amount,
                blinding,
            },
        })
    }

    /// Screen, store and optionally anchor a created transaction.
    pub fn submit(&self, created: CreatedTransaction, anchor: bool) -> Result<FlowReceipt, VeilError> {
        let CreatedTransaction { lifecycle, opening } = created;
        let screened = lifecycle.screen(&self.compliance, self.clock.now())?;
        let compliance = screened.compliance().clone();
        let stored = screened.store(&self.ledger, self.clock.now())?;
        let (transaction, anchor) = if anchor {
            let anchored = stored.anchor(&self.notary, self.config.cancellation_window_secs)?;
            (anchored.transaction().clone(), Some(anchored.record().clone()))
        } else {
            (stored.into_transaction(), None)
        };
        Ok(FlowReceipt {
            transaction,
            opening,
            compliance,
            anchor,
        })
    }

    /// Create and submit in one call. `anchor` defaults to the configured
    /// `anchor_by_default`.
    pub fn process_transaction(
        &self,
        sender: &Ed25519KeyPair,
        recipient: &Address,
        amount: u64,
        anchor: Option<bool>,
    ) -> Result<FlowReceipt, VeilError> {
        let created = self.create_transaction(sender, recipient, amount)?;
        self.submit(created, anchor.unwrap_or(self.config.anchor_by_default))
    }

    /// Re-verify a transaction end to end.
    ///
    /// Checks, in order: structure, that `sender_key` belongs to the sender
    /// and signed the transaction, the range proof against the configured
    /// bounds, and compliance of both parties.
    pub fn validate_transaction(
        &self,
        tx: &Transaction,
        sender_key: &Ed25519PublicKey,
    ) -> Result<ComplianceResult, VeilError> {
        tx.validate_structure()?;

        if !tx.is_sender_key(sender_key) {
            tracing::warn!(tx_id = %tx.tx_id(), "public key does not belong to sender");
            return Err(VeilError::Signature(format!(
                "public key {sender_key} does not derive sender {}",
                tx.header().sender
            )));
        }
        if !tx.verify_signature(sender_key) {
            tracing::warn!(tx_id = %tx.tx_id(), "signature verification failed");
            return Err(VeilError::Signature(format!(
                "invalid signature on transaction {}",
                tx.tx_id()
            )));
        }

        let (min, max) = (self.config.min_amount, self.config.max_amount);
        if !self
            .range_proofs
            .verify(tx.commitment(), tx.range_proof(), min, max)
        {
            tracing::warn!(tx_id = %tx.tx_id(), "range proof rejected");
            return Err(VeilError::OutOfRange { min, max });
        }

        let header = tx.header();
        let compliance = self
            .compliance
            .check_transaction(&header.sender, &header.recipient)?;
        if !compliance.is_compliant() {
            return Err(VeilError::NonCompliant(
                compliance
                    .reason
                    .unwrap_or_else(|| "non-compliant".to_string()),
            ));
        }
        tracing::info!(tx_id = %tx.tx_id(), "transaction validated");
        Ok(compliance)
    }

    /// Anchor a stored transaction with the configured window.
    pub fn anchor(&self, family: &Family, tx_id: &TxId) -> Result<NotaryRecord, VeilError> {
        if !self.ledger.contains(family, tx_id)? {
            return Err(VeilError::NotFound(format!("transaction {family}_{tx_id}")));
        }
        Ok(self
            .notary
            .anchor(tx_id, self.config.cancellation_window_secs)?)
    }

    /// Re-validate a stored transaction and anchor it.
    ///
    /// With an `opening`, also checks that it opens the commitment to the
    /// header amount.
    pub fn validate_and_anchor(
        &self,
        tx: &Transaction,
        sender_key: &Ed25519PublicKey,
        opening: Option<&CommitmentOpening>,
    ) -> Result<NotaryRecord, VeilError> {
        self.validate_transaction(tx, sender_key)?;
        if let Some(opening) = opening {
            if opening.value != tx.header().amount
                || !verify_opening(tx.commitment(), opening.value, &opening.blinding)
            {
                tracing::warn!(tx_id = %tx.tx_id(), "commitment opening rejected");
                return Err(VeilError::Validation(format!(
                    "opening does not match the commitment of {}",
                    tx.tx_id()
                )));
            }
        }
        match self.ledger.get(tx.family(), tx.tx_id())? {
            Some(stored) if &stored == tx => {}
            Some(_) => {
                return Err(VeilError::Validation(format!(
                    "transaction {} differs from the stored copy",
                    tx.tx_id()
                )))
            }
            None => {
                return Err(VeilError::NotFound(format!(
                    "transaction {}",
                    tx.store_key()
                )))
            }
        }
        Ok(self
            .notary
            .anchor(tx.tx_id(), self.config.cancellation_window_secs)?)
    }

    /// Cancel the anchor of `tx_id`. The ledger entry stays.
    ///
    /// # Errors
    ///
    /// [`VeilError::WindowExpired`] after the window, [`VeilError::NotFound`]
    /// without an anchor.
    pub fn cancel(&self, tx_id: &TxId) -> Result<NotaryRecord, VeilError> {
        Ok(self.notary.cancel(tx_id)?)
    }

    /// Net amount received by `address` in `family`.
    pub fn get_balance(&self, family: &Family, address: &Address) -> Result<i128, VeilError> {
        Ok(self.ledger.balance(family, address)?)
    }

    /// One stored transaction.
    pub fn get_transaction(
        &self,
        family: &Family,
        tx_id: &TxId,
    ) -> Result<Option<Transaction>, VeilError> {
        Ok(self.ledger.get(family, tx_id)?)
    }

    /// Stored transactions of `family`, or of every family.
    pub fn list_transactions(&self, family: Option<&Family>) -> Result<Vec<Transaction>, VeilError> {
        Ok(self.ledger.list(family)?)
    }

    /// Anchors, optionally including expired ones not yet collected.
    pub fn list_notary_records(&self, include_expired: bool) -> Result<Vec<NotaryRecord>, VeilError> {
        Ok(self.notary.list(include_expired)?)
    }

    /// Collect expired anchors now.
    pub fn purge_expired(&self) -> Result<usize, VeilError> {
        Ok(self.notary.purge_expired()?)
    }

    /// Administrative removal of a ledger transaction.
    pub fn delete_transaction(&self, family: &Family, tx_id: &TxId) -> Result<bool, VeilError> {
        Ok(self.ledger.delete(family, tx_id)?)
    }

    /// Total received by `address` in `family`, computed by adding the
    /// ciphertexts and decrypting once with the auditor key.
    pub fn audit_total(
        &self,
        family: &Family,
        address: &Address,
        auditor: &ElGamalKeypair,
    ) -> Result<u64, VeilError> {
        let mut total = EncryptedAmount::zero(auditor.public_key());
        let mut count = 0usize;
        for tx in self.ledger.list(Some(family))? {
            if &tx.header().recipient == address {
                total = total.add(tx.encrypted_amount())?;
                count += 1;
            }
        }
        let value = auditor.decrypt(&total)?;
        tracing::info!(family = %family, address = %address, transactions = count, "audit total computed");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_compliance::{AddressList, ComplianceLevel};
    use veil_core::{ErrorCode, ManualClock};
    use veil_store::MemoryKv;
    use veil_zkp::RangeProofBackend;

    const T0: i64 = 1_700_000_000;

    struct Harness {
        flow: TransactionFlow,
        clock: Arc<ManualClock>,
        lists: Arc<MemoryKv>,
        auditor: ElGamalKeypair,
    }

    fn harness(config: FlowConfig) -> Harness {
        let clock = Arc::new(ManualClock::new(Timestamp::from_epoch_secs(T0).unwrap()));
        let lists = Arc::new(MemoryKv::new());
        let auditor = ElGamalKeypair::generate();
        let flow = TransactionFlow::new(
            config,
            FlowStores {
                ledger: Arc::new(MemoryKv::new()),
                notary: Arc::new(MemoryKv::new()),
                compliance: lists.clone(),
            },
            *auditor.public_key(),
            clock.clone(),
        )
        .unwrap();
        Harness {
            flow,
            clock,
            lists,
            auditor,
        }
    }

    fn emulated() -> FlowConfig {
        FlowConfig {
            range_proof_backend: RangeProofBackend::Emulated,
            ..FlowConfig::default()
        }
    }

    fn key(seed: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed(&[seed; 32])
    }

    #[test]
    fn end_to_end_transfer_moves_balance() {
        let h = harness(FlowConfig::default());
        let (s, r) = (key(1), key(2));
        let created = h.flow.create_transaction(&s, &r.address(), 100).unwrap();
        let tx = created.transaction().clone();

        assert!(tx.verify_signature(&s.public_key()));
        assert!(h.flow.validate_transaction(&tx, &s.public_key()).unwrap().is_compliant());

        let receipt = h.flow.submit(created, true).unwrap();
        let anchor = receipt.anchor.unwrap();
        assert_eq!(anchor.cancellation_window_secs, 120);
        assert_eq!(anchor.expires_at.unwrap().epoch_secs(), T0 + 120);

        let f = Family::financial();
        assert_eq!(h.flow.get_balance(&f, &r.address()).unwrap(), 100);
        assert_eq!(h.flow.get_balance(&f, &s.address()).unwrap(), -100);
    }

    #[test]
    fn blacklisted_recipient_is_never_stored() {
        let h = harness(emulated());
        let (s, r) = (key(1), key(2));
        AddressList::blacklist().insert(h.lists.as_ref(), &r.address()).unwrap();

        let err = h.flow.process_transaction(&s, &r.address(), 100, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NonCompliant);
        assert!(h.flow.list_transactions(None).unwrap().is_empty());
        assert!(h.flow.list_notary_records(true).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_amount_is_refused_before_proving() {
        let h = harness(emulated());
        let err = h.flow.create_transaction(&key(1), &key(2).address(), 1_000_001).unwrap_err();
        assert!(matches!(err, VeilError::OutOfRange { min: 0, max: 1_000_000 }));
    }

    #[test]
    fn cancel_window_boundaries() {
        let h = harness(emulated());
        let r = key(2).address();
        let first = h.flow.process_transaction(&key(1), &r, 10, Some(true)).unwrap();
        h.clock.advance(119).unwrap();
        h.flow.cancel(first.transaction.tx_id()).unwrap();

        let second = h.flow.process_transaction(&key(3), &r, 10, Some(true)).unwrap();
        h.clock.advance(121).unwrap();
        let err = h.flow.cancel(second.transaction.tx_id()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::WindowExpired);

        let f = Family::financial();
        assert!(h.flow.get_transaction(&f, first.transaction.tx_id()).unwrap().is_some());
        assert!(h.flow.get_transaction(&f, second.transaction.tx_id()).unwrap().is_some());
    }

    #[test]
    fn resubmitting_is_duplicate() {
        let h = harness(emulated());
        let s = key(1);
        let receipt = h.flow.process_transaction(&s, &key(2).address(), 5, Some(false)).unwrap();
        assert!(receipt.anchor.is_none());
        let err = h
            .flow
            .ledger()
            .put(&receipt.transaction)
            .map_err(VeilError::from)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateTransaction);
    }

    #[test]
    fn validation_rejects_wrong_key() {
        let h = harness(emulated());
        let created = h.flow.create_transaction(&key(1), &key(2).address(), 5).unwrap();
        let err = h
            .flow
            .validate_transaction(created.transaction(), &key(9).public_key())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SignatureError);
    }

    #[test]
    fn validation_rejects_narrower_bounds() {
        let wide = harness(emulated());
        let s = key(1);
        let created = wide.flow.create_transaction(&s, &key(2).address(), 500).unwrap();

        let narrow = harness(FlowConfig {
            max_amount: 400,
            ..emulated()
        });
        let err = narrow
            .flow
            .validate_transaction(created.transaction(), &s.public_key())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfRange);
    }

    #[test]
    fn validate_and_anchor_checks_opening_and_storage() {
        let h = harness(emulated());
        let s = key(1);
        let receipt = h.flow.process_transaction(&s, &key(2).address(), 77, Some(false)).unwrap();
        let tx = &receipt.transaction;

        let wrong = CommitmentOpening {
            value: 78,
            blinding: receipt.opening.blinding.clone(),
        };
        let err = h.flow.validate_and_anchor(tx, &s.public_key(), Some(&wrong)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let record = h
            .flow
            .validate_and_anchor(tx, &s.public_key(), Some(&receipt.opening))
            .unwrap();
        assert_eq!(&record.tx_id, tx.tx_id());
        assert_eq!(
            h.flow.validate_and_anchor(tx, &s.public_key(), None).unwrap_err().code(),
            ErrorCode::AlreadyAnchored
        );
    }

    #[test]
    fn unstored_transaction_cannot_be_anchored() {
        let h = harness(emulated());
        let s = key(1);
        let created = h.flow.create_transaction(&s, &key(2).address(), 3).unwrap();
        let err = h
            .flow
            .validate_and_anchor(created.transaction(), &s.public_key(), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        let err = h
            .flow
            .anchor(&Family::financial(), created.transaction().tx_id())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn audit_total_decrypts_homomorphic_sum() {
        let h = harness(emulated());
        let r = key(9).address();
        for (seed, amount) in [(1u8, 100u64), (2, 250), (3, 7)] {
            h.flow.process_transaction(&key(seed), &r, amount, Some(false)).unwrap();
        }
        h.flow.process_transaction(&key(9), &key(1).address(), 50, Some(false)).unwrap();
        let total = h.flow.audit_total(&Family::financial(), &r, &h.auditor).unwrap();
        assert_eq!(total, 357);
        assert_eq!(h.flow.get_balance(&Family::financial(), &r).unwrap(), 307);
    }

    #[test]
    fn audit_with_foreign_key_is_decryption_error() {
        let h = harness(emulated());
        let r = key(9).address();
        h.flow.process_transaction(&key(1), &r, 1, Some(false)).unwrap();
        let err = h
            .flow
            .audit_total(&Family::financial(), &r, &ElGamalKeypair::generate())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DecryptionError);
    }

    #[test]
    fn advanced_mandatory_whitelist_blocks_unlisted_parties() {
        let h = harness(FlowConfig {
            compliance_level: ComplianceLevel::Advanced,
            whitelist_mandatory: true,
            ..emulated()
        });
        let (s, r) = (key(1), key(2));
        let err = h.flow.process_transaction(&s, &r.address(), 1, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NonCompliant);

        AddressList::whitelist().insert(h.lists.as_ref(), &s.address()).unwrap();
        AddressList::whitelist().insert(h.lists.as_ref(), &r.address()).unwrap();
        h.flow.process_transaction(&s, &r.address(), 1, None).unwrap();
    }

    #[test]
    fn expired_anchor_disappears_and_purge_counts() {
        let h = harness(FlowConfig {
            cancellation_window_secs: 30,
            ..emulated()
        });
        h.flow.process_transaction(&key(1), &key(2).address(), 1, Some(true)).unwrap();
        h.flow.process_transaction(&key(3), &key(2).address(), 1, Some(true)).unwrap();
        h.clock.advance(31).unwrap();
        assert_eq!(h.flow.list_notary_records(true).unwrap().len(), 2);
        assert_eq!(h.flow.purge_expired().unwrap(), 2);
        assert!(h.flow.list_notary_records(false).unwrap().is_empty());
    }

    #[test]
    fn admin_delete_removes_from_balance() {
        let h = harness(emulated());
        let r = key(2).address();
        let receipt = h.flow.process_transaction(&key(1), &r, 40, Some(false)).unwrap();
        let f = Family::financial();
        assert!(h.flow.delete_transaction(&f, receipt.transaction.tx_id()).unwrap());
        assert_eq!(h.flow.get_balance(&f, &r).unwrap(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let bad = FlowConfig {
            min_amount: 5,
            max_amount: 1,
            ..FlowConfig::default()
        };
        let err = TransactionFlow::new(
            bad,
            FlowStores {
                ledger: Arc::new(MemoryKv::new()),
                notary: Arc::new(MemoryKv::new()),
                compliance: Arc::new(MemoryKv::new()),
            },
            *ElGamalKeypair::generate().public_key(),
            Arc::new(veil_core::SystemClock),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }
}

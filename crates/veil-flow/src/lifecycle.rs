//! # Anchor Lifecycle Typestate
//!
//! A transaction moves through the flow as a [`TxLifecycle<S>`] whose state
//! is a type. Each transition consumes the value and performs the step's
//! side effect, so a step cannot be skipped or repeated.
//!
//! ```text
//! Created ──sign()──▶ Signed ──screen()──▶ Screened ──store()──▶ Stored
//!                                                                  │
//!                                                              anchor()
//!                                                                  ▼
//!                                      Cancelled ◀──cancel()── Anchored
//!                                                                  │
//!                                                             refresh()
//!                                                                  ▼
//!                                                               Expired
//! ```
//!
//! ## Security Invariant
//!
//! - `screen()` is the only way to reach `Screened`, and it refuses on a
//!   non-compliant verdict. `store()` exists only on `Screened`, so no
//!   unscreened transaction is written to the ledger.
//! - `Cancelled` and `Expired` have no transitions.
//!
//! ```compile_fail
//! use veil_flow::lifecycle::*;
//! fn skip(flow: TxLifecycle<Signed>, ledger: &veil_ledger::LedgerStore) {
//!     // ERROR: no method named `store` found for `TxLifecycle<Signed>`
//!     let _ = flow.store(ledger, veil_core::Timestamp::now());
//! }
//! ```

use serde::{Deserialize, Serialize};
use veil_compliance::{ComplianceEngine, ComplianceResult};
use veil_core::{Timestamp, TxId, VeilError};
use veil_crypto::Ed25519KeyPair;
use veil_ledger::{LedgerStore, NotaryRecord, NotaryStore, Transaction, UnsignedTransaction};

/// Assembled with its commitment, proof and ciphertext; not yet signed.
#[derive(Debug, Clone)]
pub struct Created {
    unsigned: UnsignedTransaction,
}

/// Signed by the sender.
#[derive(Debug, Clone)]
pub struct Signed {
    tx: Transaction,
}

/// Passed compliance screening.
#[derive(Debug, Clone)]
pub struct Screened {
    tx: Transaction,
    compliance: ComplianceResult,
}

/// Written to the ledger.
#[derive(Debug, Clone)]
pub struct Stored {
    tx: Transaction,
    key: String,
}

/// Holds a live notary anchor.
#[derive(Debug, Clone)]
pub struct Anchored {
    tx: Transaction,
    record: NotaryRecord,
}

/// The anchor was cancelled inside its window (terminal).
#[derive(Debug, Clone)]
pub struct Cancelled {
    tx: Transaction,
    record: NotaryRecord,
}

/// The anchor outlived `expires_at` (terminal).
#[derive(Debug, Clone)]
pub struct Expired {
    tx: Transaction,
    record: NotaryRecord,
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Created {}
    impl Sealed for super::Signed {}
    impl Sealed for super::Screened {}
    impl Sealed for super::Stored {}
    impl Sealed for super::Anchored {}
    impl Sealed for super::Cancelled {}
    impl Sealed for super::Expired {}
}

/// A lifecycle state. Sealed.
pub trait AnchorState: private::Sealed + std::fmt::Debug {
    /// Upper-case state name.
    fn name() -> &'static str;

    /// Whether no transition leaves this state.
    fn is_terminal() -> bool {
        false
    }
}

macro_rules! state_name {
    ($ty:ident, $name:literal) => {
        impl AnchorState for $ty {
            fn name() -> &'static str {
                $name
            }
        }
    };
    ($ty:ident, $name:literal, terminal) => {
        impl AnchorState for $ty {
            fn name() -> &'static str {
                $name
            }
            fn is_terminal() -> bool {
                true
            }
        }
    };
}

state_name!(Created, "CREATED");
state_name!(Signed, "SIGNED");
state_name!(Screened, "SCREENED");
state_name!(Stored, "STORED");
state_name!(Anchored, "ANCHORED");
state_name!(Cancelled, "CANCELLED", terminal);
state_name!(Expired, "EXPIRED", terminal);

/// One step of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State left.
    pub from_state: String,
    /// State entered.
    pub to_state: String,
    /// When.
    pub timestamp: Timestamp,
}

/// A transaction in lifecycle state `S`.
#[derive(Debug, Clone)]
pub struct TxLifecycle<S: AnchorState> {
    tx_id: TxId,
    state: S,
    log: Vec<TransitionRecord>,
}

/// Result of re-reading an anchor.
#[derive(Debug)]
pub enum AnchorStatus {
    /// Still anchored.
    Live(TxLifecycle<Anchored>),
    /// Past `expires_at`.
    Expired(TxLifecycle<Expired>),
}

impl<S: AnchorState> TxLifecycle<S> {
    /// The transaction id.
    pub fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// Current state name.
    pub fn state_name(&self) -> &'static str {
        S::name()
    }

    /// Whether the lifecycle has ended.
    pub fn is_terminal(&self) -> bool {
        S::is_terminal()
    }

    /// Every transition so far.
    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.log
    }

    fn transition_to<T: AnchorState>(mut self, next: T, at: Timestamp) -> TxLifecycle<T> {
        self.log.push(TransitionRecord {
            from_state: S::name().to_string(),
            to_state: T::name().to_string(),
            timestamp: at,
        });
        tracing::debug!(tx_id = %self.tx_id, from = S::name(), to = T::name(), "lifecycle transition");
        TxLifecycle {
            tx_id: self.tx_id,
            state: next,
            log: self.log,
        }
    }
}

impl TxLifecycle<Created> {
    /// Start the lifecycle of an assembled transaction.
    pub fn new(unsigned: UnsignedTransaction) -> Self {
        Self {
            tx_id: *unsigned.tx_id(),
            state: Created { unsigned },
            log: Vec::new(),
        }
    }

    /// The unsigned transaction.
    pub fn unsigned(&self) -> &UnsignedTransaction {
        &self.state.unsigned
    }

    /// Sign with the sender's key (CREATED → SIGNED).
    ///
    /// # Errors
    ///
    /// [`VeilError::Signature`] if `key` does not derive the header's sender.
    pub fn sign(self, key: &Ed25519KeyPair, at: Timestamp) -> Result<TxLifecycle<Signed>, VeilError> {
        let sender = &self.state.unsigned.header().sender;
        if &key.address() != sender {
            tracing::warn!(tx_id = %self.tx_id, sender = %sender, "signing key does not match sender");
            return Err(VeilError::Signature(format!(
                "signing key derives {}, not the sender {}",
                key.address(),
                sender
            )));
        }
        let tx = self.state.unsigned.clone().sign(key)?;
        tracing::info!(tx_id = %self.tx_id, "transaction signed");
        Ok(self.transition_to(Signed { tx }, at))
    }
}

impl TxLifecycle<Signed> {
    /// Resume at `Signed` with a transaction signed elsewhere.
    pub fn from_signed(tx: Transaction) -> Self {
        Self {
            tx_id: *tx.tx_id(),
            state: Signed { tx },
            log: Vec::new(),
        }
    }

    /// The signed transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// Screen both parties (SIGNED → SCREENED).
    ///
    /// # Errors
    ///
    /// [`VeilError::NonCompliant`] on a blacklist hit or a missing mandatory
    /// whitelist membership. The flow does not retry.
    pub fn screen(
        self,
        engine: &ComplianceEngine,
        at: Timestamp,
    ) -> Result<TxLifecycle<Screened>, VeilError> {
        let header = self.state.tx.header();
        let compliance = engine.check_transaction(&header.sender, &header.recipient)?;
        if !compliance.is_compliant() {
            let reason = compliance
                .reason
                .clone()
                .unwrap_or_else(|| "non-compliant".to_string());
            tracing::warn!(tx_id = %self.tx_id, reason = %reason, "transaction rejected by screening");
            return Err(VeilError::NonCompliant(reason));
        }
        tracing::info!(tx_id = %self.tx_id, level = %engine.config().level, "transaction screened");
        let Signed { tx } = self.state.clone();
        Ok(self.transition_to(Screened { tx, compliance }, at))
    }
}

impl TxLifecycle<Screened> {
    /// The screened transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// The screening report.
    pub fn compliance(&self) -> &ComplianceResult {
        &self.state.compliance
    }

    /// Write to the ledger (SCREENED → STORED).
    ///
    /// # Errors
    ///
    /// [`VeilError::DuplicateTransaction`] if the key is already taken.
    pub fn store(self, ledger: &LedgerStore, at: Timestamp) -> Result<TxLifecycle<Stored>, VeilError> {
        let key = ledger.put(&self.state.tx)?;
        let tx = self.state.tx.clone();
        Ok(self.transition_to(Stored { tx, key }, at))
    }
}

impl TxLifecycle<Stored> {
    /// The stored transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// Its ledger key.
    pub fn key(&self) -> &str {
        &self.state.key
    }

    /// Anchor with `window_secs` (STORED → ANCHORED).
    pub fn anchor(self, notary: &NotaryStore, window_secs: u64) -> Result<TxLifecycle<Anchored>, VeilError> {
        let record = notary.anchor(&self.tx_id, window_secs)?;
        let at = record.anchored_at;
        let tx = self.state.tx.clone();
        Ok(self.transition_to(Anchored { tx, record }, at))
    }

    /// Finish without anchoring.
    pub fn into_transaction(self) -> Transaction {
        self.state.tx
    }
}

impl TxLifecycle<Anchored> {
    /// The anchored transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// The live anchor.
    pub fn record(&self) -> &NotaryRecord {
        &self.state.record
    }

    /// Cancel the anchor (ANCHORED → CANCELLED).
    ///
    /// # Errors
    ///
    /// [`VeilError::WindowExpired`] once the window has closed.
    pub fn cancel(self, notary: &NotaryStore, at: Timestamp) -> Result<TxLifecycle<Cancelled>, VeilError> {
        let record = notary.cancel(&self.tx_id)?;
        let tx = self.state.tx.clone();
        Ok(self.transition_to(Cancelled { tx, record }, at))
    }

    /// Re-read the anchor, moving to EXPIRED once the store no longer holds
    /// it and its `expires_at` has passed on the store's clock.
    ///
    /// # Errors
    ///
    /// [`VeilError::NotFound`] if the anchor vanished without expiring
    /// (cancelled through another handle).
    pub fn refresh(self, notary: &NotaryStore) -> Result<AnchorStatus, VeilError> {
        if notary.get(&self.state.record.record_id)?.is_some() {
            return Ok(AnchorStatus::Live(self));
        }
        let now = notary.now();
        if !self.state.record.is_expired(&now) {
            return Err(VeilError::NotFound(format!("anchor for {}", self.tx_id)));
        }
        let Anchored { tx, record } = self.state.clone();
        Ok(AnchorStatus::Expired(self.transition_to(Expired { tx, record }, now)))
    }
}

impl TxLifecycle<Cancelled> {
    /// The transaction; still in the ledger.
    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// The removed anchor.
    pub fn record(&self) -> &NotaryRecord {
        &self.state.record
    }
}

impl TxLifecycle<Expired> {
    /// The transaction; still in the ledger.
    pub fn transaction(&self) -> &Transaction {
        &self.state.tx
    }

    /// The expired anchor.
    pub fn record(&self) -> &NotaryRecord {
        &self.state.record
    }
}

//! Ledger and notary errors.

use thiserror::Error;
use veil_core::{CanonicalizationError, TxId, VeilError};
use veil_store::StoreError;

/// Errors from the transaction model and the ledger store.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The KV store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A transaction with the same `family_id` key is already stored.
    #[error("duplicate transaction at key '{key}'")]
    Duplicate {
        /// The colliding store key.
        key: String,
    },

    /// A stored value does not decode as a transaction.
    #[error("corrupt ledger entry at '{key}': {reason}")]
    Corrupt {
        /// The stored key.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// The transaction is structurally invalid.
    #[error("invalid transaction: {0}")]
    Validation(String),

    /// Canonical serialization failed.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Writing the CSV export failed.
    #[error("export failed: {0}")]
    Export(String),
}

impl From<csv::Error> for LedgerError {
    fn from(e: csv::Error) -> Self {
        Self::Export(e.to_string())
    }
}

impl From<LedgerError> for VeilError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Store(s) => s.into(),
            LedgerError::Duplicate { key } => VeilError::DuplicateTransaction { key },
            LedgerError::Validation(msg) => VeilError::Validation(msg),
            LedgerError::Canonicalization(c) => VeilError::Canonicalization(c),
            LedgerError::Corrupt { .. } | LedgerError::Export(_) => {
                VeilError::Storage(e.to_string())
            }
        }
    }
}

/// Errors from the notary store.
#[derive(Error, Debug)]
pub enum NotaryError {
    /// The KV store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored value does not decode as a notary record.
    #[error("corrupt notary entry at '{key}': {reason}")]
    Corrupt {
        /// The stored key.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// Canonical serialization failed.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// No live anchor exists for the transaction.
    #[error("no active anchor for transaction {0}")]
    NotFound(TxId),

    /// The transaction already has a live anchor.
    #[error("transaction {tx_id} is already anchored at '{key}'")]
    AlreadyAnchored {
        /// The anchored transaction.
        tx_id: TxId,
        /// Store key of the live anchor.
        key: String,
    },

    /// Cancellation was attempted after the window closed.
    #[error("cancellation window of {window_secs}s expired for transaction {tx_id}")]
    WindowExpired {
        /// The anchored transaction.
        tx_id: TxId,
        /// The window that applied.
        window_secs: u64,
    },

    /// `anchored_at + window` does not fit in a timestamp.
    #[error("cancellation window of {0}s overflows the timestamp range")]
    WindowOverflow(u64),
}

impl From<NotaryError> for VeilError {
    fn from(e: NotaryError) -> Self {
        match e {
            NotaryError::Store(s) => s.into(),
            NotaryError::Canonicalization(c) => VeilError::Canonicalization(c),
            NotaryError::NotFound(tx_id) => VeilError::NotFound(format!("anchor for {tx_id}")),
            NotaryError::AlreadyAnchored { tx_id, key } => VeilError::AlreadyAnchored {
                tx_id: tx_id.to_hex(),
                key,
            },
            NotaryError::WindowExpired { tx_id, window_secs } => VeilError::WindowExpired {
                tx_id: tx_id.to_hex(),
                window_secs,
            },
            NotaryError::WindowOverflow(_) => VeilError::Validation(e.to_string()),
            NotaryError::Corrupt { .. } => VeilError::Storage(e.to_string()),
        }
    }
}

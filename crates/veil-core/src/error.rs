//! # Error Types
//!
//! [`VeilError`] is the taxonomy every public operation of the ledger reports
//! through. Each variant maps to exactly one [`ErrorCode`]; the code strings
//! are part of the external contract and never change meaning.
//!
//! ## Design
//!
//! - Cryptographic verification failures are recoverable. They surface as
//!   `false` from verify functions or as `Signature` / `OutOfRange` /
//!   `Decryption` errors, never as panics.
//! - Only resource-level failures (`Storage`, `Configuration`,
//!   `BackendUnavailable`) are fatal to a whole flow; see
//!   [`VeilError::is_fatal()`].
//! - Lower crates keep their own `thiserror` enums and provide `From`
//!   conversions into `VeilError` next to their definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error for ledger operations.
#[derive(Error, Debug)]
pub enum VeilError {
    /// Malformed structure: missing or invalid header fields, bad identifiers.
    #[error("validation error: {0}")]
    Validation(String),

    /// Signature missing, malformed, or not produced by the claimed sender.
    #[error("signature error: {0}")]
    Signature(String),

    /// The amount is outside the permitted range, or its range proof failed.
    #[error("amount out of range [{min}, {max}]")]
    OutOfRange {
        /// Lower bound of the permitted range.
        min: u64,
        /// Upper bound of the permitted range.
        max: u64,
    },

    /// A blacklist hit, or missing mandatory whitelist membership.
    #[error("non-compliant: {0}")]
    NonCompliant(String),

    /// A record with the same `family_id` key already exists.
    #[error("duplicate transaction: {key}")]
    DuplicateTransaction {
        /// The colliding store key.
        key: String,
    },

    /// The transaction already carries a live anchor.
    #[error("transaction {tx_id} already anchored: {key}")]
    AlreadyAnchored {
        /// The anchored transaction id.
        tx_id: String,
        /// The existing notary record key.
        key: String,
    },

    /// Anchor cancellation attempted after its window closed.
    #[error("cancellation window of {window_secs}s expired for transaction {tx_id}")]
    WindowExpired {
        /// The anchored transaction id.
        tx_id: String,
        /// The cancellation window that applied.
        window_secs: u64,
    },

    /// Ciphertext malformed, encrypted to another key, or out of the
    /// decryptable range.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The configured range-proof or PSI backend is not available.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A value cannot be committed to (exceeds the safe bound).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The requested record does not exist (or has expired).
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Canonical serialization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Invalid configuration (bounds, key material, file contents).
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Stable machine-readable code for each [`VeilError`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// See [`VeilError::Validation`].
    ValidationError,
    /// See [`VeilError::Signature`].
    SignatureError,
    /// See [`VeilError::OutOfRange`].
    OutOfRange,
    /// See [`VeilError::NonCompliant`].
    NonCompliant,
    /// See [`VeilError::DuplicateTransaction`].
    DuplicateTransaction,
    /// See [`VeilError::AlreadyAnchored`].
    AlreadyAnchored,
    /// See [`VeilError::WindowExpired`].
    WindowExpired,
    /// See [`VeilError::Decryption`].
    DecryptionError,
    /// See [`VeilError::BackendUnavailable`].
    BackendUnavailable,
    /// See [`VeilError::InvalidValue`].
    InvalidValue,
    /// See [`VeilError::NotFound`].
    NotFound,
    /// See [`VeilError::Storage`].
    StorageError,
    /// See [`VeilError::Canonicalization`].
    CanonicalizationError,
    /// See [`VeilError::Configuration`].
    ConfigurationError,
}

impl ErrorCode {
    /// The code as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::SignatureError => "SIGNATURE_ERROR",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::NonCompliant => "NON_COMPLIANT",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::AlreadyAnchored => "ALREADY_ANCHORED",
            Self::WindowExpired => "WINDOW_EXPIRED",
            Self::DecryptionError => "DECRYPTION_ERROR",
            Self::BackendUnavailable => "BACKEND_UNAVAILABLE",
            Self::InvalidValue => "INVALID_VALUE",
            Self::NotFound => "NOT_FOUND",
            Self::StorageError => "STORAGE_ERROR",
            Self::CanonicalizationError => "CANONICALIZATION_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VeilError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Signature(_) => ErrorCode::SignatureError,
            Self::OutOfRange { .. } => ErrorCode::OutOfRange,
            Self::NonCompliant(_) => ErrorCode::NonCompliant,
            Self::DuplicateTransaction { .. } => ErrorCode::DuplicateTransaction,
            Self::AlreadyAnchored { .. } => ErrorCode::AlreadyAnchored,
            Self::WindowExpired { .. } => ErrorCode::WindowExpired,
            Self::Decryption(_) => ErrorCode::DecryptionError,
            Self::BackendUnavailable(_) => ErrorCode::BackendUnavailable,
            Self::InvalidValue(_) => ErrorCode::InvalidValue,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Storage(_) => ErrorCode::StorageError,
            Self::Canonicalization(_) => ErrorCode::CanonicalizationError,
            Self::Configuration(_) => ErrorCode::ConfigurationError,
        }
    }

    /// True for resource-level failures that abort the whole flow rather than
    /// rejecting a single transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Configuration(_) | Self::BackendUnavailable(_)
        )
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted; amounts are integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error constructing a validated identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The address string is empty, too long, or contains forbidden characters.
    #[error("invalid address {value:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The family token is empty, too long, or not `[A-Za-z0-9_-]`.
    #[error("invalid family {value:?}: {reason}")]
    InvalidFamily {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A digest-shaped identifier is not 64 hex characters.
    #[error("malformed digest {value:?}: {reason}")]
    MalformedDigest {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<IdentifierError> for VeilError {
    fn from(e: IdentifierError) -> Self {
        VeilError::Validation(e.to_string())
    }
}

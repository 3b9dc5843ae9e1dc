//! Error types for commitments, confidential encryption and signatures.

use thiserror::Error;
use veil_core::VeilError;

/// Key handling and signature errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material could not be parsed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A signature did not verify.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// A group element failed to decode.
    #[error("malformed group element: {0}")]
    MalformedPoint(String),
}

/// Pedersen commitment errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// The value exceeds the largest committable integer.
    #[error("value {value} exceeds the committable bound {max}")]
    ValueTooLarge {
        /// The rejected value.
        value: u64,
        /// The bound.
        max: u64,
    },

    /// The commitment bytes are not a valid group element.
    #[error("malformed commitment: {0}")]
    Malformed(String),
}

/// Confidential amount encryption errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    /// The ciphertext was produced for another public key.
    #[error("ciphertext is for key {found}, not {expected}")]
    KeyMismatch {
        /// Fingerprint of the key used for decryption or addition.
        expected: String,
        /// Fingerprint carried by the ciphertext.
        found: String,
    },

    /// A ciphertext component is not a valid group element.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The plaintext is larger than the decryptable range.
    #[error("plaintext is outside the decryptable range [0, {max}]")]
    OutOfDecryptableRange {
        /// Largest decryptable value.
        max: u64,
    },

    /// The value is too large to be encrypted.
    #[error("value {value} exceeds the encryptable bound {max}")]
    ValueTooLarge {
        /// The rejected value.
        value: u64,
        /// The bound.
        max: u64,
    },
}

impl From<CryptoError> for VeilError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::KeyError(msg) => VeilError::Configuration(msg),
            CryptoError::VerificationFailed(msg) => VeilError::Signature(msg),
            CryptoError::MalformedPoint(msg) => VeilError::Validation(msg),
        }
    }
}

impl From<CommitmentError> for VeilError {
    fn from(e: CommitmentError) -> Self {
        match e {
            CommitmentError::ValueTooLarge { .. } => VeilError::InvalidValue(e.to_string()),
            CommitmentError::Malformed(_) => VeilError::Validation(e.to_string()),
        }
    }
}

impl From<EncryptionError> for VeilError {
    fn from(e: EncryptionError) -> Self {
        match e {
            EncryptionError::ValueTooLarge { .. } => VeilError::InvalidValue(e.to_string()),
            other => VeilError::Decryption(other.to_string()),
        }
    }
}

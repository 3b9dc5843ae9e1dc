//! Compliance errors.

use thiserror::Error;
use veil_core::{IdentifierError, VeilError};
use veil_store::StoreError;

/// Error raised while loading lists or screening.
///
/// A non-compliant outcome is not an error here: it is a
/// [`ComplianceResult`](crate::ComplianceResult) with status `NonCompliant`.
#[derive(Error, Debug)]
pub enum ComplianceError {
    /// The list store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored list entry is not a JSON address string.
    #[error("corrupt {list} entry at '{key}': {reason}")]
    CorruptEntry {
        /// Which list.
        list: &'static str,
        /// The stored key.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// An address failed validation.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// The named PSI scheme does not exist.
    #[error("psi scheme '{0}' is not available")]
    BackendUnavailable(String),
}

impl From<ComplianceError> for VeilError {
    fn from(e: ComplianceError) -> Self {
        match e {
            ComplianceError::Store(s) => s.into(),
            ComplianceError::CorruptEntry { .. } => VeilError::Storage(e.to_string()),
            ComplianceError::Identifier(id) => id.into(),
            ComplianceError::BackendUnavailable(name) => VeilError::BackendUnavailable(name),
        }
    }
}

//! Storage errors.

use thiserror::Error;
use veil_core::VeilError;

/// Error raised by a KV backend.
///
/// Every variant is resource-level; callers surface it as
/// [`VeilError::Storage`], which is fatal to the current flow.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The underlying engine failed.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored key or value could not be decoded.
    #[error("corrupt entry at '{key}': {reason}")]
    Corrupt {
        /// The offending key (possibly lossy-decoded).
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The store could not be opened.
    #[error("failed to open store at {path}: {reason}")]
    Open {
        /// Filesystem location.
        path: String,
        /// Engine message.
        reason: String,
    },
}

#[cfg(feature = "sled")]
impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<StoreError> for VeilError {
    fn from(e: StoreError) -> Self {
        VeilError::Storage(e.to_string())
    }
}

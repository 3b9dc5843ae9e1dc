//! Range proof errors.

use thiserror::Error;
use veil_core::VeilError;

/// Error during range proof generation or backend selection.
///
/// Verification never produces one of these: an invalid proof is `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeProofError {
    /// The value lies outside `[min, max]`; no proof is produced for a false
    /// statement.
    #[error("value is outside the range [{min}, {max}]")]
    OutOfRange {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// `min > max`.
    #[error("invalid range: min {min} exceeds max {max}")]
    InvalidBounds {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// The supplied value and blinding factor do not open the commitment.
    #[error("value and blinding factor do not open the commitment")]
    OpeningMismatch,

    /// The selected backend was not compiled into this build.
    #[error("range proof backend '{0}' is not available in this build")]
    BackendUnavailable(String),

    /// The backend failed internally while proving.
    #[error("prover error: {0}")]
    Prover(String),
}

impl From<RangeProofError> for VeilError {
    fn from(e: RangeProofError) -> Self {
        match e {
            RangeProofError::OutOfRange { min, max } => VeilError::OutOfRange { min, max },
            RangeProofError::BackendUnavailable(name) => VeilError::BackendUnavailable(name),
            other => VeilError::Validation(other.to_string()),
        }
    }
}

//! # Range Proof System Trait
//!
//! Defines the interface every range-proof backend satisfies and the opaque
//! [`RangeProof`] value that travels inside a transaction.
//!
//! ## Security Invariant
//!
//! - `prove` refuses false statements: a value outside `[min, max]`, or a
//!   `(value, blinding)` pair that does not open the commitment, is an error.
//! - `verify` is a pure function of `(commitment, proof, min, max)`. Changing
//!   any of the four makes it return `false`, as does any bit flip in the
//!   proof bytes.
//! - The trait is sealed. The set of backends is closed, so the orchestrator
//!   can hold a `dyn RangeProofSystem` without special-casing any of them.

use serde::{Deserialize, Serialize};
use veil_crypto::{BlindingFactor, PedersenCommitment};

use crate::backend::RangeProofBackend;
use crate::error::RangeProofError;

pub(crate) mod private {
    pub trait Sealed {}
}

/// An opaque range proof, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    /// Backend that produced the proof.
    pub backend: RangeProofBackend,
    /// Backend-specific encoding, hex in JSON.
    #[serde(with = "hex")]
    pub bytes: Vec<u8>,
}

impl RangeProof {
    pub(crate) fn new(backend: RangeProofBackend, bytes: Vec<u8>) -> Self {
        Self { backend, bytes }
    }

    /// Size of the encoded proof.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the proof carries no bytes (never true for a produced proof).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A range proof backend.
///
/// Sealed; implemented by [`EmulatedRangeProof`](crate::EmulatedRangeProof)
/// and, with the `bulletproofs` feature, by
/// [`BulletproofRangeProof`](crate::BulletproofRangeProof).
pub trait RangeProofSystem: private::Sealed + Send + Sync + std::fmt::Debug {
    /// Which backend this is.
    fn backend(&self) -> RangeProofBackend;

    /// Prove that `commitment` hides a value in `[min, max]`.
    ///
    /// # Errors
    ///
    /// - [`RangeProofError::InvalidBounds`] if `min > max`.
    /// - [`RangeProofError::OutOfRange`] if `value` is outside the range.
    /// - [`RangeProofError::OpeningMismatch`] if `(value, blinding)` does not
    ///   open `commitment`.
    fn prove(
        &self,
        commitment: &PedersenCommitment,
        value: u64,
        blinding: &BlindingFactor,
        min: u64,
        max: u64,
    ) -> Result<RangeProof, RangeProofError>;

    /// Check `proof` against `(commitment, min, max)`.
    fn verify(&self, commitment: &PedersenCommitment, proof: &RangeProof, min: u64, max: u64)
        -> bool;
}

/// Shared precondition checks for every backend's `prove`.
pub(crate) fn check_statement(
    commitment: &PedersenCommitment,
    value: u64,
    blinding: &BlindingFactor,
    min: u64,
    max: u64,
) -> Result<(), RangeProofError> {
    if min > max {
        return Err(RangeProofError::InvalidBounds { min, max });
    }
    if value < min || value > max {
        tracing::warn!(min, max, "refusing to prove a value outside its range");
        return Err(RangeProofError::OutOfRange { min, max });
    }
    if !veil_crypto::verify_opening(commitment, value, blinding) {
        return Err(RangeProofError::OpeningMismatch);
    }
    Ok(())
}

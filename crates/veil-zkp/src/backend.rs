//! # Backend Selection
//!
//! The active range-proof backend is chosen once, from configuration, and
//! handed to the orchestrator as an `Arc<dyn RangeProofSystem>`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::emulated::EmulatedRangeProof;
use crate::error::RangeProofError;
use crate::traits::RangeProofSystem;

/// Range proof algorithm choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeProofBackend {
    /// Two 64-bit Bulletproofs. Requires the `bulletproofs` feature.
    #[default]
    Bulletproof,
    /// Sigma-protocol proof of opening, for tests and emulation.
    Emulated,
}

impl RangeProofBackend {
    /// All backends, compiled in or not.
    pub const ALL: [RangeProofBackend; 2] = [Self::Bulletproof, Self::Emulated];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bulletproof => "bulletproof",
            Self::Emulated => "emulated",
        }
    }

    /// Whether this build can construct the backend.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Bulletproof => cfg!(feature = "bulletproofs"),
            Self::Emulated => true,
        }
    }
}

impl fmt::Display for RangeProofBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeProofBackend {
    type Err = RangeProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| RangeProofError::BackendUnavailable(s.to_string()))
    }
}

/// Construct the proof system for `backend`.
///
/// # Errors
///
/// [`RangeProofError::BackendUnavailable`] when the backend's feature is not
/// compiled in.
pub fn range_proof_system(
    backend: RangeProofBackend,
) -> Result<Arc<dyn RangeProofSystem>, RangeProofError> {
    tracing::debug!(backend = %backend, "selecting range proof backend");
    match backend {
        RangeProofBackend::Emulated => Ok(Arc::new(EmulatedRangeProof)),
        #[cfg(feature = "bulletproofs")]
        RangeProofBackend::Bulletproof => Ok(Arc::new(crate::bulletproof::BulletproofRangeProof)),
        #[cfg(not(feature = "bulletproofs"))]
        RangeProofBackend::Bulletproof => Err(RangeProofError::BackendUnavailable(
            backend.as_str().to_string(),
        )),
    }
}

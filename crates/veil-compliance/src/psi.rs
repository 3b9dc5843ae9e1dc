//! # Private Set Intersection
//!
//! A PSI scheme maps items to group-encoded elements such that equal items
//! are detectably equal under the scheme's key, while the elements alone
//! reveal nothing about the items to a party without that key.
//!
//! ## Security Invariant
//!
//! - Intersection compares every pair of `A × B` and accumulates the result
//!   in a `subtle::Choice`. There is no sorting, hashing or early exit, so
//!   timing does not reveal which non-matching pairs were compared.
//! - The trait is sealed. [`KeyedDhPsi`](crate::KeyedDhPsi) and
//!   [`ElGamalPsi`](crate::ElGamalPsi) are the only schemes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subtle::Choice;

use crate::elgamal_psi::ElGamalPsi;
use crate::error::ComplianceError;
use crate::keyed_dh::KeyedDhPsi;

pub(crate) mod private {
    pub trait Sealed {}
}

/// Domain label for hashing screened items to the group.
pub(crate) const ITEM_DOMAIN: &[u8] = b"veil/psi/item";

/// A private set intersection scheme.
pub trait PsiScheme: private::Sealed + Send + Sync {
    /// An encrypted item.
    type Element: Clone + Send + Sync;

    /// Which scheme this is.
    fn backend(&self) -> PsiBackend;

    /// Encrypt one item.
    fn encrypt_item(&self, item: &[u8]) -> Self::Element;

    /// Constant-time equality test between two encrypted items.
    fn matches(&self, a: &Self::Element, b: &Self::Element) -> Choice;

    /// Encrypt every item of a set.
    fn encrypt_set<I: AsRef<[u8]>>(&self, items: &[I]) -> Vec<Self::Element> {
        items.iter().map(|i| self.encrypt_item(i.as_ref())).collect()
    }

    /// Indices of `a` whose element matches some element of `b`.
    fn matching_positions(&self, a: &[Self::Element], b: &[Self::Element]) -> Vec<usize> {
        let mut hits = Vec::new();
        for (i, x) in a.iter().enumerate() {
            let mut hit = Choice::from(0);
            for y in b {
                hit |= self.matches(x, y);
            }
            if bool::from(hit) {
                hits.push(i);
            }
        }
        hits
    }

    /// The elements of `a` that match some element of `b`.
    fn intersect(&self, a: &[Self::Element], b: &[Self::Element]) -> Vec<Self::Element> {
        self.matching_positions(a, b)
            .into_iter()
            .map(|i| a[i].clone())
            .collect()
    }
}

/// Object-safe view of a [`PsiScheme`]: screens plaintext candidates against
/// a plaintext reference list, encrypting both under the scheme key.
pub trait SetScreen: Send + Sync + fmt::Debug {
    /// Which scheme performs the screening.
    fn backend(&self) -> PsiBackend;

    /// Indices of `candidates` present in `reference`.
    fn screen(&self, candidates: &[&[u8]], reference: &[&[u8]]) -> Vec<usize>;
}

impl<S: PsiScheme + fmt::Debug> SetScreen for S {
    fn backend(&self) -> PsiBackend {
        PsiScheme::backend(self)
    }

    fn screen(&self, candidates: &[&[u8]], reference: &[&[u8]]) -> Vec<usize> {
        let a = self.encrypt_set(candidates);
        let b = self.encrypt_set(reference);
        tracing::debug!(
            scheme = %PsiScheme::backend(self),
            candidates = a.len(),
            reference = b.len(),
            "psi intersection"
        );
        self.matching_positions(&a, &b)
    }
}

/// PSI scheme choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsiBackend {
    /// Deterministic keyed Diffie-Hellman encoding (Schnorr-style).
    #[default]
    KeyedDh,
    /// Re-randomized ElGamal encryption of the hashed item.
    #[serde(rename = "elgamal")]
    ElGamal,
}

impl PsiBackend {
    /// Every scheme.
    pub const ALL: [PsiBackend; 2] = [Self::KeyedDh, Self::ElGamal];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyedDh => "keyed_dh",
            Self::ElGamal => "elgamal",
        }
    }
}

impl fmt::Display for PsiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PsiBackend {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ComplianceError::BackendUnavailable(s.to_string()))
    }
}

/// Construct a fresh-keyed scheme for `backend`.
pub fn psi_scheme(backend: PsiBackend) -> Arc<dyn SetScreen> {
    tracing::debug!(scheme = %backend, "selecting psi scheme");
    match backend {
        PsiBackend::KeyedDh => Arc::new(KeyedDhPsi::generate()),
        PsiBackend::ElGamal => Arc::new(ElGamalPsi::generate()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(xs: &[&'static str]) -> Vec<&'static [u8]> {
        xs.iter().map(|s| s.as_bytes()).collect()
    }

    #[test]
    fn every_scheme_finds_exactly_the_common_items() {
        for backend in PsiBackend::ALL {
            let screen = psi_scheme(backend);
            let hits = screen.screen(
                &items(&["0xaaa", "0xbbb", "0xccc"]),
                &items(&["0xccc", "0xddd", "0xaaa"]),
            );
            assert_eq!(hits, vec![0, 2], "scheme {backend}");
        }
    }

    #[test]
    fn empty_reference_matches_nothing() {
        for backend in PsiBackend::ALL {
            assert!(psi_scheme(backend).screen(&items(&["0xaaa"]), &[]).is_empty());
        }
    }

    #[test]
    fn names_roundtrip() {
        for b in PsiBackend::ALL {
            assert_eq!(b.as_str().parse::<PsiBackend>().unwrap(), b);
            assert_eq!(
                serde_json::to_string(&b).unwrap(),
                format!("\"{}\"", b.as_str())
            );
        }
        assert!("paillier".parse::<PsiBackend>().is_err());
    }
}

//! # Keyed Diffie-Hellman PSI
//!
//! `E(item) = k · HashToPoint(item)` under a secret scalar `k`. The encoding
//! is deterministic, so equal items produce equal elements, and without `k`
//! an element cannot be linked to a guessed item (DDH).

use curve25519_dalek::scalar::Scalar;
use subtle::{Choice, ConstantTimeEq};
use veil_crypto::group::{hash_to_point, random_scalar, GroupElement};
use zeroize::Zeroize;

use crate::psi::{private, PsiBackend, PsiScheme, ITEM_DOMAIN};

/// Keyed-DH PSI with a per-instance secret exponent.
pub struct KeyedDhPsi {
    key: Scalar,
}

impl KeyedDhPsi {
    /// Draw a fresh secret exponent.
    pub fn generate() -> Self {
        Self {
            key: random_scalar(),
        }
    }
}

impl Drop for KeyedDhPsi {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for KeyedDhPsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyedDhPsi(<private>)")
    }
}

impl private::Sealed for KeyedDhPsi {}

impl PsiScheme for KeyedDhPsi {
    type Element = GroupElement;

    fn backend(&self) -> PsiBackend {
        PsiBackend::KeyedDh
    }

    fn encrypt_item(&self, item: &[u8]) -> GroupElement {
        GroupElement::from_point(&(self.key * hash_to_point(ITEM_DOMAIN, item)))
    }

    fn matches(&self, a: &GroupElement, b: &GroupElement) -> Choice {
        a.as_bytes().ct_eq(b.as_bytes())
    }
}

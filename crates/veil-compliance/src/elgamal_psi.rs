//! # ElGamal PSI
//!
//! Each item is encrypted as `(r·G, r·K + HashToPoint(item))` with fresh `r`,
//! so two encryptions of the same item look unrelated. Holding the scheme
//! secret `x` (where `K = x·G`), equality is tested without decrypting:
//!
//! ```text
//! (D1 - D2) == x · (C1 - C2)   ⇔   HashToPoint(a) == HashToPoint(b)
//! ```

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use subtle::{Choice, ConstantTimeEq};
use veil_crypto::group::{generator_g, hash_to_point, random_scalar};
use zeroize::Zeroize;

use crate::psi::{private, PsiBackend, PsiScheme, ITEM_DOMAIN};

/// A re-randomized ElGamal encryption of a hashed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElGamalElement {
    c: RistrettoPoint,
    d: RistrettoPoint,
}

/// ElGamal PSI with a per-instance key pair.
pub struct ElGamalPsi {
    secret: Scalar,
    public: RistrettoPoint,
}

impl ElGamalPsi {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        let secret = random_scalar();
        Self {
            secret,
            public: secret * generator_g(),
        }
    }
}

impl Drop for ElGamalPsi {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for ElGamalPsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ElGamalPsi(<private>)")
    }
}

impl private::Sealed for ElGamalPsi {}

impl PsiScheme for ElGamalPsi {
    type Element = ElGamalElement;

    fn backend(&self) -> PsiBackend {
        PsiBackend::ElGamal
    }

    fn encrypt_item(&self, item: &[u8]) -> ElGamalElement {
        let r = random_scalar();
        ElGamalElement {
            c: r * generator_g(),
            d: r * self.public + hash_to_point(ITEM_DOMAIN, item),
        }
    }

    fn matches(&self, a: &ElGamalElement, b: &ElGamalElement) -> Choice {
        (a.d - b.d).ct_eq(&(self.secret * (a.c - b.c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryptions_are_randomized_but_comparable() {
        let psi = ElGamalPsi::generate();
        let e1 = psi.encrypt_item(b"0xabc");
        let e2 = psi.encrypt_item(b"0xabc");
        assert_ne!(e1, e2);
        assert!(bool::from(psi.matches(&e1, &e2)));
        assert!(!bool::from(psi.matches(&e1, &psi.encrypt_item(b"0xabd"))));
    }

    #[test]
    fn another_key_cannot_test_equality() {
        let psi = ElGamalPsi::generate();
        let other = ElGamalPsi::generate();
        let e1 = psi.encrypt_item(b"0xabc");
        let e2 = psi.encrypt_item(b"0xabc");
        assert!(!bool::from(other.matches(&e1, &e2)));
    }

    #[test]
    fn intersect_counts_each_candidate_once() {
        let psi = ElGamalPsi::generate();
        let a = psi.encrypt_set(&["x", "y"]);
        let b = psi.encrypt_set(&["x", "x", "x"]);
        assert_eq!(psi.matching_positions(&a, &b), vec![0]);
    }
}

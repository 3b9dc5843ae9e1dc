//! # Emulated Range Proofs
//!
//! A lightweight backend for tests and the emulator. The proof is a Schnorr
//! proof of knowledge of the commitment opening, made non-interactive with a
//! Fiat-Shamir challenge over `(C, min, max, A)`:
//!
//! ```text
//! A  = a·G + b·H
//! e  = H_s("veil/range/emulated", C, min, max, A)
//! z1 = a + e·v
//! z2 = b + e·r
//! accept iff z1·G + z2·H == A + e·C
//! ```
//!
//! ## Security Notice
//!
//! Binding to the triple and bit-flip soundness hold cryptographically. The
//! range itself is enforced only by the prover refusing out-of-range values;
//! a malicious prover could prove an out-of-range opening. Use the
//! Bulletproof backend wherever the range matters.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use veil_crypto::group::{generator_g, generator_h, hash_to_scalar, random_scalar, GroupElement};
use veil_crypto::{BlindingFactor, PedersenCommitment};
use zeroize::Zeroizing;

use crate::backend::RangeProofBackend;
use crate::error::RangeProofError;
use crate::traits::{check_statement, private, RangeProof, RangeProofSystem};

const DOMAIN: &[u8] = b"veil/range/emulated";
const PROOF_LEN: usize = 96;

/// Sigma-protocol range proof backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmulatedRangeProof;

impl private::Sealed for EmulatedRangeProof {}

fn challenge(commitment: &PedersenCommitment, min: u64, max: u64, a: &[u8; 32]) -> Scalar {
    hash_to_scalar(
        DOMAIN,
        &[
            commitment.element().as_bytes().as_slice(),
            min.to_le_bytes().as_slice(),
            max.to_le_bytes().as_slice(),
            a.as_slice(),
        ],
    )
}

fn read_scalar(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Scalar::from_canonical_bytes(arr).into()
}

impl RangeProofSystem for EmulatedRangeProof {
    fn backend(&self) -> RangeProofBackend {
        RangeProofBackend::Emulated
    }

    fn prove(
        &self,
        commitment: &PedersenCommitment,
        value: u64,
        blinding: &BlindingFactor,
        min: u64,
        max: u64,
    ) -> Result<RangeProof, RangeProofError> {
        check_statement(commitment, value, blinding, min, max)?;

        let a = Zeroizing::new(random_scalar());
        let b = Zeroizing::new(random_scalar());
        let big_a = GroupElement::from_point(&(*a * generator_g() + *b * generator_h()));
        let e = challenge(commitment, min, max, big_a.as_bytes());
        let z1 = *a + e * Scalar::from(value);
        let z2 = *b + e * blinding.as_scalar();

        let mut bytes = Vec::with_capacity(PROOF_LEN);
        bytes.extend_from_slice(big_a.as_bytes());
        bytes.extend_from_slice(&z1.to_bytes());
        bytes.extend_from_slice(&z2.to_bytes());
        Ok(RangeProof::new(RangeProofBackend::Emulated, bytes))
    }

    fn verify(
        &self,
        commitment: &PedersenCommitment,
        proof: &RangeProof,
        min: u64,
        max: u64,
    ) -> bool {
        if proof.backend != RangeProofBackend::Emulated || proof.bytes.len() != PROOF_LEN || min > max
        {
            return false;
        }
        let Ok(c) = commitment.to_point() else {
            return false;
        };
        let mut a_bytes = [0u8; 32];
        a_bytes.copy_from_slice(&proof.bytes[..32]);
        let Ok(big_a) = GroupElement::from_bytes(a_bytes).decompress() else {
            return false;
        };
        let (Some(z1), Some(z2)) = (
            read_scalar(&proof.bytes[32..64]),
            read_scalar(&proof.bytes[64..96]),
        ) else {
            return false;
        };
        let e = challenge(commitment, min, max, &a_bytes);
        let lhs: RistrettoPoint = z1 * generator_g() + z2 * generator_h();
        lhs == big_a + e * c
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use veil_crypto::commit;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn complete_for_in_range_values(max in 1u64..=10_000_000, frac in 0.0f64..=1.0) {
            let v = ((max as f64) * frac) as u64;
            let (c, r) = commit(v, None).unwrap();
            let proof = EmulatedRangeProof.prove(&c, v, &r, 0, max).unwrap();
            prop_assert!(EmulatedRangeProof.verify(&c, &proof, 0, max));
        }

        #[test]
        fn never_proves_above_max(max in 0u64..1_000_000, excess in 1u64..1_000) {
            let v = max + excess;
            let (c, r) = commit(v, None).unwrap();
            let is_out_of_range = matches!(
                EmulatedRangeProof.prove(&c, v, &r, 0, max),
                Err(RangeProofError::OutOfRange { .. })
            );
            prop_assert!(is_out_of_range);
        }
    }
}

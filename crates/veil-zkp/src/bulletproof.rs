//! # Bulletproof Range Proofs
//!
//! Two 64-bit Bulletproofs split the statement `v ∈ [min, max]`:
//!
//! - lower: `v - min ∈ [0, 2^64)` on `C - min·G`, blinding `r`;
//! - upper: `max - v ∈ [0, 2^64)` on `max·G - C`, blinding `-r`.
//!
//! Both are produced over the same Pedersen generators as
//! [`veil_crypto::commit`], so the verifier derives both statement points from
//! the transaction commitment alone. Each side's Merlin transcript absorbs
//! `(C, min, max)`, which binds the proof to the triple.
//!
//! The `bulletproofs` crate sits on the `curve25519-dalek-ng` fork; points and
//! scalars cross over through their 32-byte encodings.
//!
//! Proof encoding: `len(lower) as u32 BE || lower || upper`.

use std::sync::OnceLock;

use bulletproofs::{BulletproofGens, PedersenGens, RangeProof as Bulletproof};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek_ng as dalek_ng;
use merlin::Transcript;
use veil_crypto::group::{generator_g, generator_h};
use veil_crypto::{BlindingFactor, PedersenCommitment};
use zeroize::Zeroize;

use crate::backend::RangeProofBackend;
use crate::error::RangeProofError;
use crate::traits::{check_statement, private, RangeProof, RangeProofSystem};

const TRANSCRIPT_LABEL: &[u8] = b"veil/range/bulletproof";
const BITS: usize = 64;

/// Bulletproof range proof backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct BulletproofRangeProof;

impl private::Sealed for BulletproofRangeProof {}

struct Generators {
    pedersen: PedersenGens,
    bulletproof: BulletproofGens,
}

fn to_ng_point(point: &RistrettoPoint) -> dalek_ng::ristretto::CompressedRistretto {
    dalek_ng::ristretto::CompressedRistretto(point.compress().to_bytes())
}

fn to_ng_scalar(scalar: &Scalar) -> dalek_ng::scalar::Scalar {
    let mut bytes = scalar.to_bytes();
    let converted = dalek_ng::scalar::Scalar::from_bytes_mod_order(bytes);
    bytes.zeroize();
    converted
}

fn generators() -> Result<&'static Generators, RangeProofError> {
    static GENS: OnceLock<Option<Generators>> = OnceLock::new();
    GENS.get_or_init(|| {
        let b = to_ng_point(&generator_g()).decompress()?;
        let b_blinding = to_ng_point(&generator_h()).decompress()?;
        tracing::debug!(bits = BITS, "initialised bulletproof generators");
        Some(Generators {
            pedersen: PedersenGens { B: b, B_blinding: b_blinding },
            bulletproof: BulletproofGens::new(BITS, 1),
        })
    })
    .as_ref()
    .ok_or_else(|| RangeProofError::BackendUnavailable("bulletproof generators".into()))
}

fn transcript(commitment: &PedersenCommitment, min: u64, max: u64, side: &'static [u8]) -> Transcript {
    let mut t = Transcript::new(TRANSCRIPT_LABEL);
    t.append_message(b"commitment", commitment.element().as_bytes());
    t.append_u64(b"min", min);
    t.append_u64(b"max", max);
    t.append_message(b"side", side);
    t
}

/// Statement points `(C - min·G, max·G - C)`.
fn statement_points(
    commitment: &PedersenCommitment,
    min: u64,
    max: u64,
) -> Option<(RistrettoPoint, RistrettoPoint)> {
    let c = commitment.to_point().ok()?;
    let g = generator_g();
    Some((c - Scalar::from(min) * g, Scalar::from(max) * g - c))
}

fn decode(bytes: &[u8]) -> Option<(Bulletproof, Bulletproof)> {
    let len_bytes: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    let split = 4usize.checked_add(u32::from_be_bytes(len_bytes) as usize)?;
    let lower = Bulletproof::from_bytes(bytes.get(4..split)?).ok()?;
    let upper = Bulletproof::from_bytes(bytes.get(split..)?).ok()?;
    Some((lower, upper))
}

impl RangeProofSystem for BulletproofRangeProof {
    fn backend(&self) -> RangeProofBackend {
        RangeProofBackend::Bulletproof
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
        let gens = generators()?;

        let r = to_ng_scalar(blinding.as_scalar());
        let neg_r = to_ng_scalar(&-blinding.as_scalar());

        let (lower, _) = Bulletproof::prove_single(
            &gens.bulletproof,
            &gens.pedersen,
            &mut transcript(commitment, min, max, b"lower"),
            value - min,
            &r,
            BITS,
        )
        .map_err(|e| RangeProofError::Prover(e.to_string()))?;
        let (upper, _) = Bulletproof::prove_single(
            &gens.bulletproof,
            &gens.pedersen,
            &mut transcript(commitment, min, max, b"upper"),
            max - value,
            &neg_r,
            BITS,
        )
        .map_err(|e| RangeProofError::Prover(e.to_string()))?;

        let lower = lower.to_bytes();
        let upper = upper.to_bytes();
        let lower_len = u32::try_from(lower.len())
            .map_err(|_| RangeProofError::Prover("proof too large".into()))?;
        let mut bytes = Vec::with_capacity(4 + lower.len() + upper.len());
        bytes.extend_from_slice(&lower_len.to_be_bytes());
        bytes.extend_from_slice(&lower);
        bytes.extend_from_slice(&upper);
        Ok(RangeProof::new(RangeProofBackend::Bulletproof, bytes))
    }

    fn verify(
        &self,
        commitment: &PedersenCommitment,
        proof: &RangeProof,
        min: u64,
        max: u64,
    ) -> bool {
        if proof.backend != RangeProofBackend::Bulletproof || min > max {
            return false;
        }
        let Ok(gens) = generators() else {
            return false;
        };
        let Some((lower_point, upper_point)) = statement_points(commitment, min, max) else {
            return false;
        };
        let Some((lower, upper)) = decode(&proof.bytes) else {
            return false;
        };
        let lower_ok = lower
            .verify_single(
                &gens.bulletproof,
                &gens.pedersen,
                &mut transcript(commitment, min, max, b"lower"),
                &to_ng_point(&lower_point),
                BITS,
            )
            .is_ok();
        let upper_ok = upper
            .verify_single(
                &gens.bulletproof,
                &gens.pedersen,
                &mut transcript(commitment, min, max, b"upper"),
                &to_ng_point(&upper_point),
                BITS,
            )
            .is_ok();
        lower_ok && upper_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_crypto::commit;

    #[test]
    fn proves_and_verifies_in_range() {
        let (c, r) = commit(100, None).unwrap();
        let proof = BulletproofRangeProof.prove(&c, 100, &r, 0, 1_000_000).unwrap();
        assert!(BulletproofRangeProof.verify(&c, &proof, 0, 1_000_000));
    }

    #[test]
    fn bounds_are_inclusive() {
        let (c, r) = commit(0, None).unwrap();
        let proof = BulletproofRangeProof.prove(&c, 0, &r, 0, 0).unwrap();
        assert!(BulletproofRangeProof.verify(&c, &proof, 0, 0));
        let (c, r) = commit(1_000_000, None).unwrap();
        let proof = BulletproofRangeProof.prove(&c, 1_000_000, &r, 0, 1_000_000).unwrap();
        assert!(BulletproofRangeProof.verify(&c, &proof, 0, 1_000_000));
    }

    #[test]
    fn refuses_out_of_range() {
        let (c, r) = commit(1_000_001, None).unwrap();
        assert_eq!(
            BulletproofRangeProof.prove(&c, 1_000_001, &r, 0, 1_000_000).unwrap_err(),
            RangeProofError::OutOfRange { min: 0, max: 1_000_000 }
        );
    }

    #[test]
    fn refuses_wrong_opening() {
        let (c, _) = commit(5, None).unwrap();
        assert_eq!(
            BulletproofRangeProof
                .prove(&c, 5, &BlindingFactor::random(), 0, 10)
                .unwrap_err(),
            RangeProofError::OpeningMismatch
        );
    }

    #[test]
    fn bound_to_range_and_commitment() {
        let (c1, r1) = commit(50, None).unwrap();
        let (c2, _) = commit(50, None).unwrap();
        let proof = BulletproofRangeProof.prove(&c1, 50, &r1, 0, 100).unwrap();
        assert!(BulletproofRangeProof.verify(&c1, &proof, 0, 100));
        assert!(!BulletproofRangeProof.verify(&c1, &proof, 0, 99));
        assert!(!BulletproofRangeProof.verify(&c1, &proof, 1, 100));
        assert!(!BulletproofRangeProof.verify(&c2, &proof, 0, 100));
    }

    #[test]
    fn bit_flips_are_rejected() {
        let (c, r) = commit(42, None).unwrap();
        let proof = BulletproofRangeProof.prove(&c, 42, &r, 0, 1000).unwrap();
        // Sample positions across the length prefix and both sub-proofs.
        let n = proof.bytes.len();
        for byte in [0, 3, 4, 40, n / 2, n - 40, n - 1] {
            for bit in [0u8, 7] {
                let mut tampered = proof.clone();
                tampered.bytes[byte] ^= 1 << bit;
                assert!(
                    !BulletproofRangeProof.verify(&c, &tampered, 0, 1000),
                    "flip at byte {byte} bit {bit} accepted"
                );
            }
        }
    }

    #[test]
    fn foreign_or_garbage_proof_is_rejected() {
        let (c, r) = commit(1, None).unwrap();
        let mut proof = BulletproofRangeProof.prove(&c, 1, &r, 0, 10).unwrap();
        proof.backend = RangeProofBackend::Emulated;
        assert!(!BulletproofRangeProof.verify(&c, &proof, 0, 10));
        let garbage = RangeProof::new(RangeProofBackend::Bulletproof, vec![0xff; 12]);
        assert!(!BulletproofRangeProof.verify(&c, &garbage, 0, 10));
    }
}

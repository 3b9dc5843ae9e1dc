//! # Confidential Amounts (Exponential ElGamal)
//!
//! A ciphertext for value `v` under public key `K = x·G` is
//! `(c1, c2) = (r·G, v·G + r·K)`. Component-wise addition of two ciphertexts
//! under the same key yields a ciphertext of the sum, which is what lets an
//! auditor total a participant's receipts without decrypting each one.
//!
//! Decryption recovers `v·G = c2 - x·c1` and solves the small discrete log
//! with baby-step giant-step. Values up to [`MAX_DECRYPTABLE_VALUE`]
//! (`2^32 - 1`) are recoverable; the baby-step table (`2^16` entries) is
//! built once per process.
//!
//! Every ciphertext carries the fingerprint of the key it was made for, so a
//! ciphertext presented to the wrong key fails with `KeyMismatch` instead of
//! returning garbage.

use std::collections::HashMap;
use std::sync::OnceLock;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, EncryptionError};
use crate::group::{generator_g, random_scalar, GroupElement};

/// Largest value that [`ElGamalKeypair::decrypt`] can recover.
pub const MAX_DECRYPTABLE_VALUE: u64 = u32::MAX as u64;

const BSGS_STEP: u64 = 1 << 16;

/// ElGamal public key `K = x·G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElGamalPublicKey(GroupElement);

impl ElGamalPublicKey {
    /// Wrap a compressed key.
    pub fn from_element(element: GroupElement) -> Self {
        Self(element)
    }

    /// The compressed key.
    pub fn element(&self) -> &GroupElement {
        &self.0
    }

    /// Parse a hex-encoded key, checking it decodes to a point.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let element = GroupElement::from_hex(s)?;
        element.decompress()?;
        Ok(Self(element))
    }

    /// Hex of the compressed key.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Short identifier for the key: hex of the first 8 bytes of
    /// SHA-256 over the compressed encoding.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..8])
    }

    /// Encrypt `value` to this key.
    ///
    /// # Errors
    ///
    /// - [`EncryptionError::ValueTooLarge`] if `value > MAX_DECRYPTABLE_VALUE`.
    /// - [`EncryptionError::MalformedCiphertext`] if this key does not decode.
    pub fn encrypt(&self, value: u64) -> Result<EncryptedAmount, EncryptionError> {
        if value > MAX_DECRYPTABLE_VALUE {
            return Err(EncryptionError::ValueTooLarge {
                value,
                max: MAX_DECRYPTABLE_VALUE,
            });
        }
        let key = self
            .0
            .decompress()
            .map_err(|e| EncryptionError::MalformedCiphertext(format!("public key: {e}")))?;
        let r = Zeroizing::new(random_scalar());
        let c1 = *r * generator_g();
        let c2 = Scalar::from(value) * generator_g() + *r * key;
        Ok(EncryptedAmount {
            key_id: self.fingerprint(),
            c1: GroupElement::from_point(&c1),
            c2: GroupElement::from_point(&c2),
        })
    }
}

/// ElGamal secret key `x`. Zeroized on drop.
pub struct ElGamalSecretKey(Scalar);

impl ElGamalSecretKey {
    /// Parse a canonical scalar from hex.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyError`] for wrong length, bad hex or a non-canonical
    /// scalar. Callers treat this as a fatal configuration error.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|e| CryptoError::KeyError(format!("elgamal secret key hex: {e}")))?;
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(bytes).into();
        bytes.zeroize();
        scalar
            .map(Self)
            .ok_or_else(|| CryptoError::KeyError("elgamal secret key is not canonical".into()))
    }

    /// Hex of the secret scalar, for writing key files.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0.to_bytes()))
    }
}

impl Drop for ElGamalSecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for ElGamalSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ElGamalSecretKey(<private>)")
    }
}

/// An ElGamal key pair for receiving or auditing confidential amounts.
#[derive(Debug)]
pub struct ElGamalKeypair {
    secret: ElGamalSecretKey,
    public: ElGamalPublicKey,
}

impl ElGamalKeypair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self::from_scalar(random_scalar())
    }

    /// Rebuild a key pair from its secret.
    pub fn from_secret(secret: ElGamalSecretKey) -> Self {
        let public = ElGamalPublicKey(GroupElement::from_point(&(secret.0 * generator_g())));
        Self { secret, public }
    }

    fn from_scalar(x: Scalar) -> Self {
        Self::from_secret(ElGamalSecretKey(x))
    }

    /// The public half.
    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public
    }

    /// The secret half.
    pub fn secret_key(&self) -> &ElGamalSecretKey {
        &self.secret
    }

    /// Recover the plaintext of `ct`.
    ///
    /// # Errors
    ///
    /// - [`EncryptionError::KeyMismatch`] if `ct` was made for another key.
    /// - [`EncryptionError::MalformedCiphertext`] if a component is not a point.
    /// - [`EncryptionError::OutOfDecryptableRange`] if the plaintext exceeds
    ///   [`MAX_DECRYPTABLE_VALUE`] (possible after homomorphic addition).
    pub fn decrypt(&self, ct: &EncryptedAmount) -> Result<u64, EncryptionError> {
        let expected = self.public.fingerprint();
        if ct.key_id != expected {
            return Err(EncryptionError::KeyMismatch {
                expected,
                found: ct.key_id.clone(),
            });
        }
        let (c1, c2) = ct.points()?;
        let m = c2 - self.secret.0 * c1;
        solve_small_dlog(&m).ok_or(EncryptionError::OutOfDecryptableRange {
            max: MAX_DECRYPTABLE_VALUE,
        })
    }
}

/// A confidential amount: ElGamal ciphertext tagged with its key fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAmount {
    /// Fingerprint of the recipient public key.
    pub key_id: String,
    /// `r·G`.
    pub c1: GroupElement,
    /// `v·G + r·K`.
    pub c2: GroupElement,
}

impl EncryptedAmount {
    /// An encryption of zero with zero randomness, the identity for [`add`](Self::add).
    pub fn zero(key: &ElGamalPublicKey) -> Self {
        let identity = GroupElement::from_point(&RistrettoPoint::identity());
        Self {
            key_id: key.fingerprint(),
            c1: identity,
            c2: identity,
        }
    }

    /// Homomorphic addition: the result decrypts to the sum of the plaintexts.
    ///
    /// # Errors
    ///
    /// [`EncryptionError::KeyMismatch`] if the operands were made for
    /// different keys, [`EncryptionError::MalformedCiphertext`] if either
    /// operand does not decode.
    pub fn add(&self, other: &EncryptedAmount) -> Result<EncryptedAmount, EncryptionError> {
        if self.key_id != other.key_id {
            return Err(EncryptionError::KeyMismatch {
                expected: self.key_id.clone(),
                found: other.key_id.clone(),
            });
        }
        let (a1, a2) = self.points()?;
        let (b1, b2) = other.points()?;
        Ok(EncryptedAmount {
            key_id: self.key_id.clone(),
            c1: GroupElement::from_point(&(a1 + b1)),
            c2: GroupElement::from_point(&(a2 + b2)),
        })
    }

    fn points(&self) -> Result<(RistrettoPoint, RistrettoPoint), EncryptionError> {
        let c1 = self
            .c1
            .decompress()
            .map_err(|e| EncryptionError::MalformedCiphertext(format!("c1: {e}")))?;
        let c2 = self
            .c2
            .decompress()
            .map_err(|e| EncryptionError::MalformedCiphertext(format!("c2: {e}")))?;
        Ok((c1, c2))
    }
}

/// Compressed `j·G` for `j in [0, BSGS_STEP)`, mapped to `j`.
fn baby_steps() -> &'static HashMap<[u8; 32], u32> {
    static TABLE: OnceLock<HashMap<[u8; 32], u32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        // Batch compression: `double_and_compress_batch` returns compress(2·P)
        // with one shared inversion, so feed it multiples of G/2.
        let half_g = Scalar::from(2u64).invert() * generator_g();
        let mut points = Vec::with_capacity(BSGS_STEP as usize - 1);
        let mut acc = half_g;
        for _ in 1..BSGS_STEP {
            points.push(acc);
            acc += half_g;
        }
        let compressed = RistrettoPoint::double_and_compress_batch(&points);
        tracing::debug!(entries = compressed.len() + 1, "built elgamal baby-step table");
        let mut table: HashMap<[u8; 32], u32> = compressed
            .into_iter()
            .zip(1u32..)
            .map(|(c, j)| (c.to_bytes(), j))
            .collect();
        table.insert(RistrettoPoint::identity().compress().to_bytes(), 0);
        table
    })
}

/// Find `v < 2^32` with `v·G == m`.
fn solve_small_dlog(m: &RistrettoPoint) -> Option<u64> {
    let table = baby_steps();
    let giant = Scalar::from(BSGS_STEP) * generator_g();
    let mut y = *m;
    for i in 0..BSGS_STEP {
        if let Some(j) = table.get(&y.compress().to_bytes()) {
            return Some(i * BSGS_STEP + u64::from(*j));
        }
        y -= giant;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let kp = ElGamalKeypair::generate();
        for v in [0u64, 1, 100, 65_535, 65_536, 1_000_000] {
            let ct = kp.public_key().encrypt(v).unwrap();
            assert_eq!(kp.decrypt(&ct).unwrap(), v);
        }
    }

    #[test]
    fn ciphertexts_are_randomized() {
        let kp = ElGamalKeypair::generate();
        let a = kp.public_key().encrypt(10).unwrap();
        let b = kp.public_key().encrypt(10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn homomorphic_addition() {
        let kp = ElGamalKeypair::generate();
        let a = kp.public_key().encrypt(250).unwrap();
        let b = kp.public_key().encrypt(750).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(kp.decrypt(&sum).unwrap(), 1_000);
    }

    #[test]
    fn zero_is_additive_identity() {
        let kp = ElGamalKeypair::generate();
        let a = kp.public_key().encrypt(77).unwrap();
        let total = EncryptedAmount::zero(kp.public_key()).add(&a).unwrap();
        assert_eq!(kp.decrypt(&total).unwrap(), 77);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let alice = ElGamalKeypair::generate();
        let bob = ElGamalKeypair::generate();
        let ct = alice.public_key().encrypt(5).unwrap();
        assert!(matches!(
            bob.decrypt(&ct),
            Err(EncryptionError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn adding_across_keys_is_rejected() {
        let a = ElGamalKeypair::generate();
        let b = ElGamalKeypair::generate();
        let ca = a.public_key().encrypt(1).unwrap();
        let cb = b.public_key().encrypt(1).unwrap();
        assert!(matches!(ca.add(&cb), Err(EncryptionError::KeyMismatch { .. })));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        let kp = ElGamalKeypair::generate();
        let mut ct = kp.public_key().encrypt(5).unwrap();
        ct.c2 = GroupElement::from_bytes([0xff; 32]);
        assert!(matches!(
            kp.decrypt(&ct),
            Err(EncryptionError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn value_above_decryptable_range_refused() {
        let kp = ElGamalKeypair::generate();
        assert!(matches!(
            kp.public_key().encrypt(MAX_DECRYPTABLE_VALUE + 1),
            Err(EncryptionError::ValueTooLarge { .. })
        ));
    }

    #[test]
    fn sum_past_range_reports_out_of_range() {
        let kp = ElGamalKeypair::generate();
        let a = kp.public_key().encrypt(MAX_DECRYPTABLE_VALUE).unwrap();
        let b = kp.public_key().encrypt(1).unwrap();
        let sum = a.add(&b).unwrap();
        assert!(matches!(
            kp.decrypt(&sum),
            Err(EncryptionError::OutOfDecryptableRange { .. })
        ));
    }

    #[test]
    fn secret_key_hex_roundtrip() {
        let kp = ElGamalKeypair::generate();
        let secret = ElGamalSecretKey::from_hex(&kp.secret_key().to_hex()).unwrap();
        let restored = ElGamalKeypair::from_secret(secret);
        assert_eq!(restored.public_key(), kp.public_key());
        assert!(ElGamalSecretKey::from_hex("not hex").is_err());
    }

    #[test]
    fn debug_never_prints_secret() {
        let kp = ElGamalKeypair::generate();
        let dbg = format!("{kp:?}");
        assert!(dbg.contains("<private>"));
        assert!(!dbg.contains(kp.secret_key().to_hex().as_str()));
    }
}

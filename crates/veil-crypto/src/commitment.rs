//! # Pedersen Commitments
//!
//! `C = v·G + r·H` over Ristretto255. Hiding comes from the uniformly random
//! blinding factor `r`; binding from nobody knowing `log_G(H)`.
//!
//! ## Security Invariant
//!
//! - A fresh blinding factor is drawn for every commitment unless the caller
//!   passes one explicitly (used only when value equality is intended, e.g.
//!   re-deriving a commitment for audit).
//! - [`verify_opening()`] compares encodings in constant time and returns
//!   `false` for any mismatch. It never errors.
//! - Values above [`MAX_COMMITTABLE_VALUE`] (`2^53 - 1`) are refused. Amounts
//!   travel as canonical JSON integers, which are only exact up to that bound.

use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::CommitmentError;
use crate::group::{generator_g, generator_h, random_scalar, GroupElement};

/// Largest value a commitment may hide.
pub const MAX_COMMITTABLE_VALUE: u64 = (1 << 53) - 1;

/// A Pedersen commitment, stored as its compressed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PedersenCommitment(GroupElement);

impl PedersenCommitment {
    /// Wrap an already-compressed commitment point.
    pub fn from_element(element: GroupElement) -> Self {
        Self(element)
    }

    /// The compressed encoding.
    pub fn element(&self) -> &GroupElement {
        &self.0
    }

    /// Decode the commitment point.
    pub fn to_point(&self) -> Result<curve25519_dalek::ristretto::RistrettoPoint, CommitmentError> {
        self.0
            .decompress()
            .map_err(|e| CommitmentError::Malformed(e.to_string()))
    }

    /// Lowercase hex of the compressed point.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

/// The secret blinding factor `r` of a commitment. Zeroized on drop.
#[derive(Clone)]
pub struct BlindingFactor(Scalar);

impl BlindingFactor {
    /// Draw a uniformly random blinding factor.
    pub fn random() -> Self {
        Self(random_scalar())
    }

    /// Wrap an explicit scalar.
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// The underlying scalar.
    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }

    /// Hex of the canonical scalar encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Parse a canonical scalar encoding from hex.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|e| CommitmentError::Malformed(format!("blinding factor hex: {e}")))?;
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(bytes).into();
        bytes.zeroize();
        scalar
            .map(Self)
            .ok_or_else(|| CommitmentError::Malformed("blinding factor is not canonical".into()))
    }
}

impl Drop for BlindingFactor {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlindingFactor(<private>)")
    }
}

impl Serialize for BlindingFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlindingFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A value together with the blinding factor that opens its commitment.
///
/// Handed back to the transaction creator; never written to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentOpening {
    /// The committed value.
    pub value: u64,
    /// The blinding factor.
    pub blinding: BlindingFactor,
}

/// Commit to `value`, drawing a fresh blinding factor unless one is given.
///
/// # Errors
///
/// [`CommitmentError::ValueTooLarge`] if `value > MAX_COMMITTABLE_VALUE`.
pub fn commit(
    value: u64,
    blinding: Option<BlindingFactor>,
) -> Result<(PedersenCommitment, BlindingFactor), CommitmentError> {
    if value > MAX_COMMITTABLE_VALUE {
        return Err(CommitmentError::ValueTooLarge {
            value,
            max: MAX_COMMITTABLE_VALUE,
        });
    }
    let blinding = blinding.unwrap_or_else(BlindingFactor::random);
    let point = Scalar::from(value) * generator_g() + blinding.0 * generator_h();
    Ok((
        PedersenCommitment(GroupElement::from_point(&point)),
        blinding,
    ))
}

/// Check that `(value, blinding)` opens `commitment`.
pub fn verify_opening(
    commitment: &PedersenCommitment,
    value: u64,
    blinding: &BlindingFactor,
) -> bool {
    if value > MAX_COMMITTABLE_VALUE {
        return false;
    }
    let expected = Scalar::from(value) * generator_g() + blinding.0 * generator_h();
    let expected = GroupElement::from_point(&expected);
    expected.as_bytes().ct_eq(commitment.0.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_then_open() {
        let (c, r) = commit(100, None).unwrap();
        assert!(verify_opening(&c, 100, &r));
    }

    #[test]
    fn wrong_value_does_not_open() {
        let (c, r) = commit(100, None).unwrap();
        assert!(!verify_opening(&c, 101, &r));
    }

    #[test]
    fn wrong_blinding_does_not_open() {
        let (c, _) = commit(100, None).unwrap();
        assert!(!verify_opening(&c, 100, &BlindingFactor::random()));
    }

    #[test]
    fn fresh_blindings_hide_equal_values() {
        let (c1, _) = commit(5, None).unwrap();
        let (c2, _) = commit(5, None).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn explicit_blinding_is_deterministic() {
        let r = BlindingFactor::random();
        let (c1, _) = commit(7, Some(r.clone())).unwrap();
        let (c2, _) = commit(7, Some(r)).unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn value_above_bound_rejected() {
        let err = commit(MAX_COMMITTABLE_VALUE + 1, None).unwrap_err();
        assert!(matches!(err, CommitmentError::ValueTooLarge { .. }));
        assert!(commit(MAX_COMMITTABLE_VALUE, None).is_ok());
    }

    #[test]
    fn blinding_hex_roundtrip() {
        let (c, r) = commit(42, None).unwrap();
        let parsed = BlindingFactor::from_hex(&r.to_hex()).unwrap();
        assert!(verify_opening(&c, 42, &parsed));
        assert!(BlindingFactor::from_hex(&"ff".repeat(32)).is_err());
    }

    #[test]
    fn blinding_debug_is_redacted() {
        let r = BlindingFactor::random();
        assert_eq!(format!("{r:?}"), "BlindingFactor(<private>)");
    }

    #[test]
    fn opening_serializes_with_hex_blinding() {
        let (c, r) = commit(9, None).unwrap();
        let opening = CommitmentOpening { value: 9, blinding: r };
        let json = serde_json::to_string(&opening).unwrap();
        let back: CommitmentOpening = serde_json::from_str(&json).unwrap();
        assert!(verify_opening(&c, back.value, &back.blinding));
    }
}

//! # Group Helpers
//!
//! The ledger treats Ristretto255 as an opaque prime-order group. This module
//! fixes the two Pedersen generators and the hashing conventions every other
//! component builds on.
//!
//! - `G` is the Ristretto basepoint.
//! - `H` is hashed to the group from a fixed domain label, so nobody knows
//!   `log_G(H)`.

use std::sync::OnceLock;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};

use crate::error::CryptoError;

/// Domain label hashed to obtain the blinding generator `H`.
pub const PEDERSEN_H_LABEL: &[u8] = b"veil/pedersen/H";

/// The value generator `G`.
pub fn generator_g() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// The blinding generator `H`.
pub fn generator_h() -> RistrettoPoint {
    static H: OnceLock<RistrettoPoint> = OnceLock::new();
    *H.get_or_init(|| RistrettoPoint::hash_from_bytes::<Sha512>(PEDERSEN_H_LABEL))
}

/// A scalar drawn uniformly from `[0, order)` using the OS RNG.
pub fn random_scalar() -> Scalar {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

/// Hash a domain-separated message to a group element.
pub fn hash_to_point(domain: &[u8], msg: &[u8]) -> RistrettoPoint {
    let mut hasher = Sha512::new();
    hasher.update((domain.len() as u64).to_le_bytes());
    hasher.update(domain);
    hasher.update(msg);
    RistrettoPoint::from_hash(hasher)
}

/// Hash a domain-separated sequence of byte strings to a scalar.
///
/// Each part is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn hash_to_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update((domain.len() as u64).to_le_bytes());
    hasher.update(domain);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    Scalar::from_hash(hasher)
}

/// A compressed Ristretto point. Serializes as 64 hex characters.
///
/// Decoding is deferred: a `GroupElement` read from storage may not be a
/// valid point, and callers that need the point go through
/// [`GroupElement::decompress()`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupElement([u8; 32]);

impl GroupElement {
    /// Compress a point.
    pub fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }

    /// Wrap raw compressed bytes without validation.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The compressed encoding.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode the point, failing if the bytes are not a canonical encoding.
    pub fn decompress(&self) -> Result<RistrettoPoint, CryptoError> {
        CompressedRistretto(self.0)
            .decompress()
            .ok_or_else(|| CryptoError::MalformedPoint(format!("{}...", &self.to_hex()[..8])))
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut out)
            .map_err(|e| CryptoError::MalformedPoint(format!("invalid hex: {e}")))?;
        Ok(Self(out))
    }
}

impl std::fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupElement({}...)", &self.to_hex()[..8])
    }
}

impl Serialize for GroupElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for GroupElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

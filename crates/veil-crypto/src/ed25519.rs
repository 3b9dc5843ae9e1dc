//! # Ed25519 Signatures and Addresses
//!
//! Transaction signatures bind the sender to every field except the
//! signature itself.
//!
//! ## Security Invariant
//!
//! - Signing input is `&CanonicalBytes`; raw bytes cannot be signed, so two
//!   implementations can never disagree on what was signed.
//! - `Ed25519KeyPair` does not implement `Serialize` and its `Debug` output
//!   is redacted. The secret can only leave through
//!   [`Ed25519KeyPair::to_secret_hex()`], which returns a zeroizing buffer.
//! - [`verify()`] returns a `bool`. Malformed keys or signatures are a
//!   `false`, never a panic.
//! - A malformed secret key is a fatal configuration error:
//!   [`Ed25519KeyPair::from_secret_hex()`] fails at construction, before any
//!   transaction is built.
//!
//! ## Addresses
//!
//! `derive_address(pk) = "0x" || hex(SHA-256(pk)[12..32])`: the last 20
//! bytes of the public key digest.

use ed25519_dalek::Signer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use veil_core::{Address, CanonicalBytes};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

/// An Ed25519 public key. Serializes as 64 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

/// An Ed25519 signature. Serializes as 128 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; 64]);

/// An Ed25519 signing key pair.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Wrap raw key bytes. Validity is checked at verification time.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut arr)
            .map_err(|e| CryptoError::KeyError(format!("public key hex: {e}")))?;
        Ok(Self(arr))
    }

    /// The address this key controls.
    pub fn address(&self) -> Address {
        derive_address(self)
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut arr = [0u8; 64];
        hex::decode_to_slice(s.trim(), &mut arr)
            .map_err(|e| CryptoError::VerificationFailed(format!("signature hex: {e}")))?;
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", &self.to_hex()[..8])
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Build from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Load a secret key from 64 hex characters.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyError`] for anything that is not exactly 32 bytes of
    /// hex. Treated by callers as fatal.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let mut seed = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut seed)
            .map_err(|e| CryptoError::KeyError(format!("secret key hex: {e}")))?;
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    /// Hex of the secret seed, for writing key files.
    pub fn to_secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }

    /// The public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The address controlled by this key pair.
    pub fn address(&self) -> Address {
        derive_address(&self.public_key())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Ed25519KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification and addresses
// ---------------------------------------------------------------------------

/// Verify `signature` over `data` under `public_key`.
///
/// Uses strict verification (rejects small-order keys and non-canonical
/// `R`). Any decoding failure yields `false`.
pub fn verify(
    data: &CanonicalBytes,
    public_key: &Ed25519PublicKey,
    signature: &Ed25519Signature,
) -> bool {
    let Ok(vk) = ed25519_dalek::VerifyingKey::from_bytes(&public_key.0) else {
        tracing::debug!("signature check against undecodable public key");
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(data.as_bytes(), &sig).is_ok()
}

/// Derive the `0x` address of a public key.
pub fn derive_address(public_key: &Ed25519PublicKey) -> Address {
    let digest = Sha256::digest(public_key.0);
    Address::from_bytes(&digest[12..])
}

//! # veil-crypto — Cryptographic Primitives
//!
//! - **Group helpers** over Ristretto255: the two Pedersen generators,
//!   uniform scalar sampling, hash-to-point and hash-to-scalar.
//! - **Pedersen commitments** `C = v·G + r·H` with constant-time opening
//!   verification.
//! - **Confidential amounts**: exponential ElGamal, additively homomorphic,
//!   decryptable by the recipient or an auditor holding the secret key.
//! - **Ed25519** signing over `CanonicalBytes` and `0x` address derivation.
//!
//! ## Crate Policy
//!
//! - Secret material (`BlindingFactor`, `ElGamalSecretKey`, `Ed25519KeyPair`)
//!   is zeroized on drop and prints `<private>` in `Debug`.
//! - Verification never panics: malformed inputs yield `false` or a typed
//!   error.

pub mod commitment;
pub mod ed25519;
pub mod elgamal;
pub mod error;
pub mod group;

pub use commitment::{commit, verify_opening, BlindingFactor, CommitmentOpening, PedersenCommitment, MAX_COMMITTABLE_VALUE};
pub use ed25519::{derive_address, verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use elgamal::{ElGamalKeypair, ElGamalPublicKey, ElGamalSecretKey, EncryptedAmount, MAX_DECRYPTABLE_VALUE};
pub use error::{CommitmentError, CryptoError, EncryptionError};
pub use group::GroupElement;

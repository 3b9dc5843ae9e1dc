//! # veil-zkp — Range Proofs
//!
//! Proves that a Pedersen commitment hides a value in `[min, max]` without
//! revealing it.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): the sealed `RangeProofSystem` interface and the
//!   opaque, backend-tagged `RangeProof`.
//! - **Bulletproof** (`bulletproof.rs`, feature `bulletproofs`): two 64-bit
//!   Bulletproofs, one per side of the interval.
//! - **Emulated** (`emulated.rs`): a Schnorr proof of opening bound to the
//!   triple. Cheap; the range is enforced only by the prover.
//! - **Backend** (`backend.rs`): `RangeProofBackend` and the one-time
//!   construction of the selected system.
//!
//! ## Crate Policy
//!
//! - Callers never branch on the backend. They hold an
//!   `Arc<dyn RangeProofSystem>` and call `prove` / `verify`.
//! - `verify` returns `bool` and never panics on malformed input.

pub mod backend;
#[cfg(feature = "bulletproofs")]
pub mod bulletproof;
pub mod emulated;
pub mod error;
pub mod traits;

pub use backend::{range_proof_system, RangeProofBackend};
#[cfg(feature = "bulletproofs")]
pub use bulletproof::BulletproofRangeProof;
pub use emulated::EmulatedRangeProof;
pub use error::RangeProofError;
pub use traits::{RangeProof, RangeProofSystem};

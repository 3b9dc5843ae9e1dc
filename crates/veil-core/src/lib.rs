//! # veil-core — Foundational Types for the Veil Ledger
//!
//! Every other crate in the workspace depends on `veil-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Transaction ids, notary record ids and
//!    signed payloads are all computed over `CanonicalBytes::new()` output.
//!    Field insertion order can never change an id.
//!
//! 2. **Validated identifiers.** `Address`, `TxId`, `RecordId` and `Family`
//!    are newtypes with checked constructors. A `Family` can never contain the
//!    key separator ambiguity that a bare string would allow.
//!
//! 3. **UTC-only timestamps, injectable clock.** `Timestamp` is seconds
//!    precision with a `Z` suffix. Anything that compares against "now" takes
//!    a [`Clock`] so window arithmetic is testable.
//!
//! 4. **One error taxonomy.** [`VeilError`] carries a stable [`ErrorCode`]
//!    per failure kind so callers can branch on it.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `veil-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, ErrorCode, IdentifierError, VeilError};
pub use identity::{Address, Family, RecordId, TxId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};

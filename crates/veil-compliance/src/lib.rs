//! # veil-compliance — Private Compliance Screening
//!
//! Decides whether a transaction's parties may transact without the ledger
//! learning list contents beyond the matches themselves.
//!
//! - **PSI** (`psi.rs`): the sealed `PsiScheme` trait, the object-safe
//!   `SetScreen` view, and scheme selection.
//! - **Keyed DH** (`keyed_dh.rs`) and **ElGamal** (`elgamal_psi.rs`): the
//!   two schemes.
//! - **Lists** (`lists.rs`): blacklist / whitelist entries in a KV store.
//! - **Engine** (`engine.rs`): the compliance decision.

pub mod elgamal_psi;
pub mod engine;
pub mod error;
pub mod keyed_dh;
pub mod lists;
pub mod psi;

pub use elgamal_psi::ElGamalPsi;
pub use engine::{
    ComplianceConfig, ComplianceEngine, ComplianceLevel, ComplianceResult, ComplianceStatus,
};
pub use error::ComplianceError;
pub use keyed_dh::KeyedDhPsi;
pub use lists::{AddressList, ListKind};
pub use psi::{psi_scheme, PsiBackend, PsiScheme, SetScreen};

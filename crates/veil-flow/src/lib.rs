//! # veil-flow — Transaction Flow Orchestration
//!
//! Ties the primitives together into the confidential transfer pipeline:
//!
//! - **Config** (`config.rs`): `FlowConfig`, loaded from YAML and validated
//!   once; backend selection happens here, not per call.
//! - **Lifecycle** (`lifecycle.rs`): the `Created → Signed → Screened →
//!   Stored → Anchored → {Cancelled | Expired}` typestate.
//! - **Orchestrator** (`orchestrator.rs`): `TransactionFlow`, the create,
//!   submit, validate, anchor and cancel operations and the derived queries.
//! - **Emulator** (`emulator.rs`): an in-memory flow on a manual clock for
//!   scripted scenarios.
//!
//! ## Crate Policy
//!
//! Every public operation reports through [`veil_core::VeilError`] so callers
//! branch on one stable error code.

pub mod config;
pub mod emulator;
pub mod lifecycle;
pub mod orchestrator;

pub use config::{FlowConfig, FlowConfigError, MAX_TRANSFER_AMOUNT};
pub use emulator::{Emulator, Scenario, Step, StepReport, DEFAULT_START_EPOCH};
pub use lifecycle::{
    Anchored, AnchorState, AnchorStatus, Cancelled, Created, Expired, Screened, Signed, Stored,
    TransitionRecord, TxLifecycle,
};
pub use orchestrator::{CreatedTransaction, FlowReceipt, FlowStores, TransactionFlow};

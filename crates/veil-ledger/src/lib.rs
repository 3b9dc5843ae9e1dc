//! # veil-ledger — Transactions and Their Stores
//!
//! - **Transaction** (`transaction.rs`): header, content id, signable
//!   payload, structural validation.
//! - **Ledger** (`ledger.rs`): at-most-once storage keyed `<family>_<tx_id>`,
//!   listing, administrative delete, balance by partition scan.
//! - **Notary** (`notary.rs`): anchors with a cancellation window and lazy
//!   expiry on read.
//! - **Export** (`export.rs`): `Key,Data` CSV dump of any store.
//!
//! Both stores take an explicit `Arc<dyn KvStore>` handle; nothing here opens
//! a database on its own.

pub mod error;
pub mod export;
pub mod ledger;
pub mod notary;
pub mod transaction;

pub use error::{LedgerError, NotaryError};
pub use export::export_csv;
pub use ledger::LedgerStore;
pub use notary::{NotaryRecord, NotaryStore};
pub use transaction::{Transaction, TransactionHeader, UnsignedTransaction};

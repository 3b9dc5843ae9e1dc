//! # veil-store — Transactional KV Storage
//!
//! The ledger and notary stores sit on a small transactional key-value
//! contract rather than on any one engine.
//!
//! ## Architecture
//!
//! - **Contract** (`kv.rs`): `KvStore` hands out read and write
//!   transactions; `KvStoreExt::read` / `KvStoreExt::write` scope them to a
//!   closure, committing on `Ok` and aborting on `Err`.
//! - **Memory** (`memory.rs`): `MemoryKv`, for tests and the emulator.
//! - **Disk** (`disk.rs`, feature `sled`): `SledKv`, used by the CLI.
//! - **Keys** (`keys.rs`): the `<family>_<hexId>` key format.
//!
//! ## Crate Policy
//!
//! - Values are opaque bytes. Encoding is the caller's concern.
//! - Store handles are explicit values with an open/drop lifecycle. There
//!   are no process-wide singletons.

#[cfg(feature = "sled")]
pub mod disk;
pub mod error;
pub mod keys;
pub mod kv;
pub mod memory;
mod overlay;

#[cfg(feature = "sled")]
pub use disk::SledKv;
pub use error::StoreError;
pub use keys::{family_prefix, record_id_in_family, record_key, split_record_key};
pub use kv::{KvStore, KvStoreExt, ReadTxn, WriteTxn};
pub use memory::MemoryKv;

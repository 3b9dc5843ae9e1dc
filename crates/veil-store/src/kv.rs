//! # Transactional KV Contract
//!
//! Every access to a store happens inside an explicit transaction scope:
//!
//! ```text
//! store.read(|txn| ...)        // consistent snapshot, concurrent with other readers
//! store.write(|txn| ...)       // exclusive; commits on Ok, aborts on Err
//! ```
//!
//! ## Security Invariant
//!
//! - A write scope observes a consistent snapshot and commits atomically.
//!   Writers are serialized, so `put_if_absent` on the same key from
//!   concurrent writers succeeds exactly once.
//! - A read scope never observes a half-applied write.
//! - Scopes are released on every exit path. An `Err` (or a panic) inside a
//!   write scope discards all staged changes.

use crate::error::StoreError;

/// Read operations available inside any transaction.
pub trait ReadTxn {
    /// Value stored at `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Whether `key` is present.
    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Mutations available inside a write transaction. Reads see staged writes.
pub trait WriteTxn: ReadTxn {
    /// Store `value` at `key`, overwriting.
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove `key`. Returns whether it was present.
    fn delete(&mut self, key: &str) -> Result<bool, StoreError>;

    /// Store `value` only if `key` is absent. Returns whether it was stored.
    fn put_if_absent(&mut self, key: &str, value: Vec<u8>) -> Result<bool, StoreError> {
        if self.contains(key)? {
            return Ok(false);
        }
        self.put(key, value)?;
        Ok(true)
    }

    /// Apply staged changes. Dropping without committing aborts.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// A transactional key-value store.
///
/// Object-safe; the ledger and notary stores hold an `Arc<dyn KvStore>`.
/// Use the scoped helpers on [`KvStoreExt`] rather than the raw `begin_*`
/// methods.
pub trait KvStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Open a read transaction.
    fn begin_read(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError>;

    /// Open a write transaction.
    fn begin_write(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError>;
}

impl std::fmt::Debug for dyn KvStore + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KvStore({})", self.backend_name())
    }
}

/// Scoped transactions over any [`KvStore`].
pub trait KvStoreExt: KvStore {
    /// Run `f` inside a read transaction.
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<R, E>,
        E: From<StoreError>,
    {
        let txn = self.begin_read()?;
        f(&*txn)
    }

    /// Run `f` inside a write transaction, committing if it returns `Ok`.
    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut txn = self.begin_write()?;
        match f(&mut *txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::trace!(backend = self.backend_name(), "write transaction aborted");
                Err(e)
            }
        }
    }
}

impl<T: KvStore + ?Sized> KvStoreExt for T {}

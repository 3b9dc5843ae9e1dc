//! # In-Memory Backend
//!
//! A `BTreeMap` behind a `parking_lot::RwLock`. Read transactions hold the
//! read lock; write transactions hold the write lock for their whole scope,
//! which serializes writers and keeps readers from seeing partial commits.
//! `parking_lot` locks do not poison, so a panicking writer leaves the map
//! exactly as it was before its transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StoreError;
use crate::kv::{KvStore, ReadTxn, WriteTxn};
use crate::overlay::Overlay;

/// Thread-safe, cloneable in-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn scan_map(map: &BTreeMap<String, Vec<u8>>, prefix: &str) -> Vec<(String, Vec<u8>)> {
    map.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

struct MemoryReadTxn<'a> {
    guard: RwLockReadGuard<'a, BTreeMap<String, Vec<u8>>>,
}

impl ReadTxn for MemoryReadTxn<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.guard.get(key).cloned())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(scan_map(&self.guard, prefix))
    }
}

struct MemoryWriteTxn<'a> {
    guard: RwLockWriteGuard<'a, BTreeMap<String, Vec<u8>>>,
    overlay: Overlay,
}

impl ReadTxn for MemoryWriteTxn<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.overlay.get(key, || Ok(self.guard.get(key).cloned()))
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self.overlay.scan(prefix, scan_map(&self.guard, prefix)))
    }
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.overlay.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool, StoreError> {
        let existed = self.contains(key)?;
        if existed {
            self.overlay.delete(key);
        }
        Ok(existed)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryWriteTxn { mut guard, overlay } = *self;
        if overlay.is_empty() {
            return Ok(());
        }
        tracing::trace!(changes = overlay.len(), "committing memory batch");
        for (key, change) in overlay.into_changes() {
            match change {
                Some(value) => {
                    guard.insert(key, value);
                }
                None => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }
}

impl KvStore for MemoryKv {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn begin_read(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError> {
        Ok(Box::new(MemoryReadTxn {
            guard: self.data.read(),
        }))
    }

    fn begin_write(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError> {
        Ok(Box::new(MemoryWriteTxn {
            guard: self.data.write(),
            overlay: Overlay::default(),
        }))
    }
}

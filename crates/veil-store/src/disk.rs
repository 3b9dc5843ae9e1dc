//! # On-Disk Backend (sled)
//!
//! Persists entries in a `sled` database. sled gives atomic batches but not
//! multi-key snapshot reads, so a process-local `RwLock<()>` provides the
//! transaction discipline: readers share it, a writer holds it exclusively
//! from `begin_write` until its batch is applied and flushed.
//!
//! One process owns a database directory at a time (sled enforces this with
//! a file lock), so the process-local lock is sufficient.

use std::path::Path;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StoreError;
use crate::kv::{KvStore, ReadTxn, WriteTxn};
use crate::overlay::Overlay;

/// A sled-backed store.
pub struct SledKv {
    db: sled::Db,
    lock: RwLock<()>,
}

impl std::fmt::Debug for SledKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledKv").field("entries", &self.db.len()).finish()
    }
}

impl SledKv {
    /// Open or create a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "opened sled store");
        Ok(Self {
            db,
            lock: RwLock::new(()),
        })
    }

    /// A throwaway database removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            lock: RwLock::new(()),
        })
    }

    /// Flush outstanding writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode_key(raw: &[u8]) -> Result<String, StoreError> {
    String::from_utf8(raw.to_vec()).map_err(|e| StoreError::Corrupt {
        key: String::from_utf8_lossy(raw).into_owned(),
        reason: e.to_string(),
    })
}

fn get_raw(db: &sled::Db, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
    Ok(db.get(key.as_bytes())?.map(|v| v.to_vec()))
}

fn scan_raw(db: &sled::Db, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
    db.scan_prefix(prefix.as_bytes())
        .map(|entry| {
            let (k, v) = entry?;
            Ok((decode_key(&k)?, v.to_vec()))
        })
        .collect()
}

struct SledReadTxn<'a> {
    db: &'a sled::Db,
    _guard: RwLockReadGuard<'a, ()>,
}

impl ReadTxn for SledReadTxn<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        get_raw(self.db, key)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        scan_raw(self.db, prefix)
    }
}

struct SledWriteTxn<'a> {
    db: &'a sled::Db,
    _guard: RwLockWriteGuard<'a, ()>,
    overlay: Overlay,
}

impl ReadTxn for SledWriteTxn<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.overlay.get(key, || get_raw(self.db, key))
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        Ok(self.overlay.scan(prefix, scan_raw(self.db, prefix)?))
    }
}

impl WriteTxn for SledWriteTxn<'_> {
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
        let SledWriteTxn {
            db,
            _guard,
            overlay,
        } = *self;
        if overlay.is_empty() {
            return Ok(());
        }
        let changes = overlay.len();
        let mut batch = sled::Batch::default();
        for (key, change) in overlay.into_changes() {
            match change {
                Some(value) => batch.insert(key.as_bytes(), value),
                None => batch.remove(key.as_bytes()),
            }
        }
        db.apply_batch(batch)?;
        db.flush()?;
        tracing::trace!(changes, "committed sled batch");
        Ok(())
    }
}

impl KvStore for SledKv {
    fn backend_name(&self) -> &'static str {
        "sled"
    }

    fn begin_read(&self) -> Result<Box<dyn ReadTxn + '_>, StoreError> {
        Ok(Box::new(SledReadTxn {
            db: &self.db,
            _guard: self.lock.read(),
        }))
    }

    fn begin_write(&self) -> Result<Box<dyn WriteTxn + '_>, StoreError> {
        Ok(Box::new(SledWriteTxn {
            db: &self.db,
            _guard: self.lock.write(),
            overlay: Overlay::default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvStoreExt;
    use std::sync::Arc;

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let kv = SledKv::open(dir.path()).unwrap();
            kv.write(|txn| txn.put("financial_tx_1", b"{}".to_vec())).unwrap();
        }
        let kv = SledKv::open(dir.path()).unwrap();
        assert_eq!(
            kv.read(|txn| txn.get("financial_tx_1")).unwrap(),
            Some(b"{}".to_vec())
        );
    }

    #[test]
    fn aborted_write_leaves_no_trace() {
        let kv = SledKv::temporary().unwrap();
        let result: Result<(), StoreError> = kv.write(|txn| {
            txn.put("a", vec![1])?;
            Err(StoreError::Backend("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(kv.read(|txn| txn.get("a")).unwrap(), None);
    }

    #[test]
    fn scan_sees_staged_changes_inside_scope() {
        let kv = SledKv::temporary().unwrap();
        kv.write(|txn| {
            txn.put("p_1", vec![1])?;
            txn.put("p_2", vec![2])
        })
        .unwrap();
        kv.write(|txn| {
            txn.delete("p_1")?;
            txn.put("p_3", vec![3])?;
            let keys: Vec<_> = txn.scan("p_")?.into_iter().map(|(k, _)| k).collect();
            assert_eq!(keys, vec!["p_2", "p_3"]);
            Ok::<_, StoreError>(())
        })
        .unwrap();
        assert_eq!(kv.read(|txn| txn.scan("p_")).unwrap().len(), 2);
    }

    #[test]
    fn concurrent_put_if_absent_succeeds_exactly_once() {
        let kv = Arc::new(SledKv::temporary().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let kv = Arc::clone(&kv);
                std::thread::spawn(move || {
                    kv.write(|txn| txn.put_if_absent("contested", vec![i as u8]))
                        .unwrap()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}

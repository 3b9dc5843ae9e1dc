//! # Ledger Store
//!
//! Signed transactions keyed `<family>_<tx_id>` in a transactional KV store,
//! each value the canonical JSON of the transaction.
//!
//! ## Security Invariant
//!
//! `put` is at-most-once per key: it runs `put_if_absent` inside a single
//! write scope, so of any number of concurrent writers of the same
//! transaction exactly one succeeds and the rest get
//! [`LedgerError::Duplicate`]. Nothing ever overwrites a stored transaction.
//!
//! Balances are derived by scanning the whole family partition. There is no
//! secondary index.

use std::sync::Arc;

use veil_core::{Address, Family, TxId};
use veil_store::{record_id_in_family, record_key, split_record_key, KvStore, KvStoreExt};

use crate::error::LedgerError;
use crate::transaction::Transaction;

/// Persistent transaction storage.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    kv: Arc<dyn KvStore>,
}

impl LedgerStore {
    /// Wrap an open KV store.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The underlying store, for export.
    pub fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    /// Store `tx`, returning its key.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Duplicate`] if the key is taken,
    /// [`LedgerError::Validation`] if the id does not match the header.
    pub fn put(&self, tx: &Transaction) -> Result<String, LedgerError> {
        tx.validate_structure()?;
        let key = tx.store_key();
        let value = tx.to_canonical()?.as_bytes().to_vec();
        let stored = self.kv.write(|txn| txn.put_if_absent(&key, value))?;
        if !stored {
            tracing::warn!(key = %key, "rejected duplicate transaction");
            return Err(LedgerError::Duplicate { key });
        }
        tracing::info!(tx_id = %tx.tx_id(), family = %tx.family(), "transaction stored");
        Ok(key)
    }

    /// Fetch one transaction.
    pub fn get(&self, family: &Family, tx_id: &TxId) -> Result<Option<Transaction>, LedgerError> {
        let key = record_key(family, tx_id.digest());
        let value = self.kv.read(|txn| txn.get(&key))?;
        value.map(|bytes| decode(&key, &bytes)).transpose()
    }

    /// Whether `family_tx_id` is stored.
    pub fn contains(&self, family: &Family, tx_id: &TxId) -> Result<bool, LedgerError> {
        let key = record_key(family, tx_id.digest());
        Ok(self.kv.read(|txn| txn.contains(&key))?)
    }

    /// Every transaction in `family`, or in all families when `None`, in key
    /// order.
    pub fn list(&self, family: Option<&Family>) -> Result<Vec<Transaction>, LedgerError> {
        let prefix = family.map(veil_store::family_prefix).unwrap_or_default();
        let entries = self.kv.read(|txn| txn.scan(&prefix))?;
        entries
            .into_iter()
            .filter(|(key, _)| match family {
                Some(f) => record_id_in_family(key, f).is_some(),
                None => split_record_key(key).is_some(),
            })
            .map(|(key, bytes)| decode(&key, &bytes))
            .collect()
    }

    /// Administrative removal. Returns whether the transaction existed.
    pub fn delete(&self, family: &Family, tx_id: &TxId) -> Result<bool, LedgerError> {
        let key = record_key(family, tx_id.digest());
        let removed = self.kv.write(|txn| txn.delete(&key))?;
        if removed {
            tracing::warn!(tx_id = %tx_id, family = %family, "transaction deleted by administrator");
        }
        Ok(removed)
    }

    /// Net amount received by `address` in `family`.
    ///
    /// Adds every amount where `address` is the recipient and subtracts every
    /// amount where it is the sender.
    pub fn balance(&self, family: &Family, address: &Address) -> Result<i128, LedgerError> {
        let mut balance: i128 = 0;
        for tx in self.list(Some(family))? {
            let header = tx.header();
            let amount = i128::from(header.amount);
            if &header.recipient == address {
                balance += amount;
            }
            if &header.sender == address {
                balance -= amount;
            }
        }
        tracing::debug!(family = %family, address = %address, "balance computed");
        Ok(balance)
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Transaction, LedgerError> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::fixtures::{keypair, signed};
    use veil_store::{MemoryKv, SledKv};

    fn store() -> LedgerStore {
        LedgerStore::new(Arc::new(MemoryKv::new()))
    }

    #[test]
    fn put_then_get() {
        let ledger = store();
        let tx = signed(&keypair(1), &keypair(2).address(), 100, 1_700_000_000, Family::financial());
        let key = ledger.put(&tx).unwrap();
        assert_eq!(key, tx.store_key());
        let back = ledger.get(&Family::financial(), tx.tx_id()).unwrap().unwrap();
        assert_eq!(back, tx);
        assert!(ledger.get(&Family::notary(), tx.tx_id()).unwrap().is_none());
    }

    #[test]
    fn second_put_is_duplicate() {
        let ledger = store();
        let tx = signed(&keypair(1), &keypair(2).address(), 100, 1_700_000_000, Family::financial());
        ledger.put(&tx).unwrap();
        let err = ledger.put(&tx).unwrap_err();
        assert!(matches!(err, LedgerError::Duplicate { ref key } if key == &tx.store_key()));
    }

    #[test]
    fn same_id_in_another_family_is_not_duplicate() {
        let ledger = store();
        let alice = keypair(1);
        let bob = keypair(2).address();
        let a = signed(&alice, &bob, 100, 1_700_000_000, Family::financial());
        let b = signed(&alice, &bob, 100, 1_700_000_000, Family::compliance());
        assert_eq!(a.tx_id(), b.tx_id());
        ledger.put(&a).unwrap();
        ledger.put(&b).unwrap();
        assert_eq!(ledger.list(None).unwrap().len(), 2);
    }

    #[test]
    fn balance_sums_received_minus_sent() {
        let ledger = store();
        let (s, r, c) = (keypair(1), keypair(2), keypair(3));
        ledger.put(&signed(&s, &r.address(), 100, 1_700_000_000, Family::financial())).unwrap();
        ledger.put(&signed(&r, &c.address(), 30, 1_700_000_001, Family::financial())).unwrap();
        ledger.put(&signed(&s, &r.address(), 5, 1_700_000_002, Family::compliance())).unwrap();

        let f = Family::financial();
        assert_eq!(ledger.balance(&f, &s.address()).unwrap(), -100);
        assert_eq!(ledger.balance(&f, &r.address()).unwrap(), 70);
        assert_eq!(ledger.balance(&f, &c.address()).unwrap(), 30);
        assert_eq!(ledger.balance(&Family::compliance(), &r.address()).unwrap(), 5);
    }

    #[test]
    fn family_listing_excludes_extended_families() {
        let ledger = store();
        let alice = keypair(1);
        let bob = keypair(2).address();
        let archive = Family::new("financial_tx_archive").unwrap();
        ledger.put(&signed(&alice, &bob, 1, 1_700_000_000, Family::financial())).unwrap();
        ledger.put(&signed(&alice, &bob, 2, 1_700_000_000, archive.clone())).unwrap();

        let main = ledger.list(Some(&Family::financial())).unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].header().amount, 1);
        assert_eq!(ledger.list(Some(&archive)).unwrap().len(), 1);
        assert_eq!(ledger.balance(&Family::financial(), &bob).unwrap(), 1);
    }

    #[test]
    fn delete_is_reported_once() {
        let ledger = store();
        let tx = signed(&keypair(1), &keypair(2).address(), 9, 1_700_000_000, Family::financial());
        ledger.put(&tx).unwrap();
        assert!(ledger.delete(&Family::financial(), tx.tx_id()).unwrap());
        assert!(!ledger.delete(&Family::financial(), tx.tx_id()).unwrap());
        assert!(!ledger.contains(&Family::financial(), tx.tx_id()).unwrap());
    }

    #[test]
    fn corrupt_value_is_reported() {
        let kv = Arc::new(MemoryKv::new());
        let ledger = LedgerStore::new(kv.clone());
        let tx = signed(&keypair(1), &keypair(2).address(), 9, 1_700_000_000, Family::financial());
        kv.write(|txn| txn.put(&tx.store_key(), b"{".to_vec())).unwrap();
        assert!(matches!(
            ledger.get(&Family::financial(), tx.tx_id()),
            Err(LedgerError::Corrupt { .. })
        ));
    }

    #[test]
    fn concurrent_puts_have_one_winner() {
        let ledger = store();
        let tx = signed(&keypair(1), &keypair(2).address(), 100, 1_700_000_000, Family::financial());
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| ledger.put(&tx))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LedgerError::Duplicate { .. })));
    }

    #[test]
    fn persists_across_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tx = signed(&keypair(1), &keypair(2).address(), 100, 1_700_000_000, Family::financial());
        {
            let ledger = LedgerStore::new(Arc::new(SledKv::open(dir.path()).unwrap()));
            ledger.put(&tx).unwrap();
        }
        let ledger = LedgerStore::new(Arc::new(SledKv::open(dir.path()).unwrap()));
        assert_eq!(ledger.get(&Family::financial(), tx.tx_id()).unwrap(), Some(tx.clone()));
        assert!(matches!(ledger.put(&tx), Err(LedgerError::Duplicate { .. })));
    }
}

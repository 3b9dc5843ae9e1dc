//! # Address Lists
//!
//! Blacklist and whitelist entries live in a KV store under
//! `<list>_<sha256(address)>`, each value a JSON-encoded address string.
//! Loading scans the list prefix and accepts any key under it, so lists
//! imported from elsewhere need not follow the hashed key scheme.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use veil_core::Address;
use veil_store::{KvStore, KvStoreExt};

use crate::error::ComplianceError;

/// Which list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Addresses that must never transact.
    Blacklist,
    /// Addresses cleared to transact at the advanced level.
    Whitelist,
}

impl ListKind {
    /// Stable lowercase name, also the key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
        }
    }

    fn prefix(&self) -> String {
        format!("{}_", self.as_str())
    }

    fn key_for(&self, address: &Address) -> String {
        let digest = Sha256::digest(address.as_str().as_bytes());
        format!("{}{}", self.prefix(), hex::encode(digest))
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blacklist or whitelist held in a KV store.
#[derive(Debug, Clone, Copy)]
pub struct AddressList {
    kind: ListKind,
}

impl AddressList {
    /// The blacklist.
    pub fn blacklist() -> Self {
        Self {
            kind: ListKind::Blacklist,
        }
    }

    /// The whitelist.
    pub fn whitelist() -> Self {
        Self {
            kind: ListKind::Whitelist,
        }
    }

    /// Which list this is.
    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Add `address`. Returns `false` if it was already listed.
    pub fn insert(&self, store: &dyn KvStore, address: &Address) -> Result<bool, ComplianceError> {
        let key = self.kind.key_for(address);
        let value = serde_json::to_vec(address).map_err(|e| ComplianceError::CorruptEntry {
            list: self.kind.as_str(),
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let added = store.write(|txn| txn.put_if_absent(&key, value))?;
        if added {
            tracing::info!(list = %self.kind, address = %address, "address listed");
        }
        Ok(added)
    }

    /// Remove `address`. Returns `false` if it was not listed.
    pub fn remove(&self, store: &dyn KvStore, address: &Address) -> Result<bool, ComplianceError> {
        let key = self.kind.key_for(address);
        let removed = store.write(|txn| txn.delete(&key))?;
        if removed {
            tracing::info!(list = %self.kind, address = %address, "address delisted");
        }
        Ok(removed)
    }

    /// Every listed address, in key order.
    pub fn load(&self, store: &dyn KvStore) -> Result<Vec<Address>, ComplianceError> {
        let prefix = self.kind.prefix();
        let entries = store.read(|txn| txn.scan(&prefix))?;
        entries
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_slice::<Address>(&value).map_err(|e| {
                    ComplianceError::CorruptEntry {
                        list: self.kind.as_str(),
                        key,
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }
}

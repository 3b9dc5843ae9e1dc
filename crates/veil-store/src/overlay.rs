//! Staged writes layered over a backend snapshot.
//!
//! Both backends buffer a write transaction's changes here and apply them in
//! one step at commit, so an aborted transaction leaves no trace.

use std::collections::BTreeMap;

use crate::error::StoreError;

/// Pending changes: `Some(value)` for a put, `None` for a delete.
#[derive(Debug, Default)]
pub(crate) struct Overlay {
    staged: BTreeMap<String, Option<Vec<u8>>>,
}

impl Overlay {
    pub(crate) fn get<F>(&self, key: &str, base: F) -> Result<Option<Vec<u8>>, StoreError>
    where
        F: FnOnce() -> Result<Option<Vec<u8>>, StoreError>,
    {
        match self.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => base(),
        }
    }

    /// Merge a base prefix scan with staged changes under the same prefix.
    pub(crate) fn scan(
        &self,
        prefix: &str,
        base: Vec<(String, Vec<u8>)>,
    ) -> Vec<(String, Vec<u8>)> {
        let mut merged: BTreeMap<String, Vec<u8>> = base.into_iter().collect();
        for (key, staged) in self
            .staged
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match staged {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    pub(crate) fn put(&mut self, key: &str, value: Vec<u8>) {
        self.staged.insert(key.to_string(), Some(value));
    }

    pub(crate) fn delete(&mut self, key: &str) {
        self.staged.insert(key.to_string(), None);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.staged.len()
    }

    pub(crate) fn into_changes(self) -> impl Iterator<Item = (String, Option<Vec<u8>>)> {
        self.staged.into_iter()
    }
}

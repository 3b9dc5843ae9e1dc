//! # Notary Store
//!
//! Anchors are time-bounded records asserting that a stored transaction
//! exists. They live under the `notary_tx` family, keyed by a record id that
//! is the content digest of the record body.
//!
//! ## Lifecycle
//!
//! ```text
//! anchor ──▶ live ──cancel (within window)──▶ removed
//!              │
//!              └──expires_at < now──▶ expired (removed on next touch)
//! ```
//!
//! ## Security Invariant
//!
//! - No read ever returns a record with `expires_at < now`. Reads that find
//!   one delete it inside the same write scope.
//! - `cancel` checks the window and deletes in one write scope, so a
//!   cancellation can never land after expiry and a record can never be
//!   cancelled twice.
//! - Cancelling removes the anchor only. The ledger transaction is untouched.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use veil_core::{sha256_digest, CanonicalBytes, Clock, Family, RecordId, Timestamp, TxId};
use veil_store::{family_prefix, record_id_in_family, record_key, KvStore, KvStoreExt, WriteTxn};

use crate::error::NotaryError;

/// An anchor for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryRecord {
    /// Digest of the other four fields.
    pub record_id: RecordId,
    /// The anchored transaction.
    pub tx_id: TxId,
    /// When the anchor was created.
    pub anchored_at: Timestamp,
    /// When the anchor stops existing; `None` for a permanent anchor.
    pub expires_at: Option<Timestamp>,
    /// How long after `anchored_at` the anchor may be cancelled.
    pub cancellation_window_secs: u64,
}

#[derive(Serialize)]
struct RecordBody<'a> {
    tx_id: &'a TxId,
    anchored_at: &'a Timestamp,
    expires_at: &'a Option<Timestamp>,
    cancellation_window_secs: u64,
}

impl NotaryRecord {
    /// Build a record anchored at `now`. A zero window means no expiry.
    pub fn new(tx_id: TxId, now: Timestamp, window_secs: u64) -> Result<Self, NotaryError> {
        let expires_at = if window_secs > 0 {
            Some(
                now.checked_add_secs(window_secs)
                    .ok_or(NotaryError::WindowOverflow(window_secs))?,
            )
        } else {
            None
        };
        let body = RecordBody {
            tx_id: &tx_id,
            anchored_at: &now,
            expires_at: &expires_at,
            cancellation_window_secs: window_secs,
        };
        let record_id = RecordId::from_digest(sha256_digest(&CanonicalBytes::new(&body)?));
        Ok(Self {
            record_id,
            tx_id,
            anchored_at: now,
            expires_at,
            cancellation_window_secs: window_secs,
        })
    }

    /// Store key: `notary_tx_<record_id>`.
    pub fn key(&self) -> String {
        record_key(&Family::notary(), self.record_id.digest())
    }

    /// Whether the record has outlived `expires_at`.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at < *now)
    }

    /// Whether `now - anchored_at <= window`.
    pub fn is_cancellable(&self, now: &Timestamp) -> bool {
        let window = i64::try_from(self.cancellation_window_secs).unwrap_or(i64::MAX);
        now.seconds_since(&self.anchored_at) <= window
    }
}

enum CancelOutcome {
    Cancelled(NotaryRecord),
    TooLate(NotaryRecord),
    Missing,
}

/// Anchor storage with lazy expiry.
#[derive(Clone)]
pub struct NotaryStore {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for NotaryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotaryStore")
            .field("kv", &self.kv)
            .field("now", &self.clock.now())
            .finish()
    }
}

impl NotaryStore {
    /// Wrap an open KV store; `clock` decides expiry.
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// The underlying store, for export.
    pub fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    /// The instant expiry is judged against.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Anchor `tx_id` now with a cancellation window of `window_secs`.
    ///
    /// # Errors
    ///
    /// [`NotaryError::AlreadyAnchored`] while another live anchor exists for
    /// the same transaction.
    pub fn anchor(&self, tx_id: &TxId, window_secs: u64) -> Result<NotaryRecord, NotaryError> {
        let now = self.clock.now();
        let record = NotaryRecord::new(*tx_id, now, window_secs)?;
        let key = record.key();
        let value = CanonicalBytes::new(&record)?.as_bytes().to_vec();

        self.kv.write(|txn| {
            let live = sweep(&mut *txn, &now)?;
            if let Some(existing) = live.iter().find(|r| r.tx_id == *tx_id) {
                return Err(NotaryError::AlreadyAnchored {
                    tx_id: *tx_id,
                    key: existing.key(),
                });
            }
            if !txn.put_if_absent(&key, value)? {
                return Err(NotaryError::AlreadyAnchored { tx_id: *tx_id, key });
            }
            Ok(())
        })
        .map_err(|e| {
            if matches!(e, NotaryError::AlreadyAnchored { .. }) {
                tracing::warn!(tx_id = %tx_id, "transaction already anchored");
            }
            e
        })?;

        tracing::info!(
            tx_id = %tx_id,
            record_id = %record.record_id,
            window_secs,
            "transaction anchored"
        );
        Ok(record)
    }

    /// A live record by id. Expired records are deleted and reported absent.
    pub fn get(&self, record_id: &RecordId) -> Result<Option<NotaryRecord>, NotaryError> {
        let now = self.clock.now();
        let key = record_key(&Family::notary(), record_id.digest());
        self.kv.write(|txn| {
            let Some(bytes) = txn.get(&key)? else {
                return Ok(None);
            };
            let record = decode(&key, &bytes)?;
            if record.is_expired(&now) {
                txn.delete(&key)?;
                tracing::debug!(record_id = %record_id, "expired notary record removed on read");
                return Ok(None);
            }
            Ok(Some(record))
        })
    }

    /// The live anchor of `tx_id`, if any.
    pub fn get_by_tx(&self, tx_id: &TxId) -> Result<Option<NotaryRecord>, NotaryError> {
        let now = self.clock.now();
        let live = self.kv.write(|txn| sweep(txn, &now))?;
        Ok(live.into_iter().find(|r| r.tx_id == *tx_id))
    }

    /// Every record in key order.
    ///
    /// With `include_expired` the store is read as is, for audit; otherwise
    /// expired records are removed and omitted.
    pub fn list(&self, include_expired: bool) -> Result<Vec<NotaryRecord>, NotaryError> {
        if include_expired {
            return self.kv.read(|txn| records(txn));
        }
        let now = self.clock.now();
        self.kv.write(|txn| sweep(txn, &now))
    }

    /// Cancel the anchor of `tx_id`.
    ///
    /// # Errors
    ///
    /// - [`NotaryError::NotFound`] if the transaction has no anchor.
    /// - [`NotaryError::WindowExpired`] if `now - anchored_at` exceeds the
    ///   window. An anchor that has also passed `expires_at` is removed.
    pub fn cancel(&self, tx_id: &TxId) -> Result<NotaryRecord, NotaryError> {
        let now = self.clock.now();
        let outcome = self.kv.write(|txn| {
            let Some(record) = records(&*txn)?
                .into_iter()
                .filter(|r| r.tx_id == *tx_id)
                .max_by_key(|r| r.anchored_at)
            else {
                return Ok(CancelOutcome::Missing);
            };
            if !record.is_cancellable(&now) {
                if record.is_expired(&now) {
                    txn.delete(&record.key())?;
                }
                return Ok(CancelOutcome::TooLate(record));
            }
            txn.delete(&record.key())?;
            Ok::<_, NotaryError>(CancelOutcome::Cancelled(record))
        })?;

        match outcome {
            CancelOutcome::Cancelled(record) => {
                tracing::info!(tx_id = %tx_id, record_id = %record.record_id, "anchor cancelled");
                Ok(record)
            }
            CancelOutcome::TooLate(record) => {
                tracing::warn!(
                    tx_id = %tx_id,
                    window_secs = record.cancellation_window_secs,
                    "cancellation window expired"
                );
                Err(NotaryError::WindowExpired {
                    tx_id: *tx_id,
                    window_secs: record.cancellation_window_secs,
                })
            }
            CancelOutcome::Missing => Err(NotaryError::NotFound(*tx_id)),
        }
    }

    /// Remove every expired record now. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, NotaryError> {
        let now = self.clock.now();
        let removed = self.kv.write(|txn| {
            let before = records(&*txn)?.len();
            let live = sweep(&mut *txn, &now)?;
            Ok::<_, NotaryError>(before - live.len())
        })?;
        if removed > 0 {
            tracing::info!(removed, "expired notary records purged");
        }
        Ok(removed)
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<NotaryRecord, NotaryError> {
    serde_json::from_slice(bytes).map_err(|e| NotaryError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn records<T: veil_store::ReadTxn + ?Sized>(txn: &T) -> Result<Vec<NotaryRecord>, NotaryError> {
    let family = Family::notary();
    txn.scan(&family_prefix(&family))?
        .into_iter()
        .filter(|(key, _)| record_id_in_family(key, &family).is_some())
        .map(|(key, bytes)| decode(&key, &bytes))
        .collect()
}

/// Delete every expired record and return the live ones.
fn sweep<T: WriteTxn + ?Sized>(txn: &mut T, now: &Timestamp) -> Result<Vec<NotaryRecord>, NotaryError> {
    let (expired, live): (Vec<_>, Vec<_>) =
        records(&*txn)?.into_iter().partition(|r| r.is_expired(now));
    for record in &expired {
        txn.delete(&record.key())?;
        tracing::debug!(record_id = %record.record_id, tx_id = %record.tx_id, "expired notary record removed");
    }
    Ok(live)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{ContentDigest, ManualClock};
    use veil_store::MemoryKv;

    const T0: i64 = 1_700_000_000;

    fn tx(n: u8) -> TxId {
        TxId::from_digest(ContentDigest::from_bytes([n; 32]))
    }

    fn setup() -> (NotaryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_epoch_secs(T0).unwrap()));
        let store = NotaryStore::new(Arc::new(MemoryKv::new()), clock.clone());
        (store, clock)
    }

    #[test]
    fn anchor_sets_expiry_from_window() {
        let (notary, _) = setup();
        let r = notary.anchor(&tx(1), 120).unwrap();
        assert_eq!(r.anchored_at.epoch_secs(), T0);
        assert_eq!(r.expires_at.unwrap().epoch_secs(), T0 + 120);
        assert_eq!(notary.get(&r.record_id).unwrap(), Some(r.clone()));
        assert_eq!(notary.get_by_tx(&tx(1)).unwrap(), Some(r));
    }

    #[test]
    fn zero_window_never_expires() {
        let (notary, clock) = setup();
        let r = notary.anchor(&tx(1), 0).unwrap();
        assert_eq!(r.expires_at, None);
        clock.advance(10 * 365 * 86_400).unwrap();
        assert_eq!(notary.get(&r.record_id).unwrap(), Some(r));
    }

    #[test]
    fn record_id_is_digest_of_body() {
        let now = Timestamp::from_epoch_secs(T0).unwrap();
        let a = NotaryRecord::new(tx(1), now, 120).unwrap();
        let b = NotaryRecord::new(tx(1), now, 120).unwrap();
        let c = NotaryRecord::new(tx(1), now, 60).unwrap();
        assert_eq!(a.record_id, b.record_id);
        assert_ne!(a.record_id, c.record_id);
    }

    #[test]
    fn cancel_inside_window_succeeds() {
        let (notary, clock) = setup();
        notary.anchor(&tx(1), 120).unwrap();
        clock.advance(119).unwrap();
        notary.cancel(&tx(1)).unwrap();
        assert!(notary.get_by_tx(&tx(1)).unwrap().is_none());
        assert!(matches!(notary.cancel(&tx(1)), Err(NotaryError::NotFound(_))));
    }

    #[test]
    fn cancel_at_window_boundary_succeeds() {
        let (notary, clock) = setup();
        notary.anchor(&tx(1), 120).unwrap();
        clock.advance(120).unwrap();
        notary.cancel(&tx(1)).unwrap();
    }

    #[test]
    fn cancel_after_window_fails_and_removes_expired_anchor() {
        let (notary, clock) = setup();
        notary.anchor(&tx(1), 120).unwrap();
        clock.advance(121).unwrap();
        assert!(matches!(
            notary.cancel(&tx(1)),
            Err(NotaryError::WindowExpired { window_secs: 120, .. })
        ));
        assert!(notary.list(true).unwrap().is_empty());
    }

    #[test]
    fn permanent_anchor_is_not_cancellable_later() {
        let (notary, clock) = setup();
        notary.anchor(&tx(1), 0).unwrap();
        clock.advance(1).unwrap();
        assert!(matches!(notary.cancel(&tx(1)), Err(NotaryError::WindowExpired { .. })));
        assert!(notary.get_by_tx(&tx(1)).unwrap().is_some());
    }

    #[test]
    fn expired_records_are_absent_from_get_and_list() {
        let (notary, clock) = setup();
        let short = notary.anchor(&tx(1), 10).unwrap();
        let long = notary.anchor(&tx(2), 1_000).unwrap();
        clock.advance(11).unwrap();

        assert_eq!(notary.list(true).unwrap().len(), 2);
        assert!(notary.get(&short.record_id).unwrap().is_none());
        assert_eq!(notary.list(false).unwrap(), vec![long]);
        assert_eq!(notary.list(true).unwrap().len(), 1);
    }

    #[test]
    fn expiry_is_strictly_after_expires_at() {
        let (notary, clock) = setup();
        let r = notary.anchor(&tx(1), 10).unwrap();
        clock.advance(10).unwrap();
        assert!(notary.get(&r.record_id).unwrap().is_some());
        clock.advance(1).unwrap();
        assert!(notary.get(&r.record_id).unwrap().is_none());
    }

    #[test]
    fn double_anchor_is_rejected_until_expiry() {
        let (notary, clock) = setup();
        notary.anchor(&tx(1), 10).unwrap();
        assert!(matches!(
            notary.anchor(&tx(1), 10),
            Err(NotaryError::AlreadyAnchored { .. })
        ));
        clock.advance(11).unwrap();
        let again = notary.anchor(&tx(1), 10).unwrap();
        assert_eq!(again.anchored_at.epoch_secs(), T0 + 11);
    }

    #[test]
    fn purge_counts_removed_records() {
        let (notary, clock) = setup();
        notary.anchor(&tx(1), 5).unwrap();
        notary.anchor(&tx(2), 5).unwrap();
        notary.anchor(&tx(3), 0).unwrap();
        clock.advance(6).unwrap();
        assert_eq!(notary.purge_expired().unwrap(), 2);
        assert_eq!(notary.purge_expired().unwrap(), 0);
        assert_eq!(notary.list(true).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_cancels_have_one_winner() {
        let (notary, _) = setup();
        notary.anchor(&tx(1), 120).unwrap();
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| notary.cancel(&tx(1)))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, NotaryError::NotFound(_))));
    }
}

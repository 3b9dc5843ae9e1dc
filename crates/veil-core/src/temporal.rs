//! # Temporal Types
//!
//! [`Timestamp`] is a UTC instant truncated to whole seconds. It serializes
//! as `YYYY-MM-DDTHH:MM:SSZ`, the exact format hashed into transaction ids,
//! so an id never depends on sub-second jitter or a local offset.
//!
//! Components that compare against "now" (notary expiry, cancellation
//! windows) take a [`Clock`] instead of reading the system time directly.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VeilError;

/// A UTC-only timestamp with seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// From a `DateTime<Utc>`, discarding sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, VeilError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| VeilError::Validation(format!("invalid unix timestamp: {secs}")))
    }

    /// Parse `YYYY-MM-DDTHH:MM:SSZ`. Offsets other than `Z` are rejected.
    pub fn parse(s: &str) -> Result<Self, VeilError> {
        if !s.ends_with('Z') {
            return Err(VeilError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| VeilError::Validation(format!("invalid timestamp {s:?}: {e}")))?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The instant `secs` seconds later, or `None` on overflow.
    pub fn checked_add_secs(&self, secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs).ok()?;
        let target = self.epoch_secs().checked_add(secs)?;
        DateTime::from_timestamp(target, 0).map(Self)
    }

    /// Signed number of seconds from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: &Timestamp) -> i64 {
        self.epoch_secs() - earlier.epoch_secs()
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves forward, and only when told to. Used by tests and
/// the emulator.
#[derive(Debug)]
pub struct ManualClock {
    epoch_secs: AtomicI64,
}

impl ManualClock {
    /// Start at the given instant.
    pub fn new(start: Timestamp) -> Self {
        Self {
            epoch_secs: AtomicI64::new(start.epoch_secs()),
        }
    }

    /// Move forward by `secs` seconds and return the new instant.
    ///
    /// Fails, leaving the clock where it was, if the result would leave the
    /// timestamp range.
    pub fn advance(&self, secs: u64) -> Result<Timestamp, VeilError> {
        let previous = self
            .epoch_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Timestamp::from_epoch_secs(current)
                    .ok()?
                    .checked_add_secs(secs)
                    .map(|t| t.epoch_secs())
            })
            .map_err(|current| {
                VeilError::Validation(format!(
                    "advancing the clock at {current} by {secs}s overflows the timestamp range"
                ))
            })?;
        Timestamp::from_epoch_secs(previous)?
            .checked_add_secs(secs)
            .ok_or_else(|| VeilError::Validation(format!("clock advance of {secs}s overflows")))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        // Only valid instants are ever stored.
        Timestamp::from_epoch_secs(secs).unwrap_or_else(|_| Timestamp(DateTime::<Utc>::default()))
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

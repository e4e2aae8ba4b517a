//! `last_verified` stamps and export watermarks.
//!
//! A write takes a [`Stamp`] and keeps it until its transaction has
//! committed. [`VerificationClock::watermark`] waits for every outstanding
//! stamp to be released before answering, and every value the clock hands
//! out is strictly greater than the previous one. A row missing from an
//! export is therefore always stamped after that export's watermark.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use tokio::sync::{RwLock, RwLockReadGuard};

/// Issues `last_verified` stamps and export watermarks for one store.
#[derive(Clone, Default)]
pub struct VerificationClock {
    inner: Arc<ClockInner>,
}

#[derive(Default)]
struct ClockInner {
    gate: RwLock<()>,
    last: Mutex<Option<DateTime<Utc>>>,
}

/// A stamp for one write. Exports wait while it is alive.
#[must_use = "the stamp must be held until the write commits"]
pub struct Stamp<'a> {
    /// Value to store in `last_verified`.
    pub at: DateTime<Utc>,
    _gate: RwLockReadGuard<'a, ()>,
}

impl VerificationClock {
    /// Create a clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a stamp for a write. Hold it until the write has committed.
    pub async fn stamp(&self) -> Stamp<'_> {
        let gate = self.inner.gate.read().await;
        Stamp {
            at: self.inner.next(),
            _gate: gate,
        }
    }

    /// A watermark later than every stamp issued so far, taken once all of
    /// them have been released.
    pub async fn watermark(&self) -> DateTime<Utc> {
        let _exclusive = self.inner.gate.write().await;
        self.inner.next()
    }
}

impl ClockInner {
    /// Current time at storage precision, bumped past the last value issued.
    fn next(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().trunc_subsecs(6);
        let next = match *last {
            Some(previous) if now <= previous => previous + TimeDelta::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        next
    }
}

//! Clock sources for validity evaluation.
//!
//! All timestamps are Unix epoch seconds (u64). The registry never reads
//! the wall clock directly; it asks a [`Clock`] so that tests and replay
//! tooling can pin "now".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{RegistryError, Result};

/// Supplier of the current time in seconds since the Unix epoch.
///
/// Implementations must be monotonically non-decreasing.
pub trait Clock {
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        now_secs()
    }
}

/// A manually driven clock. Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock pinned at `secs`.
    pub fn new(secs: u64) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(secs)),
        }
    }

    /// Move the clock forward by `secs`, stopping at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(secs))
            });
    }

    /// Move the clock to `secs`. Ignored if it would go backwards.
    pub fn set(&self, secs: u64) {
        self.secs.fetch_max(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

/// Return the current time as seconds since Unix epoch.
///
/// A clock set before 1970 reads as 0.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Absolute deadline `duration` seconds after `now`.
pub fn deadline(now: u64, duration: u64) -> Result<u64> {
    now.checked_add(duration).ok_or_else(|| {
        RegistryError::MalformedInput(format!("validity of {duration}s overflows the clock"))
    })
}

/// 9999-12-31T23:59:59Z, the last instant with a four-digit year.
const MAX_RFC3339_SECS: u64 = 253_402_300_799;

/// Convert seconds to an RFC 3339 string. Later times saturate at the
/// end of year 9999.
pub fn secs_to_rfc3339(secs: u64) -> String {
    let dt = i64::try_from(secs.min(MAX_RFC3339_SECS))
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .unwrap_or_default();
    dt.to_rfc3339()
}

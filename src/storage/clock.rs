//! Time sources for appends without an explicit timestamp

use crate::storage::types::IntoTimestamp;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Supplies the current time in seconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().into_timestamp()
    }
}

/// A clock that only moves when told to
///
/// Stores the `f64` bit pattern so it can be shared behind an `Arc`.
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    pub fn set(&self, t: f64) {
        self.bits.store(t.to_bits(), Ordering::SeqCst);
    }

    /// Move the clock forward (or backward, for negative `secs`)
    pub fn advance(&self, secs: f64) {
        let now = self.now();
        self.set(now + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

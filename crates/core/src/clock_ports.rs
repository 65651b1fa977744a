//! Time abstraction for token issuance
//!
//! Signing reads the wall clock exactly once per request. Production code
//! uses [`SystemClock`]; tests pin time with [`ManualClock`] so issued-at and
//! expiry claims are deterministic.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Trait for reading the current wall-clock time
pub trait Clock: Send + Sync + 'static {
    /// Seconds since the UNIX epoch
    fn now_unix(&self) -> i64;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient sharing
impl<T: Clock> Clock for Arc<T> {
    fn now_unix(&self) -> i64 {
        (**self).now_unix()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    pub const fn new(start_unix: i64) -> Self {
        Self { secs: AtomicI64::new(start_unix) }
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, unix: i64) {
        self.secs.store(unix, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }
}

//! Wall-clock sources

use std::sync::atomic::{AtomicI64, Ordering};

use crate::types::WallClockMs;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> WallClockMs;
}

/// System UTC clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> WallClockMs {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests and simulation
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: WallClockMs) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: WallClockMs) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> WallClockMs {
        self.now.load(Ordering::SeqCst)
    }
}

//! Injected clock providers.
//!
//! The engine never reads time sources directly: a monotonic clock drives
//! all duration arithmetic and a wall clock supplies the display/export
//! date stamps. Tests swap in the manual variants for determinism.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use chrono::{DateTime, Utc};

/// Monotonic millisecond source. Readings never decrease and are immune to
/// wall-clock adjustments; only differences between readings are meaningful.
pub trait MonotonicClock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock source, used only for date stamps, never for duration math.
pub trait WallClock {
    fn now(&self) -> DateTime<Utc>;
}

/// Monotonic clock backed by `Instant`, measured from construction.
/// `Instant` carries nanosecond precision; readings are reported as
/// integral milliseconds.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Wall clock backed by the system time.
#[derive(Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven monotonic clock for deterministic tests. Clones share the
/// same reading, so a test can keep a handle while the engine owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        debug_assert!(ms >= self.now.get());
        self.now.set(ms);
    }
}

impl MonotonicClock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Hand-set wall clock for deterministic tests.
#[derive(Clone)]
pub struct ManualWallClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualWallClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Rc::new(Cell::new(at)) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

//! Pausable round timer.
//!
//! Elapsed time is the sum of the intervals during which the timer was
//! running. Pausing folds the current interval into the total; resuming
//! anchors a fresh start instant.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunTimer {
    accumulated: Duration,
    anchor: Option<Instant>,
}

impl RunTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or resume) counting from `now`. No-op while already running.
    pub fn start(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        self.start(now);
    }

    /// Stop counting, keeping the time accumulated so far.
    pub fn pause(&mut self, now: Instant) {
        if let Some(anchor) = self.anchor.take() {
            self.accumulated += now.saturating_duration_since(anchor);
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.anchor = None;
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.accumulated
            + self
                .anchor
                .map(|anchor| now.saturating_duration_since(anchor))
                .unwrap_or_default()
    }

    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        self.elapsed(now).as_secs_f64()
    }
}

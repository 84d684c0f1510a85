//! Monotonic clocks.
//!
//! The engine reads an animation clock and the audio scheduler reads its own
//! audio clock. Both are plain seconds as `f64`.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic time source in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so one `ManualClock` can drive both the
/// engine and the audio scheduler in headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.seconds.set(seconds);
    }

    pub fn advance(&self, seconds: f64) {
        self.seconds.set(self.seconds.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.seconds.get()
    }
}

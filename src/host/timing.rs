//! Per-host timing strategies.
//!
//! The engine produces one authoritative beat per tick. A host's strategy
//! decides what it shows of that beat: every value ([`ContinuousClock`]) or
//! only whole-beat steps ([`SteppedClock`]) when the host cannot animate
//! smoothly. The strategy is chosen once per measurement.

use std::fmt;

pub trait TimingStrategy: fmt::Debug {
    /// Whether the host needs per-frame callbacks.
    fn is_continuous(&self) -> bool;

    /// Forget what was last shown, so the next sample is displayed.
    fn reset(&mut self);

    /// The beat to display for the engine's `beat`, or `None` to leave the
    /// host untouched this tick.
    fn sample(&mut self, beat: f64) -> Option<f64>;
}

/// Smooth interpolation: every tick is displayed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContinuousClock;

impl TimingStrategy for ContinuousClock {
    fn is_continuous(&self) -> bool {
        true
    }

    fn reset(&mut self) {}

    fn sample(&mut self, beat: f64) -> Option<f64> {
        Some(beat)
    }
}

/// Fixed-interval fallback: the display moves once per whole beat.
#[derive(Debug, Default, Clone, Copy)]
pub struct SteppedClock {
    step: Option<i64>,
}

impl TimingStrategy for SteppedClock {
    fn is_continuous(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.step = None;
    }

    fn sample(&mut self, beat: f64) -> Option<f64> {
        if !beat.is_finite() {
            return None;
        }
        let step = beat.floor() as i64;
        if self.step == Some(step) {
            return None;
        }
        self.step = Some(step);
        Some(step as f64)
    }
}

/// Pick the strategy for a host.
pub fn select_timing(reduced: bool) -> Box<dyn TimingStrategy> {
    if reduced {
        Box::new(SteppedClock::default())
    } else {
        Box::new(ContinuousClock)
    }
}

//! # Audio Module
//!
//! The audio side of playback: something that owns an audio clock and can
//! schedule timeline notes against it.
//!
//! ## Contract
//! - `initialize()` - one-time, idempotent, asynchronous setup; must succeed
//!   before anything is scheduled
//! - `schedule_from()` - clear what was scheduled, then schedule every note at
//!   or after `start_beat`, returning the audio-clock instant at which
//!   `start_beat` sounds
//! - `stop_all()` - silence everything now, with a short fade
//! - `current_time()` - the audio clock, or `None` before initialization
//!
//! The scheduler never decides where playback is. The engine always tells it
//! which beat to start from and reads its clock back.
//!
//! ## Sub-modules
//! - `software` - [`SoftwareScheduler`], a clock-driven voice queue

mod software;

pub use software::{SoftwareScheduler, Voice, VoiceEvent};

use crate::error::PlaybackError;
use crate::timeline::TimedNote;

/// Notes closer than this to the start beat still get scheduled
pub(crate) const SCHEDULE_EPSILON: f64 = 1e-9;

/// An audio backend the engine can drive.
///
/// Beat arguments are 0-based engine positions; notes are compared through
/// [`TimedNote::position`].
#[allow(async_fn_in_trait)]
pub trait AudioScheduler {
    /// Prepare the audio environment. Calling it again after success is a no-op.
    async fn initialize(&mut self) -> Result<(), PlaybackError>;

    /// Whether `initialize` has succeeded.
    fn is_ready(&self) -> bool;

    /// Replace the schedule with `events` from `start_beat` on.
    ///
    /// A note at position `p` sounds `(p - start_beat) * 60 / tempo` seconds
    /// after the returned reference instant, which itself lies `start_delay`
    /// seconds after the audio clock's current reading. Returns `None` when
    /// the scheduler is not ready.
    fn schedule_from(
        &mut self,
        events: &[TimedNote],
        tempo: f64,
        start_beat: f64,
        start_delay: f64,
    ) -> Option<f64>;

    /// Silence and forget every pending and sounding event.
    fn stop_all(&mut self);

    /// Audio clock reading in seconds, `None` while not ready.
    fn current_time(&self) -> Option<f64>;
}

/// Seconds between the reference instant and a note's onset.
pub fn onset_offset(note: &TimedNote, start_beat: f64, tempo: f64) -> f64 {
    (note.position() - start_beat) * (60.0 / tempo)
}

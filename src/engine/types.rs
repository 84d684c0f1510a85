//! Engine type definitions

use crate::host::HostId;

/// Global transport state.
///
/// A paused engine is `Stopped` with a non-zero beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    /// A pointer drag on `host`; `resume` restarts playback on release
    Scrubbing { host: HostId, resume: bool },
}

/// A (reference time, reference beat) pair.
///
/// The current beat is extrapolated linearly from the anchor until the next
/// re-anchoring. While `time` lies in the future (pre-roll) the beat holds at
/// `beat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockAnchor {
    pub time: f64,
    pub beat: f64,
}

impl ClockAnchor {
    pub fn new(time: f64, beat: f64) -> Self {
        Self { time, beat }
    }

    /// Beat at clock reading `now`.
    ///
    /// # Example
    /// ```
    /// use gen_playback::engine::ClockAnchor;
    ///
    /// let anchor = ClockAnchor::new(10.0, 2.0);
    /// assert_eq!(anchor.beat_at(11.0, 0.5), 4.0);
    /// assert_eq!(anchor.beat_at(9.5, 0.5), 2.0);
    /// ```
    pub fn beat_at(&self, now: f64, seconds_per_beat: f64) -> f64 {
        if now <= self.time {
            self.beat
        } else {
            self.beat + (now - self.time) / seconds_per_beat
        }
    }
}

/// Result of [`super::PlaybackEngine::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback started; `audio` is false when running visual-only
    Started { audio: bool },
    AlreadyPlaying,
    /// A scrub is in progress; playback starts when it ends
    Deferred,
    /// Audio failed to initialize and audio is required
    Blocked,
}

impl PlayOutcome {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlayOutcome::Started { .. } | PlayOutcome::AlreadyPlaying)
    }
}

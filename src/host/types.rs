//! Host type definitions

/// Engine-assigned identifier of a registered host
pub type HostId = usize;

/// A seek target as the UI expresses it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekRequest {
    /// Absolute 0-based beat position
    Beat(f64),
    /// Fraction of the whole timeline, 0.0 - 1.0
    Progress(f64),
    /// Beats relative to the current position
    Delta(f64),
}

impl SeekRequest {
    /// Absolute target clamped to `[0, total_beats]`, or `None` for
    /// non-finite input.
    ///
    /// # Example
    /// ```
    /// use gen_playback::host::SeekRequest;
    ///
    /// assert_eq!(SeekRequest::Progress(0.5).resolve(1.0, 8.0), Some(4.0));
    /// assert_eq!(SeekRequest::Delta(-3.0).resolve(1.0, 8.0), Some(0.0));
    /// assert_eq!(SeekRequest::Beat(f64::NAN).resolve(1.0, 8.0), None);
    /// ```
    pub fn resolve(self, current: f64, total_beats: f64) -> Option<f64> {
        let target = match self {
            SeekRequest::Beat(beat) => beat,
            SeekRequest::Progress(fraction) => fraction.clamp(0.0, 1.0) * total_beats,
            SeekRequest::Delta(delta) => current + delta,
        };
        if !target.is_finite() {
            return None;
        }
        Some(target.clamp(0.0, total_beats.max(0.0)))
    }
}

/// What caused a beat update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatSource {
    /// Per-frame engine tick
    Engine,
    Seek,
    /// Pointer drag over the host
    Scrub,
    /// User scroll or wheel input
    Scroll,
    /// Layout change
    Remeasure,
}

/// Options for [`super::HostController::set_beat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetBeatOptions {
    /// Reposition scroll to match the beat
    pub sync: bool,
    /// Anything but [`BeatSource::Engine`] is a jump: stepped hosts restart
    /// their step sequence at the new beat.
    pub source: BeatSource,
}

impl SetBeatOptions {
    pub fn synced(source: BeatSource) -> Self {
        Self { sync: true, source }
    }

    pub fn unsynced(source: BeatSource) -> Self {
        Self { sync: false, source }
    }
}

impl Default for SetBeatOptions {
    fn default() -> Self {
        Self::synced(BeatSource::Engine)
    }
}

/// Rendering state of one note relative to the playhead band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    /// Not reached yet
    Pending,
    /// Intersecting the playhead band
    Active,
    /// Scrolled past the band
    Complete,
}

/// Where a rendered note sits, both on screen and on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteAnchor {
    /// `TimedNote::index` of the note
    pub note: usize,
    /// Content-space left edge in pixels
    pub x: f64,
    pub width: f64,
    /// 0-based beat position
    pub position: f64,
    pub duration: f64,
}

//! Owned-state host controller.

use super::timing::{select_timing, TimingStrategy};
use super::types::{BeatSource, HighlightState, NoteAnchor, SeekRequest, SetBeatOptions};
use super::{HostController, Surface};
use crate::config::PlaybackConfig;
use tracing::{debug, info};

/// Fewest beat markers from which spacing can be measured
pub const MIN_BEAT_MARKERS: usize = 2;

/// Scroll differences below this are not applied
const SCROLL_EPSILON_PX: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
struct ScrubState {
    start_x: f64,
    anchor_beat: f64,
}

/// A [`HostController`] over a rendering [`Surface`].
///
/// Created when a playable surface appears and dropped with it.
///
/// # Example
/// ```rust
/// use gen_playback::host::{HighlightState, HostController, HostSurface, NoteAnchor, Surface};
/// use gen_playback::PlaybackConfig;
///
/// #[derive(Default)]
/// struct Strip { scroll: f64 }
///
/// impl Surface for Strip {
///     fn beat_markers(&self) -> Vec<f64> { (0..=8).map(|b| 100.0 + b as f64 * 40.0).collect() }
///     fn playhead_offset(&self) -> f64 { 60.0 }
///     fn note_anchors(&self) -> Vec<NoteAnchor> { Vec::new() }
///     fn set_scroll_offset(&mut self, offset: f64) { self.scroll = offset; }
///     fn set_progress(&mut self, _progress: f64) {}
///     fn set_running(&mut self, _running: bool) {}
///     fn set_note_state(&mut self, _note: usize, _state: HighlightState) {}
/// }
///
/// let mut host = HostSurface::new(Strip::default(), 8.0, &PlaybackConfig::default());
/// host.set_beat(2.0, Default::default());
/// // first marker 100px, playhead at 60px, 40px per beat
/// assert_eq!(host.surface().scroll, 120.0);
/// ```
#[derive(Debug)]
pub struct HostSurface<S: Surface> {
    surface: S,
    total_beats: f64,
    beat: f64,
    spacing: Option<f64>,
    playhead_px: f64,
    scroll_anchor: f64,
    scroll_offset: f64,
    band_half_width: f64,
    force_reduced: bool,
    reduced: bool,
    running: bool,
    ignore_next_scroll: bool,
    scrub: Option<ScrubState>,
    timing: Box<dyn TimingStrategy>,
    anchors: Vec<NoteAnchor>,
    highlights: Vec<Option<HighlightState>>,
}

impl<S: Surface> HostSurface<S> {
    /// Wrap a surface and take its first measurements.
    pub fn new(surface: S, total_beats: f64, config: &PlaybackConfig) -> Self {
        let mut host = Self {
            surface,
            total_beats: total_beats.max(0.0),
            beat: 0.0,
            spacing: None,
            playhead_px: 0.0,
            scroll_anchor: 0.0,
            scroll_offset: 0.0,
            band_half_width: config.playhead_band_px / 2.0,
            force_reduced: config.reduced_motion,
            reduced: false,
            running: false,
            ignore_next_scroll: false,
            scrub: None,
            timing: select_timing(false),
            anchors: Vec::new(),
            highlights: Vec::new(),
        };
        host.remeasure();
        host
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Measured pixels per beat, `None` when unmeasurable.
    pub fn spacing(&self) -> Option<f64> {
        self.spacing
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn playhead_px(&self) -> f64 {
        self.playhead_px
    }

    pub fn progress(&self) -> f64 {
        if self.total_beats > 0.0 {
            self.beat / self.total_beats
        } else {
            0.0
        }
    }

    pub fn highlight(&self, note: usize) -> Option<HighlightState> {
        self.anchors
            .iter()
            .position(|a| a.note == note)
            .and_then(|i| self.highlights[i])
    }

    fn beat_at_scroll(&self, offset: f64) -> Option<f64> {
        let spacing = self.spacing?;
        let beat = (offset - self.scroll_anchor) / spacing;
        beat.is_finite().then(|| beat.clamp(0.0, self.total_beats))
    }

    fn sync_scroll(&mut self) {
        let Some(spacing) = self.spacing else {
            return;
        };
        let target = self.scroll_anchor + self.beat * spacing;
        if (target - self.scroll_offset).abs() < SCROLL_EPSILON_PX {
            return;
        }
        self.scroll_offset = target;
        self.ignore_next_scroll = true;
        self.surface.set_scroll_offset(target);
    }

    fn update_highlights(&mut self) {
        let by_beat = self.reduced || self.spacing.is_none();
        for (i, anchor) in self.anchors.iter().enumerate() {
            let state = if by_beat {
                state_by_beat(anchor, self.beat)
            } else {
                state_by_band(anchor, self.scroll_offset, self.playhead_px, self.band_half_width)
            };
            if self.highlights[i] != Some(state) {
                self.highlights[i] = Some(state);
                self.surface.set_note_state(anchor.note, state);
            }
        }
    }
}

impl<S: Surface> HostController for HostSurface<S> {
    fn beat(&self) -> f64 {
        self.beat
    }

    fn total_beats(&self) -> f64 {
        self.total_beats
    }

    fn is_reduced(&self) -> bool {
        self.reduced
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    fn set_beat(&mut self, beat: f64, options: SetBeatOptions) {
        if !beat.is_finite() {
            return;
        }
        let mut beat = beat.clamp(0.0, self.total_beats);
        if options.source != BeatSource::Engine {
            // A jump restarts the step sequence at the new beat
            self.timing.reset();
            beat = self.timing.sample(beat).unwrap_or(beat);
        }
        self.beat = beat;
        let progress = self.progress();
        self.surface.set_progress(progress);
        if options.sync {
            self.sync_scroll();
        }
        self.update_highlights();
    }

    fn handle_seek(&mut self, request: SeekRequest) -> Option<f64> {
        let beat = request.resolve(self.beat, self.total_beats)?;
        self.set_beat(beat, SetBeatOptions::synced(BeatSource::Seek));
        Some(self.beat)
    }

    fn advance(&mut self, beat: f64) -> bool {
        match self.timing.sample(beat) {
            Some(display) => {
                self.set_beat(display, SetBeatOptions::synced(BeatSource::Engine));
                true
            }
            None => false,
        }
    }

    fn set_running(&mut self, running: bool) {
        if self.running == running {
            return;
        }
        self.running = running;
        self.timing.reset();
        self.surface.set_running(running);
    }

    fn begin_scrub(&mut self, x: f64) {
        self.scrub = Some(ScrubState {
            start_x: x,
            anchor_beat: self.beat,
        });
    }

    fn scrub_to(&mut self, x: f64) -> Option<f64> {
        let scrub = self.scrub?;
        let spacing = self.spacing?;
        // Dragging content right brings earlier beats under the playhead
        let beat = scrub.anchor_beat - (x - scrub.start_x) / spacing;
        beat.is_finite().then(|| beat.clamp(0.0, self.total_beats))
    }

    fn end_scrub(&mut self) -> bool {
        self.scrub.take().is_some()
    }

    fn on_scroll(&mut self, offset: f64) -> Option<f64> {
        if !offset.is_finite() {
            return None;
        }
        self.scroll_offset = offset;
        if self.ignore_next_scroll {
            self.ignore_next_scroll = false;
            return None;
        }
        if self.scrub.is_some() {
            return None;
        }
        self.beat_at_scroll(offset)
    }

    fn on_wheel(&mut self, delta: f64) -> Option<f64> {
        if !delta.is_finite() || self.scrub.is_some() {
            return None;
        }
        let offset = self.scroll_offset + delta;
        let beat = self.beat_at_scroll(offset)?;
        self.scroll_offset = offset;
        self.ignore_next_scroll = true;
        self.surface.set_scroll_offset(offset);
        Some(beat)
    }

    fn frame_painted(&mut self) {
        self.ignore_next_scroll = false;
    }

    fn remeasure(&mut self) {
        let markers = self.surface.beat_markers();
        let playhead = self.surface.playhead_offset();

        self.spacing = if playhead.is_finite() {
            measure_spacing(&markers)
        } else {
            None
        };
        self.playhead_px = if playhead.is_finite() { playhead } else { 0.0 };
        if let (Some(first), Some(_)) = (markers.first(), self.spacing) {
            self.scroll_anchor = first - self.playhead_px;
        }
        if let Some(total) = self
            .surface
            .total_beats()
            .filter(|t| t.is_finite() && *t >= 0.0)
        {
            self.total_beats = total;
        }

        let reduced =
            self.force_reduced || self.surface.prefers_reduced_motion() || self.spacing.is_none();
        if reduced && !self.reduced {
            info!(
                markers = markers.len(),
                spacing = ?self.spacing,
                "Host falling back to stepped timing"
            );
        }
        self.reduced = reduced;
        self.timing = select_timing(reduced);

        self.anchors = self.surface.note_anchors();
        self.highlights = vec![None; self.anchors.len()];

        debug!(
            spacing = ?self.spacing,
            playhead = self.playhead_px,
            notes = self.anchors.len(),
            "Host measured"
        );

        self.set_beat(self.beat, SetBeatOptions::synced(BeatSource::Remeasure));
    }
}

/// Average pixels per beat across the rendered markers.
fn measure_spacing(markers: &[f64]) -> Option<f64> {
    if markers.len() < MIN_BEAT_MARKERS {
        return None;
    }
    let first = markers[0];
    let last = markers[markers.len() - 1];
    let spacing = (last - first) / (markers.len() - 1) as f64;
    (spacing.is_finite() && spacing > 0.0).then_some(spacing)
}

fn state_by_band(anchor: &NoteAnchor, scroll: f64, playhead: f64, half_width: f64) -> HighlightState {
    let left = anchor.x - scroll;
    let right = left + anchor.width.max(0.0);
    if right < playhead - half_width {
        HighlightState::Complete
    } else if left <= playhead + half_width {
        HighlightState::Active
    } else {
        HighlightState::Pending
    }
}

fn state_by_beat(anchor: &NoteAnchor, beat: f64) -> HighlightState {
    if anchor.position + anchor.duration <= beat {
        HighlightState::Complete
    } else if anchor.position <= beat {
        HighlightState::Active
    } else {
        HighlightState::Pending
    }
}

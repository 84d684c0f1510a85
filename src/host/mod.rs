//! # Host Module
//!
//! One host per independently scrollable rendering of the score. A host maps
//! beat positions to scroll offsets and back, turns pointer drags and
//! scroll/wheel input into beat targets, and marks notes as they pass a
//! narrow band around the fixed playhead.
//!
//! ## Sub-modules
//! - `types` - SeekRequest, SetBeatOptions, HighlightState, NoteAnchor
//! - `timing` - ContinuousClock / SteppedClock strategies
//! - `controller` - [`HostSurface`], the owned-state host implementation
//!
//! ## Collaborators
//!
//! The rendering side implements [`Surface`]: it reports what it measured
//! (beat marker positions, playhead offset, note boxes) and applies what the
//! host decides (scroll offset, progress, note states).
//!
//! The engine drives hosts only through [`HostController`]. Hosts never touch
//! audio or tempo; every beat they show comes from the engine.
//!
//! ## Scroll Geometry
//! ```text
//! scroll(beat) = first_marker_x - playhead_px + beat * spacing
//! ```
//! `spacing` is measured from the rendered beat markers, never computed from
//! layout rules. A host that cannot measure it (fewer than two markers, or a
//! non-finite/non-positive result) or that is asked for reduced motion runs in
//! stepped mode.

mod controller;
mod timing;
mod types;


pub use controller::{HostSurface, MIN_BEAT_MARKERS};
pub use timing::{select_timing, ContinuousClock, SteppedClock, TimingStrategy};
pub use types::{BeatSource, HighlightState, HostId, NoteAnchor, SeekRequest, SetBeatOptions};

/// The rendering collaborator behind a host.
pub trait Surface {
    /// Content-space x of each rendered beat marker, in beat order.
    fn beat_markers(&self) -> Vec<f64>;

    /// Viewport x of the fixed playhead.
    fn playhead_offset(&self) -> f64;

    /// Rendered note boxes.
    fn note_anchors(&self) -> Vec<NoteAnchor>;

    /// The user or environment asks for minimal motion.
    fn prefers_reduced_motion(&self) -> bool {
        false
    }

    /// Beats this surface renders, when it differs from the timeline's.
    fn total_beats(&self) -> Option<f64> {
        None
    }

    fn set_scroll_offset(&mut self, offset: f64);

    fn set_progress(&mut self, progress: f64);

    fn set_running(&mut self, running: bool);

    fn set_note_state(&mut self, note: usize, state: HighlightState);
}

/// What the engine may ask of a host.
pub trait HostController {
    /// Beat currently displayed.
    fn beat(&self) -> f64;

    fn total_beats(&self) -> f64;

    /// Stepped timing instead of continuous interpolation.
    fn is_reduced(&self) -> bool;

    fn is_running(&self) -> bool;

    fn is_scrubbing(&self) -> bool;

    /// Clamp to `[0, total_beats]`, update progress and highlights and,
    /// when `options.sync` is set, scroll the beat under the playhead.
    fn set_beat(&mut self, beat: f64, options: SetBeatOptions);

    /// Translate a seek request into `set_beat`. Returns the beat applied.
    fn handle_seek(&mut self, request: SeekRequest) -> Option<f64>;

    /// Per-tick update from the engine. Returns whether the display changed.
    fn advance(&mut self, beat: f64) -> bool;

    fn set_running(&mut self, running: bool);

    /// Pointer down: remember where the drag started and the beat under it.
    fn begin_scrub(&mut self, x: f64);

    /// Pointer move: beat under the playhead for a drag to `x`.
    fn scrub_to(&mut self, x: f64) -> Option<f64>;

    /// Pointer up/cancel: returns whether a scrub was active.
    fn end_scrub(&mut self) -> bool;

    /// A scroll event. Returns the beat to seek to when the user scrolled.
    fn on_scroll(&mut self, offset: f64) -> Option<f64>;

    /// Wheel input of `delta` pixels. Returns the beat to seek to.
    fn on_wheel(&mut self, delta: f64) -> Option<f64>;

    /// The surface painted a frame.
    fn frame_painted(&mut self);

    /// Re-measure spacing and playhead after a layout change, keeping the
    /// displayed beat.
    fn remeasure(&mut self);
}

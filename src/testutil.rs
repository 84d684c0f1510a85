//! Shared test doubles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::host::{HighlightState, NoteAnchor, Surface};
use crate::notation::{NotationMeasure, NotationNote, NotationPart, NoteName, Pitch};

/// Everything a [`FakeSurface`] was told, plus what it reports.
#[derive(Debug, Default)]
pub struct SurfaceRecord {
    pub markers: Vec<f64>,
    pub playhead: f64,
    pub anchors: Vec<NoteAnchor>,
    pub reduced_motion: bool,
    pub total_beats: Option<f64>,
    pub scroll: f64,
    pub scroll_writes: usize,
    pub progress: f64,
    pub running: bool,
    pub note_states: HashMap<usize, HighlightState>,
}

/// A recording [`Surface`]. Clones share their record, so a test can keep
/// one handle after moving the other into a host or engine.
#[derive(Debug, Clone, Default)]
pub struct FakeSurface {
    record: Rc<RefCell<SurfaceRecord>>,
}

impl FakeSurface {
    /// `beats + 1` markers starting at `first_x`, `spacing` pixels apart.
    pub fn strip(first_x: f64, spacing: f64, beats: usize, playhead: f64) -> Self {
        let surface = Self::default();
        {
            let mut record = surface.record.borrow_mut();
            record.markers = (0..=beats).map(|b| first_x + b as f64 * spacing).collect();
            record.playhead = playhead;
        }
        surface
    }

    /// A surface that rendered no beat markers.
    pub fn unmeasurable(playhead: f64) -> Self {
        let surface = Self::default();
        surface.record.borrow_mut().playhead = playhead;
        surface
    }

    pub fn with_anchors(self, anchors: Vec<NoteAnchor>) -> Self {
        self.record.borrow_mut().anchors = anchors;
        self
    }

    pub fn with_reduced_motion(self) -> Self {
        self.record.borrow_mut().reduced_motion = true;
        self
    }

    pub fn record(&self) -> std::cell::Ref<'_, SurfaceRecord> {
        self.record.borrow()
    }

    pub fn record_mut(&self) -> std::cell::RefMut<'_, SurfaceRecord> {
        self.record.borrow_mut()
    }

    pub fn scroll(&self) -> f64 {
        self.record.borrow().scroll
    }

    pub fn state_of(&self, note: usize) -> Option<HighlightState> {
        self.record.borrow().note_states.get(&note).copied()
    }
}

impl Surface for FakeSurface {
    fn beat_markers(&self) -> Vec<f64> {
        self.record.borrow().markers.clone()
    }

    fn playhead_offset(&self) -> f64 {
        self.record.borrow().playhead
    }

    fn note_anchors(&self) -> Vec<NoteAnchor> {
        self.record.borrow().anchors.clone()
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.record.borrow().reduced_motion
    }

    fn total_beats(&self) -> Option<f64> {
        self.record.borrow().total_beats
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        let mut record = self.record.borrow_mut();
        record.scroll = offset;
        record.scroll_writes += 1;
    }

    fn set_progress(&mut self, progress: f64) {
        self.record.borrow_mut().progress = progress;
    }

    fn set_running(&mut self, running: bool) {
        self.record.borrow_mut().running = running;
    }

    fn set_note_state(&mut self, note: usize, state: HighlightState) {
        self.record.borrow_mut().note_states.insert(note, state);
    }
}

/// A single-part score of `measures` 4/4 measures, one quarter note per beat.
pub fn quarter_note_part(measures: usize) -> NotationPart {
    let pitches = [NoteName::C, NoteName::D, NoteName::E, NoteName::F];
    let measures = (1..=measures)
        .map(|number| {
            let notes = pitches
                .iter()
                .map(|step| NotationNote::note(Pitch::new(*step, 4, 0), 1.0))
                .collect();
            NotationMeasure::new(number, Some(4.0), notes)
        })
        .collect();
    NotationPart::new("P1", 1, measures)
}

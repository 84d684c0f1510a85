//! Timeline type definitions
//!
//! Beat-positioned events produced by the deriver and consumed by the audio
//! scheduler, the engine and the hosts.

use crate::notation::Pitch;
use serde::Serialize;

/// One sounding event after tie merging.
///
/// # Fields
/// - `index`: Sequential index (0, 1, 2, ...) in beat order, for matching rendered notes
/// - `pitch`: Sounding pitch
/// - `beat`: Absolute start beat, 1-based (the first beat of the score is 1)
/// - `duration`: Duration in quarter-note beats, tie chains already summed
/// - `part`, `staff`, `voice`: Where the note came from
/// - `measure_number`: Number of the measure the note starts in
/// - `slur_start` / `slur_stop`: Copied verbatim from the notation
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimedNote {
    pub index: usize,
    pub pitch: Pitch,
    pub beat: f64,
    pub duration: f64,
    pub part: usize,
    pub staff: u8,
    pub voice: u8,
    pub measure_number: usize,
    pub slur_start: bool,
    pub slur_stop: bool,
}

impl TimedNote {
    /// 0-based position on the engine's beat axis.
    pub fn position(&self) -> f64 {
        self.beat - 1.0
    }

    /// 0-based position where the note stops sounding.
    pub fn end_position(&self) -> f64 {
        self.position() + self.duration
    }
}

/// Where a measure sits on the timeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasureSpan {
    pub number: usize,
    /// 1-based start beat
    pub start_beat: f64,
    pub beats: f64,
}

/// Flat, beat-ordered timeline for one playback session.
///
/// `total_beats` is the sum of the declared measure beat counts and never
/// depends on note content.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub notes: Vec<TimedNote>,
    pub measures: Vec<MeasureSpan>,
    pub total_beats: f64,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes sounding at a 0-based beat position.
    pub fn notes_at(&self, position: f64) -> impl Iterator<Item = &TimedNote> {
        self.notes
            .iter()
            .filter(move |n| n.position() <= position && position < n.end_position())
    }

    /// The measure containing a 0-based beat position.
    pub fn measure_at(&self, position: f64) -> Option<&MeasureSpan> {
        self.measures.iter().find(|m| {
            let start = m.start_beat - 1.0;
            start <= position && position < start + m.beats
        })
    }
}

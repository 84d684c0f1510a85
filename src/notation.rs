//! # Notation Input Types
//!
//! Structured notation as handed over by the notation-parsing collaborator
//! (or by [`crate::musicxml::read_musicxml`]).
//!
//! ## Type Hierarchy
//! ```text
//! NotationPart
//!   ├── id, divisions (per quarter note)
//!   └── Vec<NotationMeasure>
//!         ├── number
//!         ├── beats: Option<f64> (declared beat count, quarter-note beats)
//!         └── Vec<NotationNote>
//!               ├── pitch: Option<Pitch> (None = rest)
//!               ├── duration (divisions)
//!               ├── voice, staff
//!               ├── chord: bool (shares the previous note's onset)
//!               ├── tie_start/stop: bool
//!               └── slur_start/stop: bool
//! ```
//!
//! Nothing here is validated. The timeline deriver applies the documented
//! defaults (4 beats per measure, 1 division per quarter) when values are
//! missing or nonsensical.

use serde::Serialize;

/// Beats assumed for a measure that declares none.
pub const DEFAULT_BEATS_PER_MEASURE: f64 = 4.0;

/// Divisions assumed for a part that declares none.
pub const DEFAULT_DIVISIONS: u32 = 1;

/// Note names A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "C" => Some(NoteName::C),
            "D" => Some(NoteName::D),
            "E" => Some(NoteName::E),
            "F" => Some(NoteName::F),
            "G" => Some(NoteName::G),
            "A" => Some(NoteName::A),
            "B" => Some(NoteName::B),
            _ => None,
        }
    }

    fn semitone(self) -> i16 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }
}

/// A sounding pitch: step, octave (scientific, C4 = middle C) and a
/// chromatic alteration in semitones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pitch {
    pub step: NoteName,
    pub octave: i8,
    pub alter: i8,
}

impl Pitch {
    pub fn new(step: NoteName, octave: i8, alter: i8) -> Self {
        Self { step, octave, alter }
    }

    /// MIDI note number (C4 = 60), clamped to 0-127.
    pub fn midi(&self) -> u8 {
        let midi = (self.octave as i16 + 1) * 12 + self.step.semitone() + self.alter as i16;
        midi.clamp(0, 127) as u8
    }

    /// Equal-tempered frequency in Hz (A4 = 440).
    pub fn frequency(&self) -> f64 {
        440.0 * 2f64.powf((self.midi() as f64 - 69.0) / 12.0)
    }
}

/// One raw note or rest, exactly as notated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotationNote {
    pub pitch: Option<Pitch>,
    /// Duration in the part's divisions
    pub duration: f64,
    pub voice: u8,
    pub staff: u8,
    pub chord: bool,
    pub tie_start: bool,
    pub tie_stop: bool,
    pub slur_start: bool,
    pub slur_stop: bool,
}

impl NotationNote {
    pub fn note(pitch: Pitch, duration: f64) -> Self {
        Self {
            pitch: Some(pitch),
            duration,
            voice: 1,
            staff: 1,
            ..Default::default()
        }
    }

    pub fn rest(duration: f64) -> Self {
        Self {
            pitch: None,
            duration,
            voice: 1,
            staff: 1,
            ..Default::default()
        }
    }

    pub fn on_staff(mut self, staff: u8) -> Self {
        self.staff = staff;
        self
    }

    pub fn in_voice(mut self, voice: u8) -> Self {
        self.voice = voice;
        self
    }

    pub fn chord(mut self) -> Self {
        self.chord = true;
        self
    }

    pub fn tie_start(mut self) -> Self {
        self.tie_start = true;
        self
    }

    pub fn tie_stop(mut self) -> Self {
        self.tie_stop = true;
        self
    }

    pub fn slur_start(mut self) -> Self {
        self.slur_start = true;
        self
    }

    pub fn slur_stop(mut self) -> Self {
        self.slur_stop = true;
        self
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

/// A measure with its declared beat count (in quarter-note beats).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotationMeasure {
    pub number: usize,
    pub beats: Option<f64>,
    pub notes: Vec<NotationNote>,
}

impl NotationMeasure {
    pub fn new(number: usize, beats: Option<f64>, notes: Vec<NotationNote>) -> Self {
        Self { number, beats, notes }
    }

    /// Declared beat count, or the 4-beat default when missing or invalid.
    pub fn beat_count(&self) -> f64 {
        match self.beats {
            Some(beats) if beats.is_finite() && beats > 0.0 => beats,
            _ => DEFAULT_BEATS_PER_MEASURE,
        }
    }
}

/// A part: a list of measures sharing one divisions-per-quarter value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotationPart {
    pub id: String,
    pub divisions: u32,
    pub measures: Vec<NotationMeasure>,
}

impl NotationPart {
    pub fn new(id: &str, divisions: u32, measures: Vec<NotationMeasure>) -> Self {
        Self {
            id: id.to_string(),
            divisions,
            measures,
        }
    }

    /// Divisions per quarter note, or 1 when the part declares 0.
    pub fn divisions_per_beat(&self) -> f64 {
        if self.divisions == 0 {
            DEFAULT_DIVISIONS as f64
        } else {
            self.divisions as f64
        }
    }

    /// Sum of every measure's declared beat count.
    pub fn total_beats(&self) -> f64 {
        self.measures.iter().map(NotationMeasure::beat_count).sum()
    }
}

//! Timeline derivation
//!
//! Converts notation parts into a flat, beat-positioned list of
//! [`TimedNote`]s in two passes:
//!
//! 1. **Positioning** - walk measures with a running 1-based beat total and a
//!    per-staff cursor that restarts every measure. Chord notes share the
//!    cursor; every other note moves it on by the duration of the note just
//!    before it on that staff, chord-mates included.
//! 2. **Tie merging** - fold tie-stop notes into the note that started the
//!    chain, then drop rests and consumed notes.

use super::types::{MeasureSpan, TimedNote, Timeline};
use crate::notation::{NotationPart, Pitch};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Beats closer than this count as the same onset
const BEAT_EPSILON: f64 = 1e-9;

/// A note after pass 1, before tie merging
#[derive(Debug, Clone)]
struct PositionedNote {
    part: usize,
    staff: u8,
    voice: u8,
    pitch: Option<Pitch>,
    beat: f64,
    duration: f64,
    measure_number: usize,
    tie_start: bool,
    tie_stop: bool,
    slur_start: bool,
    slur_stop: bool,
}

impl PositionedNote {
    fn same_line(&self, other: &PositionedNote) -> bool {
        self.part == other.part && self.staff == other.staff && self.voice == other.voice
    }
}

/// Per-staff beat bookkeeping within one measure
#[derive(Debug, Default)]
struct StaffCursor {
    /// Local 1-based beat of the most recent non-chord note
    onset: f64,
    /// Duration of the previous note on the staff
    last_duration: f64,
    started: bool,
}

impl StaffCursor {
    fn next_onset(&mut self, duration: f64, chord: bool) -> f64 {
        if !self.started {
            self.started = true;
            self.onset = 1.0;
        } else if !chord {
            self.onset += self.last_duration;
        }
        self.last_duration = duration;
        self.onset
    }
}

/// Derive the playback timeline from notation parts.
///
/// # Beat Numbering
/// Note beats are 1-based: the first note of the score starts at beat 1.
/// `total_beats` is the sum of the first part's declared measure beat counts
/// (4 for any measure that declares none), independent of note content.
///
/// # Ties
/// A tie-start note absorbs the durations of the following same-pitch notes
/// on the same part/staff/voice that carry tie-stop flags. An unterminated
/// tie-start keeps its own duration.
///
/// # Example
/// ```rust
/// use gen_playback::notation::{NotationMeasure, NotationNote, NotationPart, NoteName, Pitch};
/// use gen_playback::derive_timeline;
///
/// let c4 = Pitch::new(NoteName::C, 4, 0);
/// let part = NotationPart::new("P1", 1, vec![
///     NotationMeasure::new(1, Some(4.0), vec![
///         NotationNote::note(c4, 2.0).tie_start(),
///         NotationNote::note(c4, 2.0).tie_stop(),
///     ]),
/// ]);
///
/// let timeline = derive_timeline(&[part]);
/// assert_eq!(timeline.total_beats, 4.0);
/// assert_eq!(timeline.notes.len(), 1);
/// assert_eq!(timeline.notes[0].duration, 4.0);
/// ```
pub fn derive_timeline(parts: &[NotationPart]) -> Timeline {
    let mut positioned = Vec::new();
    let mut measures = Vec::new();
    let mut total_beats = 0.0;

    for (part_index, part) in parts.iter().enumerate() {
        let (notes, spans) = position_part(part_index, part);
        positioned.extend(notes);

        let part_total: f64 = spans.iter().map(|m| m.beats).sum();
        if part_index == 0 {
            measures = spans;
            total_beats = part_total;
        } else if (part_total - total_beats).abs() > BEAT_EPSILON {
            warn!(
                part = %part.id,
                beats = part_total,
                expected = total_beats,
                "Part length disagrees with the first part"
            );
        }
    }

    let consumed = merge_ties(&mut positioned);

    let mut notes: Vec<TimedNote> = positioned
        .into_iter()
        .zip(consumed)
        .filter(|(_, consumed)| !consumed)
        .filter_map(|(n, _)| {
            n.pitch.map(|pitch| TimedNote {
                index: 0,
                pitch,
                beat: n.beat,
                duration: n.duration,
                part: n.part,
                staff: n.staff,
                voice: n.voice,
                measure_number: n.measure_number,
                slur_start: n.slur_start,
                slur_stop: n.slur_stop,
            })
        })
        .collect();

    // Stable: notes sharing a beat keep notation order
    notes.sort_by(|a, b| a.beat.total_cmp(&b.beat));
    for (i, note) in notes.iter_mut().enumerate() {
        note.index = i;
    }

    Timeline {
        notes,
        measures,
        total_beats,
    }
}

/// Pass 1: absolute beats for every note and rest of one part.
fn position_part(part_index: usize, part: &NotationPart) -> (Vec<PositionedNote>, Vec<MeasureSpan>) {
    let divisions = part.divisions_per_beat();
    if part.divisions == 0 {
        debug!(part = %part.id, "No divisions declared, assuming 1 per quarter note");
    }

    let mut notes = Vec::new();
    let mut spans = Vec::with_capacity(part.measures.len());
    let mut measure_start = 1.0;

    for measure in &part.measures {
        let beats = measure.beat_count();
        if measure.beats != Some(beats) {
            debug!(
                part = %part.id,
                measure = measure.number,
                "No usable beat count, assuming {} beats",
                beats
            );
        }

        let mut cursors: HashMap<u8, StaffCursor> = HashMap::new();
        for note in &measure.notes {
            let duration = if note.duration.is_finite() && note.duration > 0.0 {
                note.duration / divisions
            } else {
                0.0
            };
            let local = cursors
                .entry(note.staff)
                .or_default()
                .next_onset(duration, note.chord);

            notes.push(PositionedNote {
                part: part_index,
                staff: note.staff,
                voice: note.voice,
                pitch: note.pitch,
                beat: measure_start + local - 1.0,
                duration,
                measure_number: measure.number,
                tie_start: note.tie_start,
                tie_stop: note.tie_stop,
                slur_start: note.slur_start,
                slur_stop: note.slur_stop,
            });
        }

        spans.push(MeasureSpan {
            number: measure.number,
            start_beat: measure_start,
            beats,
        });
        measure_start += beats;
    }

    (notes, spans)
}

/// Pass 2: fold tie chains into their first note.
///
/// Returns a flag per note marking the ones absorbed into a chain.
fn merge_ties(notes: &mut [PositionedNote]) -> Vec<bool> {
    let mut consumed = vec![false; notes.len()];

    for i in 0..notes.len() {
        if consumed[i] || !notes[i].tie_start || notes[i].pitch.is_none() {
            continue;
        }

        let mut current = i;
        let mut total = notes[i].duration;
        loop {
            match find_continuation(notes, current, &consumed) {
                Some(j) if notes[j].tie_stop => {
                    total += notes[j].duration;
                    consumed[j] = true;
                    if !notes[j].tie_start {
                        break;
                    }
                    current = j;
                }
                Some(j) => {
                    debug!(
                        beat = notes[i].beat,
                        next = notes[j].beat,
                        "Tie continuation lacks a tie-stop, ending chain"
                    );
                    break;
                }
                None => {
                    debug!(
                        beat = notes[i].beat,
                        staff = notes[i].staff,
                        "Unterminated tie, keeping the notated duration"
                    );
                    break;
                }
            }
        }
        notes[i].duration = total;
    }

    consumed
}

/// The note a tie from `from` continues into, if any.
///
/// Ties are positional: only the next onset on the same part/staff/voice is
/// examined (chord-mates of `from` are skipped). Within that onset the first
/// unconsumed note of the same pitch wins; if the onset has none, the chain
/// is broken.
fn find_continuation(notes: &[PositionedNote], from: usize, consumed: &[bool]) -> Option<usize> {
    let origin = &notes[from];
    let mut next_onset: Option<f64> = None;

    for (j, candidate) in notes.iter().enumerate().skip(from + 1) {
        if !candidate.same_line(origin) {
            continue;
        }
        if (candidate.beat - origin.beat).abs() <= BEAT_EPSILON {
            continue;
        }
        match next_onset {
            None => next_onset = Some(candidate.beat),
            Some(onset) if (candidate.beat - onset).abs() > BEAT_EPSILON => return None,
            Some(_) => {}
        }
        if !consumed[j] && candidate.pitch.is_some() && candidate.pitch == origin.pitch {
            return Some(j);
        }
    }

    None
}

//! # MusicXML Reader
//!
//! Reads `score-partwise` MusicXML (the format the Gen compiler emits) into
//! [`NotationPart`]s for the timeline deriver.
//!
//! Only what the playback core needs is read: divisions, time signatures,
//! pitches, durations, voices, staves, chord flags, ties and slurs.
//! `<backup>` and `<forward>` are ignored since each staff keeps its own beat
//! cursor. Grace notes take no time and are skipped.
//!
//! ## Example
//! ```rust
//! use gen_playback::read_musicxml;
//!
//! let xml = r#"<score-partwise version="4.0">
//!   <part id="P1">
//!     <measure number="1">
//!       <attributes>
//!         <divisions>4</divisions>
//!         <time><beats>4</beats><beat-type>4</beat-type></time>
//!       </attributes>
//!       <note><pitch><step>C</step><octave>4</octave></pitch><duration>16</duration></note>
//!     </measure>
//!   </part>
//! </score-partwise>"#;
//!
//! let parts = read_musicxml(xml)?;
//! assert_eq!(parts[0].divisions, 4);
//! assert_eq!(parts[0].measures[0].beats, Some(4.0));
//! # Ok::<(), gen_playback::PlaybackError>(())
//! ```

use crate::error::PlaybackError;
use crate::notation::{NotationMeasure, NotationNote, NotationPart, NoteName, Pitch};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

/// Read every `<part>` of a partwise MusicXML document.
pub fn read_musicxml(xml: &str) -> Result<Vec<NotationPart>, PlaybackError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut state = ReaderState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                state.open(&e);
                state.path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Empty(e)) => {
                state.open(&e);
                state.close(e.name().as_ref());
            }
            Ok(Event::End(e)) => {
                state.path.pop();
                state.close(e.name().as_ref());
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| PlaybackError::NotationError(e.to_string()))?;
                state.text(text.trim());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PlaybackError::NotationError(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(state.parts)
}

/// Note under construction between `<note>` and `</note>`
#[derive(Default)]
struct NoteBuilder {
    note: NotationNote,
    step: Option<NoteName>,
    octave: i8,
    alter: i8,
    rest: bool,
    grace: bool,
}

impl NoteBuilder {
    fn finish(mut self) -> Option<NotationNote> {
        if self.grace {
            return None;
        }
        self.note.pitch = match (self.rest, self.step) {
            (false, Some(step)) => Some(Pitch::new(step, self.octave, self.alter)),
            _ => None,
        };
        Some(self.note)
    }
}

#[derive(Default)]
struct ReaderState {
    parts: Vec<NotationPart>,
    part: Option<NotationPart>,
    measure: Option<NotationMeasure>,
    note: Option<NoteBuilder>,
    path: Vec<String>,
    /// Time signature in quarter-note beats, carried across measures
    measure_beats: Option<f64>,
    /// Divisions currently in force (may differ from the part's first value)
    divisions: Option<u32>,
    time_beats: Option<f64>,
    time_beat_type: Option<f64>,
}

impl ReaderState {
    fn open(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"part" => {
                let id = attribute(e, b"id").unwrap_or_else(|| format!("P{}", self.parts.len() + 1));
                self.part = Some(NotationPart::new(&id, 0, Vec::new()));
                self.measure_beats = None;
                self.divisions = None;
            }
            b"measure" => {
                let fallback = self.part.as_ref().map(|p| p.measures.len() + 1).unwrap_or(1);
                let number = attribute(e, b"number")
                    .and_then(|n| n.trim().parse().ok())
                    .unwrap_or(fallback);
                self.measure = Some(NotationMeasure::new(number, None, Vec::new()));
            }
            b"note" => {
                let mut builder = NoteBuilder::default();
                builder.note.voice = 1;
                builder.note.staff = 1;
                self.note = Some(builder);
            }
            b"time" => {
                self.time_beats = None;
                self.time_beat_type = None;
            }
            b"chord" => {
                if let Some(n) = self.note.as_mut() {
                    n.note.chord = true;
                }
            }
            b"rest" => {
                if let Some(n) = self.note.as_mut() {
                    n.rest = true;
                }
            }
            b"grace" => {
                if let Some(n) = self.note.as_mut() {
                    n.grace = true;
                }
            }
            b"tie" => {
                if let Some(n) = self.note.as_mut() {
                    match attribute(e, b"type").as_deref() {
                        Some("start") => n.note.tie_start = true,
                        Some("stop") => n.note.tie_stop = true,
                        _ => {}
                    }
                }
            }
            b"slur" => {
                if let Some(n) = self.note.as_mut() {
                    match attribute(e, b"type").as_deref() {
                        Some("start") => n.note.slur_start = true,
                        Some("stop") => n.note.slur_stop = true,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"time" => {
                if let (Some(beats), Some(beat_type)) = (self.time_beats, self.time_beat_type) {
                    if beat_type > 0.0 {
                        self.measure_beats = Some(beats * 4.0 / beat_type);
                    }
                }
            }
            b"note" => {
                let Some(builder) = self.note.take() else {
                    return;
                };
                let Some(mut note) = builder.finish() else {
                    return;
                };
                // Keep every duration in the part's first divisions unit
                if let (Some(part), Some(current)) = (self.part.as_ref(), self.divisions) {
                    if part.divisions != 0 && current != 0 && current != part.divisions {
                        note.duration = note.duration * part.divisions as f64 / current as f64;
                    }
                }
                if let Some(measure) = self.measure.as_mut() {
                    measure.notes.push(note);
                }
            }
            b"measure" => {
                if let Some(mut measure) = self.measure.take() {
                    measure.beats = self.measure_beats;
                    if let Some(part) = self.part.as_mut() {
                        part.measures.push(measure);
                    }
                }
            }
            b"part" => {
                if let Some(part) = self.part.take() {
                    if part.divisions == 0 {
                        debug!(part = %part.id, "Part declares no divisions");
                    }
                    self.parts.push(part);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let Some(element) = self.path.last().map(String::as_str) else {
            return;
        };
        let parent = self
            .path
            .len()
            .checked_sub(2)
            .and_then(|i| self.path.get(i))
            .map(String::as_str);

        match (parent, element) {
            (Some("attributes"), "divisions") => {
                if let Ok(divisions) = text.parse::<u32>() {
                    if let Some(part) = self.part.as_mut() {
                        if part.divisions == 0 {
                            part.divisions = divisions;
                        }
                    }
                    self.divisions = Some(divisions);
                }
            }
            (Some("time"), "beats") => {
                // Composite meters such as "3+2" add up
                let beats: Option<f64> = text
                    .split('+')
                    .map(|b| b.trim().parse::<f64>().ok())
                    .sum();
                self.time_beats = beats;
            }
            (Some("time"), "beat-type") => {
                self.time_beat_type = text.parse().ok();
            }
            (Some("pitch"), "step") => {
                if let Some(n) = self.note.as_mut() {
                    n.step = NoteName::from_str(text);
                }
            }
            (Some("pitch"), "octave") => {
                if let Some(n) = self.note.as_mut() {
                    n.octave = text.parse().unwrap_or(4);
                }
            }
            (Some("pitch"), "alter") => {
                if let Some(n) = self.note.as_mut() {
                    n.alter = text.parse::<f64>().map(|a| a.round() as i8).unwrap_or(0);
                }
            }
            (Some("note"), "duration") => {
                if let Some(n) = self.note.as_mut() {
                    n.note.duration = text.parse().unwrap_or(0.0);
                }
            }
            (Some("note"), "voice") => {
                if let Some(n) = self.note.as_mut() {
                    n.note.voice = text.parse().unwrap_or(1);
                }
            }
            (Some("note"), "staff") => {
                if let Some(n) = self.note.as_mut() {
                    n.note.staff = text.parse().unwrap_or(1);
                }
            }
            _ => {}
        }
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

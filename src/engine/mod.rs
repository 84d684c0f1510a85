//! # Engine Module
//!
//! The playback engine: one tempo, one transport, one clock anchor shared by
//! the audio scheduler and every host.
//!
//! ## Sub-modules
//! - `types` - TransportState, ClockAnchor, PlayOutcome
//! - `transport` - [`PlaybackEngine`]
//! - `signals` - typed play/tempo/seek/visibility channel
//!
//! ## Beat Clock
//! ```text
//! current_beat = anchor.beat + (now - anchor.time) / seconds_per_beat
//! ```
//! The anchor is recomputed, never nudged, on play, seek, tempo change and
//! loop. While audio is running the audio clock decides the beat; the
//! animation anchor follows it whenever the two disagree by more than the
//! configured drift tolerance.
//!
//! ## Transport
//! ```text
//! Stopped --play--> Playing --pause/end--> Stopped
//!    |                 |
//!    +--pointer down---+--> Scrubbing --pointer up--> previous state
//! ```
//!
//! ## Example
//! ```rust
//! use gen_playback::audio::SoftwareScheduler;
//! use gen_playback::clock::ManualClock;
//! use gen_playback::engine::{PlayOutcome, PlaybackEngine};
//! use gen_playback::host::SeekRequest;
//! use gen_playback::{derive_timeline, read_musicxml, PlaybackConfig};
//!
//! let xml = r#"<score-partwise><part id="P1"><measure number="1">
//!   <attributes><divisions>1</divisions><time><beats>4</beats><beat-type>4</beat-type></time></attributes>
//!   <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
//! </measure></part></score-partwise>"#;
//! let timeline = derive_timeline(&read_musicxml(xml)?);
//!
//! let clock = ManualClock::new();
//! let audio = SoftwareScheduler::new(clock.clone());
//! let mut engine = PlaybackEngine::new(timeline, audio, clock.clone(), PlaybackConfig::default());
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! engine.seek(SeekRequest::Beat(1.0));
//! assert_eq!(rt.block_on(engine.play()), PlayOutcome::Started { audio: true });
//!
//! clock.advance(1.0);
//! assert_eq!(engine.tick(), Some(3.0));
//! # Ok::<(), gen_playback::PlaybackError>(())
//! ```

mod signals;
mod transport;
mod types;

#[cfg(test)]
mod tests;

pub use signals::{EngineSignal, SignalSender};
pub use transport::PlaybackEngine;
pub use types::{ClockAnchor, PlayOutcome, TransportState};

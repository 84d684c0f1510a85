pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod musicxml;
pub mod notation;
pub mod timeline;

#[cfg(test)]
mod testutil;

pub use config::PlaybackConfig;
pub use engine::{PlayOutcome, PlaybackEngine};
pub use error::*;
pub use musicxml::read_musicxml;
pub use timeline::{derive_timeline, TimedNote, Timeline};

/// Read a MusicXML score and derive its playback timeline.
/// This is the main entry point for the library.
pub fn load_timeline(xml: &str) -> Result<Timeline, PlaybackError> {
    let parts = read_musicxml(xml)?;
    Ok(derive_timeline(&parts))
}

//! # Error Types
//!
//! Errors the playback core can hand back to a caller.
//!
//! Only reading external input (MusicXML, YAML config) and audio
//! initialization return errors. Malformed beat/tie data, unmeasurable
//! surfaces and out-of-range tempo/seek values are absorbed where they occur
//! and logged instead.
//!
//! ## Error Types
//! - `NotationError` - MusicXML could not be read
//! - `ConfigError` - Invalid YAML or an out-of-range config value
//! - `AudioUnavailable` - The audio environment refused to start
//!
//! ## Usage
//! ```rust
//! use gen_playback::{read_musicxml, PlaybackError};
//!
//! match read_musicxml("<score-partwise><part id=\"P1\">") {
//!     Ok(parts) => println!("{} parts", parts.len()),
//!     Err(PlaybackError::NotationError(message)) => eprintln!("Bad score: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    /// MusicXML input could not be read.
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::NotationError("unexpected end of document".to_string());
    /// assert_eq!(err.to_string(), "Notation error: unexpected end of document");
    /// ```
    #[error("Notation error: {0}")]
    NotationError(String),

    /// Invalid playback configuration.
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::ConfigError("tempo must be greater than 0".to_string());
    /// assert_eq!(err.to_string(), "Invalid config: tempo must be greater than 0");
    /// ```
    #[error("Invalid config: {0}")]
    ConfigError(String),

    /// Audio initialization failed, e.g. the environment requires a user
    /// gesture before sound may start.
    #[error("Audio unavailable: {0}")]
    AudioUnavailable(String),
}

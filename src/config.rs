//! # Playback Configuration
//!
//! Tunables for the engine, hosts and audio scheduler, read from YAML with
//! kebab-case keys. Every key is optional:
//!
//! ```yaml
//! tempo: 96
//! loop: true
//! start-delay-ms: 150
//! fade-ms: 30
//! playhead-band-px: 24
//! reduced-motion: false
//! audio-required: true
//! drift-tolerance-beats: 0.05
//! ```
//!
//! ## Example
//! ```rust
//! use gen_playback::PlaybackConfig;
//!
//! let config = PlaybackConfig::from_yaml("tempo: 96\nloop: true")?;
//! assert_eq!(config.tempo, 96.0);
//! assert!(config.looping);
//! # Ok::<(), gen_playback::PlaybackError>(())
//! ```

use crate::error::PlaybackError;
use serde::Deserialize;

pub const DEFAULT_TEMPO: f64 = 120.0;
pub const DEFAULT_START_DELAY_MS: u64 = 150;
pub const DEFAULT_FADE_MS: u64 = 30;
pub const DEFAULT_PLAYHEAD_BAND_PX: f64 = 24.0;
pub const DEFAULT_DRIFT_TOLERANCE_BEATS: f64 = 0.05;

/// Raw config for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
    pub tempo: Option<f64>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub start_delay_ms: Option<u64>,
    pub fade_ms: Option<u64>,
    pub playhead_band_px: Option<f64>,
    pub reduced_motion: Option<bool>,
    pub audio_required: Option<bool>,
    pub drift_tolerance_beats: Option<f64>,
}

/// Validated playback configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Initial tempo in quarter-note BPM
    pub tempo: f64,
    /// Wrap to beat 0 at the end instead of stopping
    pub looping: bool,
    /// Pre-roll in seconds, applied only when starting from beat 0
    pub start_delay: f64,
    /// `stop_all` fade length in seconds
    pub fade: f64,
    /// Full width of the proximity band around the playhead, in pixels
    pub playhead_band_px: f64,
    /// Force every host into stepped timing
    pub reduced_motion: bool,
    /// Refuse to start visuals when audio fails to initialize
    pub audio_required: bool,
    /// Audio/animation disagreement (in beats) that triggers a re-anchor
    pub drift_tolerance_beats: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            looping: false,
            start_delay: DEFAULT_START_DELAY_MS as f64 / 1000.0,
            fade: DEFAULT_FADE_MS as f64 / 1000.0,
            playhead_band_px: DEFAULT_PLAYHEAD_BAND_PX,
            reduced_motion: false,
            audio_required: true,
            drift_tolerance_beats: DEFAULT_DRIFT_TOLERANCE_BEATS,
        }
    }
}

impl PlaybackConfig {
    /// Parse and validate a YAML config document.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, PlaybackError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| PlaybackError::ConfigError(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, PlaybackError> {
        let defaults = Self::default();

        let tempo = match raw.tempo {
            Some(t) if !t.is_finite() || t <= 0.0 => {
                return Err(PlaybackError::ConfigError(format!(
                    "tempo must be greater than 0, got {}",
                    t
                )));
            }
            Some(t) => t,
            None => defaults.tempo,
        };

        let playhead_band_px = match raw.playhead_band_px {
            Some(px) if !px.is_finite() || px < 0.0 => {
                return Err(PlaybackError::ConfigError(format!(
                    "playhead-band-px must be a non-negative number, got {}",
                    px
                )));
            }
            Some(px) => px,
            None => defaults.playhead_band_px,
        };

        let drift_tolerance_beats = match raw.drift_tolerance_beats {
            Some(d) if !d.is_finite() || d <= 0.0 => {
                return Err(PlaybackError::ConfigError(format!(
                    "drift-tolerance-beats must be greater than 0, got {}",
                    d
                )));
            }
            Some(d) => d,
            None => defaults.drift_tolerance_beats,
        };

        Ok(Self {
            tempo,
            looping: raw.looping.unwrap_or(defaults.looping),
            start_delay: raw
                .start_delay_ms
                .map(|ms| ms as f64 / 1000.0)
                .unwrap_or(defaults.start_delay),
            fade: raw
                .fade_ms
                .map(|ms| ms as f64 / 1000.0)
                .unwrap_or(defaults.fade),
            playhead_band_px,
            reduced_motion: raw.reduced_motion.unwrap_or(defaults.reduced_motion),
            audio_required: raw.audio_required.unwrap_or(defaults.audio_required),
            drift_tolerance_beats,
        })
    }
}

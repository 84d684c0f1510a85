//! # Timeline Module
//!
//! Derive a beat-indexed event list from structured notation for audio
//! scheduling and visual highlighting.
//!
//! ## Sub-modules
//! - `types` - Timeline, TimedNote, MeasureSpan type definitions
//! - `derive` - Two-pass derivation (beat positioning, tie merging)
//!
//! ## Entry Point
//! [`derive_timeline()`] - Convert notation parts into a [`Timeline`]
//!
//! ## Beat Axes
//!
//! Two beat conventions meet here:
//!
//! ### Note beats (1-based)
//! - `TimedNote::beat` counts from 1, the way musicians count
//! - Example: the second quarter note of the score starts at beat 2
//!
//! ### Engine positions (0-based)
//! - The engine, hosts and audio scheduler work on `0 ..= total_beats`
//! - `TimedNote::position()` converts: beat 2 is position 1.0
//!
//! ## Multi-staff Bookkeeping
//!
//! Every staff keeps its own cursor inside a measure, and only the declared
//! beat count moves the timeline on to the next measure. Staves that disagree
//! about where a measure ends are not reconciled.
//!
//! ## Related Modules
//! - `notation` - Input types
//! - `audio` - Schedules the derived notes
//! - `engine` - Owns the timeline for a playback session

mod derive;
mod types;


pub use derive::derive_timeline;
pub use types::{MeasureSpan, TimedNote, Timeline};

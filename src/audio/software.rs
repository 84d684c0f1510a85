//! Clock-driven software scheduler.
//!
//! Keeps a queue of voices timed against an audio [`Clock`] and hands
//! `NoteOn`/`NoteOff` events to whatever synthesizes them via [`SoftwareScheduler::poll`].

use super::{onset_offset, AudioScheduler, SCHEDULE_EPSILON};
use crate::clock::Clock;
use crate::config::DEFAULT_FADE_MS;
use crate::error::PlaybackError;
use crate::timeline::TimedNote;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum AudioStatus {
    Uninitialized,
    Ready,
    Failed,
}

/// A scheduled note on the audio clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// `TimedNote::index` of the source note
    pub note: usize,
    pub midi: u8,
    pub frequency: f64,
    /// Audio-clock onset in seconds
    pub start: f64,
    /// Audio-clock release in seconds
    pub end: f64,
    started: bool,
}

/// Events for the synthesizer, in audio-clock time.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    NoteOn {
        note: usize,
        midi: u8,
        frequency: f64,
        at: f64,
    },
    /// `fade` is the release ramp in seconds (0 for a natural note end)
    NoteOff {
        note: usize,
        midi: u8,
        at: f64,
        fade: f64,
    },
}

impl VoiceEvent {
    pub fn at(&self) -> f64 {
        match self {
            VoiceEvent::NoteOn { at, .. } | VoiceEvent::NoteOff { at, .. } => *at,
        }
    }
}

/// Software voice queue implementing [`AudioScheduler`].
///
/// # Example
/// ```rust
/// use gen_playback::audio::{AudioScheduler, SoftwareScheduler};
/// use gen_playback::clock::ManualClock;
///
/// let clock = ManualClock::new();
/// let mut audio = SoftwareScheduler::new(clock.clone()).with_gesture_required(true);
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// assert!(rt.block_on(audio.initialize()).is_err());
///
/// audio.unlock();
/// assert!(rt.block_on(audio.initialize()).is_ok());
/// assert_eq!(audio.current_time(), Some(0.0));
/// ```
#[derive(Debug)]
pub struct SoftwareScheduler<C: Clock> {
    clock: C,
    status: AudioStatus,
    require_gesture: bool,
    unlocked: bool,
    fade: f64,
    voices: Vec<Voice>,
    releases: Vec<VoiceEvent>,
    reschedules: usize,
}

impl<C: Clock> SoftwareScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            status: AudioStatus::Uninitialized,
            require_gesture: false,
            unlocked: false,
            fade: DEFAULT_FADE_MS as f64 / 1000.0,
            voices: Vec::new(),
            releases: Vec::new(),
            reschedules: 0,
        }
    }

    /// Refuse to start until [`unlock`](Self::unlock) is called, the way
    /// browsers refuse audio without a user gesture.
    pub fn with_gesture_required(mut self, required: bool) -> Self {
        self.require_gesture = required;
        self
    }

    /// Fade length used by `stop_all`, in seconds.
    pub fn with_fade(mut self, fade: f64) -> Self {
        self.fade = fade.max(0.0);
        self
    }

    /// Record the user gesture that allows audio to start.
    pub fn unlock(&mut self) {
        self.unlocked = true;
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Number of `schedule_from` calls that produced a schedule.
    pub fn reschedule_count(&self) -> usize {
        self.reschedules
    }

    pub fn fade(&self) -> f64 {
        self.fade
    }

    /// Events due at the current audio time, in time order.
    ///
    /// Finished voices are dropped from the queue.
    pub fn poll(&mut self) -> Vec<VoiceEvent> {
        let now = self.clock.now();
        let mut events = std::mem::take(&mut self.releases);

        for voice in self.voices.iter_mut() {
            if !voice.started && voice.start <= now {
                voice.started = true;
                events.push(VoiceEvent::NoteOn {
                    note: voice.note,
                    midi: voice.midi,
                    frequency: voice.frequency,
                    at: voice.start,
                });
            }
            if voice.started && voice.end <= now {
                events.push(VoiceEvent::NoteOff {
                    note: voice.note,
                    midi: voice.midi,
                    at: voice.end,
                    fade: 0.0,
                });
            }
        }
        self.voices.retain(|v| !(v.started && v.end <= now));

        events.sort_by(|a, b| a.at().total_cmp(&b.at()));
        events
    }

    /// Release sounding voices with a fade and drop the rest.
    fn release_all(&mut self, now: f64) {
        for voice in self.voices.drain(..) {
            if voice.started && voice.end > now {
                self.releases.push(VoiceEvent::NoteOff {
                    note: voice.note,
                    midi: voice.midi,
                    at: now,
                    fade: self.fade,
                });
            }
        }
    }
}

impl<C: Clock> AudioScheduler for SoftwareScheduler<C> {
    async fn initialize(&mut self) -> Result<(), PlaybackError> {
        if self.status == AudioStatus::Ready {
            return Ok(());
        }
        if self.require_gesture && !self.unlocked {
            self.status = AudioStatus::Failed;
            return Err(PlaybackError::AudioUnavailable(
                "audio start requires a user gesture".to_string(),
            ));
        }
        self.status = AudioStatus::Ready;
        info!("Audio scheduler ready.");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.status == AudioStatus::Ready
    }

    fn schedule_from(
        &mut self,
        events: &[TimedNote],
        tempo: f64,
        start_beat: f64,
        start_delay: f64,
    ) -> Option<f64> {
        if !self.is_ready() {
            warn!("Scheduling requested before audio initialization.");
            return None;
        }
        if !tempo.is_finite() || tempo <= 0.0 {
            warn!(tempo, "Refusing to schedule at an invalid tempo.");
            return None;
        }

        let now = self.clock.now();
        self.release_all(now);

        let reference = now + start_delay.max(0.0);
        let seconds_per_beat = 60.0 / tempo;
        for note in events
            .iter()
            .filter(|n| n.position() >= start_beat - SCHEDULE_EPSILON)
        {
            let start = reference + onset_offset(note, start_beat, tempo);
            self.voices.push(Voice {
                note: note.index,
                midi: note.pitch.midi(),
                frequency: note.pitch.frequency(),
                start,
                end: start + note.duration * seconds_per_beat,
                started: false,
            });
        }
        self.reschedules += 1;

        debug!(
            start_beat,
            tempo,
            reference,
            voices = self.voices.len(),
            "Scheduled audio"
        );
        Some(reference)
    }

    fn stop_all(&mut self) {
        let now = self.clock.now();
        self.release_all(now);
        debug!(releases = self.releases.len(), "Stopped all audio");
    }

    fn current_time(&self) -> Option<f64> {
        if self.is_ready() {
            Some(self.clock.now())
        } else {
            None
        }
    }
}

//! Playback engine
//!
//! Owns tempo, transport state and the clock anchor; drives the audio
//! scheduler and every registered host in lockstep.

use std::time::Duration;

use super::signals::{EngineSignal, SignalSender};
use super::types::{ClockAnchor, PlayOutcome, TransportState};
use crate::audio::AudioScheduler;
use crate::clock::Clock;
use crate::config::PlaybackConfig;
use crate::host::{BeatSource, HostController, HostId, SeekRequest, SetBeatOptions};
use crate::timeline::Timeline;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

/// Largest distance past beat 0 (and before the end) at which the loop flag
/// re-arms
const MAX_LOOP_REARM_BEATS: f64 = 0.5;

/// The top-level playback coordinator.
///
/// `C` is the animation clock; the audio scheduler brings its own. While audio
/// is active its clock decides the beat and the animation clock only follows.
pub struct PlaybackEngine<A: AudioScheduler, C: Clock> {
    timeline: Timeline,
    config: PlaybackConfig,
    audio: A,
    clock: C,
    hosts: Vec<(HostId, Box<dyn HostController>)>,
    next_host: HostId,
    state: TransportState,
    tempo: f64,
    beat: f64,
    anchor: ClockAnchor,
    audio_anchor: Option<ClockAnchor>,
    audio_active: bool,
    looped: bool,
    signal_tx: Sender<EngineSignal>,
    signal_rx: Receiver<EngineSignal>,
}

impl<A: AudioScheduler, C: Clock> PlaybackEngine<A, C> {
    pub fn new(timeline: Timeline, audio: A, clock: C, config: PlaybackConfig) -> Self {
        let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
        let anchor = ClockAnchor::new(clock.now(), 0.0);
        info!(
            notes = timeline.notes.len(),
            total_beats = timeline.total_beats,
            tempo = config.tempo,
            "Playback engine created"
        );
        Self {
            tempo: config.tempo,
            timeline,
            config,
            audio,
            clock,
            hosts: Vec::new(),
            next_host: 0,
            state: TransportState::Stopped,
            beat: 0.0,
            anchor,
            audio_anchor: None,
            audio_active: false,
            looped: false,
            signal_tx,
            signal_rx,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo
    }

    pub fn total_beats(&self) -> f64 {
        self.timeline.total_beats
    }

    pub fn anchor(&self) -> ClockAnchor {
        self.anchor
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Whether audio is driving the current playback.
    pub fn audio_active(&self) -> bool {
        self.audio_active
    }

    pub fn is_looping(&self) -> bool {
        self.config.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.config.looping = looping;
        self.looped = false;
    }

    /// The current beat, read fresh from the clocks while playing.
    pub fn current_beat(&self) -> f64 {
        if !self.is_playing() {
            return self.beat;
        }
        let beat = match self.audio_reading() {
            Some((anchor, audio_now)) => anchor.beat_at(audio_now, self.seconds_per_beat()),
            None => self.anchor.beat_at(self.clock.now(), self.seconds_per_beat()),
        };
        self.wrap(beat)
    }

    /// Start playback from the current beat.
    ///
    /// Waits for audio initialization before any host starts moving. Playing
    /// from the very end restarts at beat 0, and starting at beat 0 adds the
    /// configured pre-roll.
    pub async fn play(&mut self) -> PlayOutcome {
        match self.state {
            TransportState::Playing => return PlayOutcome::AlreadyPlaying,
            TransportState::Scrubbing { host, .. } => {
                self.state = TransportState::Scrubbing { host, resume: true };
                debug!(host, "Play deferred until scrub ends");
                return PlayOutcome::Deferred;
            }
            TransportState::Stopped => {}
        }

        let audio = match self.audio.initialize().await {
            Ok(()) => true,
            Err(e) if self.config.audio_required => {
                warn!(error = %e, "Not starting playback without audio");
                return PlayOutcome::Blocked;
            }
            Err(e) => {
                warn!(error = %e, "Playing visuals only");
                false
            }
        };

        let start = if self.beat >= self.total_beats() {
            0.0
        } else {
            self.beat
        };
        let delay = if start <= 0.0 {
            self.config.start_delay
        } else {
            0.0
        };

        self.state = TransportState::Playing;
        self.audio_active = audio;
        self.looped = false;
        self.rebase(start, delay);

        for (_, host) in self.hosts.iter_mut() {
            host.set_beat(start, SetBeatOptions::synced(BeatSource::Engine));
            host.set_running(true);
        }

        info!(
            beat = start,
            tempo = self.tempo,
            audio = self.audio_active,
            "Playback started"
        );
        PlayOutcome::Started {
            audio: self.audio_active,
        }
    }

    /// Stop audio and freeze every host at the current beat.
    ///
    /// During a scrub this only cancels the pending resume.
    pub fn pause(&mut self) {
        match self.state {
            TransportState::Stopped => {}
            TransportState::Scrubbing { host, .. } => {
                self.state = TransportState::Scrubbing {
                    host,
                    resume: false,
                };
            }
            TransportState::Playing => {
                let beat = self.current_beat();
                self.halt(beat);
                info!(beat, "Playback paused");
            }
        }
    }

    /// Play if paused, pause if playing. Returns whether playback is now
    /// running (or will be, once a scrub ends).
    pub async fn toggle(&mut self) -> bool {
        match self.state {
            TransportState::Playing
            | TransportState::Scrubbing { resume: true, .. } => {
                self.pause();
                false
            }
            _ => self.play().await != PlayOutcome::Blocked,
        }
    }

    /// Change the tempo, keeping the current beat.
    ///
    /// Returns false (and changes nothing) for non-finite or non-positive
    /// values.
    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            warn!(bpm, "Ignoring invalid tempo");
            return false;
        }
        let beat = self.current_beat();
        self.tempo = bpm;
        self.rebase(beat, 0.0);
        debug!(bpm, beat, "Tempo changed");
        true
    }

    /// Move to a new beat. Returns the clamped beat, or `None` when the
    /// request was not a finite number.
    pub fn seek(&mut self, request: SeekRequest) -> Option<f64> {
        self.seek_from(request, BeatSource::Seek)
    }

    fn seek_from(&mut self, request: SeekRequest, source: BeatSource) -> Option<f64> {
        let current = self.current_beat();
        let Some(beat) = request.resolve(current, self.total_beats()) else {
            debug!(?request, "Ignoring non-finite seek");
            return None;
        };
        self.looped = false;
        self.rebase(beat, 0.0);
        for (_, host) in self.hosts.iter_mut() {
            host.set_beat(beat, SetBeatOptions::synced(source));
        }
        debug!(beat, ?source, playing = self.is_playing(), "Seek");
        Some(beat)
    }

    /// Per-frame update. Returns the beat shown this tick, or `None` when
    /// not playing.
    pub fn tick(&mut self) -> Option<f64> {
        if !self.is_playing() {
            return None;
        }
        let now = self.clock.now();
        let spb = self.seconds_per_beat();
        let visual = self.anchor.beat_at(now, spb);

        let mut beat = match self.audio_reading() {
            Some((audio_anchor, audio_now)) => {
                let audio_beat = audio_anchor.beat_at(audio_now, spb);
                if (audio_beat - visual).abs() > self.config.drift_tolerance_beats {
                    debug!(audio_beat, visual, "Re-anchoring animation clock to audio");
                    self.anchor =
                        ClockAnchor::new(audio_anchor.time + (now - audio_now), audio_anchor.beat);
                }
                audio_beat
            }
            None => visual,
        };

        let total = self.total_beats();
        if beat >= total {
            if !self.config.looping || total <= 0.0 {
                self.halt(total);
                info!(total, "Reached end of timeline");
                return Some(total);
            }
            if self.looped {
                // A whole pass went by between two samples
                beat %= total;
                self.rebase(beat, 0.0);
                debug!(beat, "Wrapped again before the loop re-armed");
            } else {
                self.looped = true;
                self.rebase(0.0, 0.0);
                beat = 0.0;
                info!(tempo = self.tempo, "Looping to beat 0");
            }
        } else if self.looped {
            let rearm = MAX_LOOP_REARM_BEATS.min(total / 4.0);
            if beat >= rearm && beat < total - rearm {
                self.looped = false;
            }
        }

        beat = beat.max(0.0);
        self.beat = beat;
        for (_, host) in self.hosts.iter_mut() {
            host.advance(beat);
        }
        Some(beat)
    }

    /// A continuous host needs display-refresh callbacks.
    pub fn wants_frame_callback(&self) -> bool {
        self.is_playing() && self.hosts.iter().any(|(_, h)| !h.is_reduced())
    }

    /// Tick period for stepped hosts, when any is present and playing.
    ///
    /// `None` as well when a beat at the current tempo is too long to
    /// express as a [`Duration`].
    pub fn step_interval(&self) -> Option<Duration> {
        let stepped = self.hosts.iter().any(|(_, h)| h.is_reduced());
        if !(self.is_playing() && stepped) {
            return None;
        }
        Duration::try_from_secs_f64(self.seconds_per_beat()).ok()
    }

    /// Register a host and bring it to the current beat and running state.
    pub fn add_host<H: HostController + 'static>(&mut self, host: H) -> HostId {
        self.attach(Box::new(host))
    }

    pub fn remove_host(&mut self, id: HostId) -> bool {
        let Some(index) = self.hosts.iter().position(|(h, _)| *h == id) else {
            return false;
        };
        let (_, mut host) = self.hosts.remove(index);
        host.set_running(false);
        if let TransportState::Scrubbing { host: scrubbed, .. } = self.state {
            if scrubbed == id {
                info!(host = id, "Scrubbed host removed, cancelling scrub");
                self.state = TransportState::Stopped;
            }
        }
        debug!(host = id, "Host removed");
        true
    }

    pub fn host(&self, id: HostId) -> Option<&dyn HostController> {
        self.hosts
            .iter()
            .find(|(h, _)| *h == id)
            .map(|(_, host)| &**host)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Replace every host after the rendered surfaces changed.
    pub fn rebuild(&mut self, hosts: Vec<Box<dyn HostController>>) -> Vec<HostId> {
        if matches!(self.state, TransportState::Scrubbing { .. }) {
            self.state = TransportState::Stopped;
        }
        for (_, mut host) in self.hosts.drain(..) {
            host.set_running(false);
        }
        let ids: Vec<HostId> = hosts.into_iter().map(|h| self.attach(h)).collect();
        info!(hosts = ids.len(), "Hosts rebuilt");
        ids
    }

    /// Re-measure every host, e.g. after a viewport resize.
    pub fn remeasure_all(&mut self) {
        for (_, host) in self.hosts.iter_mut() {
            host.remeasure();
        }
    }

    /// Pointer down on a host: pause and start scrubbing.
    pub fn pointer_down(&mut self, id: HostId, x: f64) -> bool {
        if matches!(self.state, TransportState::Scrubbing { .. }) || self.host(id).is_none() {
            return false;
        }
        let resume = self.is_playing();
        if resume {
            self.pause();
        }
        if let Some(host) = self.host_mut(id) {
            host.begin_scrub(x);
        }
        self.state = TransportState::Scrubbing { host: id, resume };
        debug!(host = id, resume, "Scrub started");
        true
    }

    /// Pointer move during a scrub. Returns the beat sought to.
    pub fn pointer_move(&mut self, id: HostId, x: f64) -> Option<f64> {
        match self.state {
            TransportState::Scrubbing { host, .. } if host == id => {}
            _ => return None,
        }
        let beat = self.host_mut(id)?.scrub_to(x)?;
        self.seek_from(SeekRequest::Beat(beat), BeatSource::Scrub)
    }

    /// Pointer up: end the scrub and resume if playback was running before.
    pub async fn pointer_up(&mut self, id: HostId) -> Option<PlayOutcome> {
        let resume = match self.state {
            TransportState::Scrubbing { host, resume } if host == id => resume,
            _ => return None,
        };
        if let Some(host) = self.host_mut(id) {
            host.end_scrub();
        }
        self.state = TransportState::Stopped;
        debug!(host = id, resume, "Scrub ended");
        if resume {
            Some(self.play().await)
        } else {
            None
        }
    }

    pub async fn pointer_cancel(&mut self, id: HostId) -> Option<PlayOutcome> {
        self.pointer_up(id).await
    }

    /// Scroll event from a host. User scrolls seek.
    pub fn scroll(&mut self, id: HostId, offset: f64) -> Option<f64> {
        let beat = self.host_mut(id)?.on_scroll(offset)?;
        self.seek_from(SeekRequest::Beat(beat), BeatSource::Scroll)
    }

    /// Wheel input on a host.
    pub fn wheel(&mut self, id: HostId, delta: f64) -> Option<f64> {
        let beat = self.host_mut(id)?.on_wheel(delta)?;
        self.seek_from(SeekRequest::Beat(beat), BeatSource::Scroll)
    }

    pub fn frame_painted(&mut self, id: HostId) {
        if let Some(host) = self.host_mut(id) {
            host.frame_painted();
        }
    }

    /// Hidden pages never keep playing.
    pub fn visibility_changed(&mut self, visible: bool) {
        if visible {
            return;
        }
        if self.state != TransportState::Stopped {
            info!("Hidden, pausing playback");
            self.pause();
        }
    }

    /// Publisher for play/tempo/seek/visibility requests.
    pub fn signal_sender(&self) -> SignalSender {
        SignalSender::new(self.signal_tx.clone())
    }

    /// Apply every queued signal in order. Returns how many were handled.
    pub async fn process_signals(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            debug!(?signal, "Applying signal");
            match signal {
                EngineSignal::TogglePlay => {
                    self.toggle().await;
                }
                EngineSignal::SetTempo(bpm) => {
                    self.set_tempo(bpm);
                }
                EngineSignal::Seek(request) => {
                    self.seek(request);
                }
                EngineSignal::VisibilityChanged(visible) => self.visibility_changed(visible),
            }
            handled += 1;
        }
        handled
    }

    /// Stop audio and release every host.
    pub fn dispose(&mut self) {
        if self.audio.is_ready() {
            self.audio.stop_all();
        }
        for (_, mut host) in self.hosts.drain(..) {
            host.set_running(false);
        }
        self.state = TransportState::Stopped;
        self.audio_active = false;
        self.audio_anchor = None;
        info!("Playback engine disposed");
    }

    fn attach(&mut self, mut host: Box<dyn HostController>) -> HostId {
        let id = self.next_host;
        self.next_host += 1;
        host.set_beat(self.current_beat(), SetBeatOptions::synced(BeatSource::Engine));
        host.set_running(self.is_playing());
        debug!(host = id, reduced = host.is_reduced(), "Host added");
        self.hosts.push((id, host));
        id
    }

    fn host_mut(&mut self, id: HostId) -> Option<&mut Box<dyn HostController>> {
        self.hosts
            .iter_mut()
            .find(|(h, _)| *h == id)
            .map(|(_, host)| host)
    }

    /// The audio anchor and audio-clock reading, when audio drives playback.
    fn audio_reading(&self) -> Option<(ClockAnchor, f64)> {
        if !self.audio_active {
            return None;
        }
        Some((self.audio_anchor?, self.audio.current_time()?))
    }

    fn wrap(&self, beat: f64) -> f64 {
        let total = self.total_beats().max(0.0);
        if self.config.looping && total > 0.0 && beat >= total {
            beat % total
        } else {
            beat.clamp(0.0, total)
        }
    }

    /// Recompute the anchors at `beat`, `delay` seconds from now, and
    /// reschedule audio when it drives playback.
    fn rebase(&mut self, beat: f64, delay: f64) {
        let now = self.clock.now();
        self.beat = beat;
        self.audio_anchor = None;

        if self.is_playing() && self.audio_active {
            let audio_now = self.audio.current_time();
            let reference =
                self.audio
                    .schedule_from(&self.timeline.notes, self.tempo, beat, delay);
            if let (Some(audio_now), Some(reference)) = (audio_now, reference) {
                self.audio_anchor = Some(ClockAnchor::new(reference, beat));
                self.anchor = ClockAnchor::new(now + (reference - audio_now), beat);
                return;
            }
            warn!(beat, "Audio scheduling failed, continuing visuals only");
            self.audio_active = false;
        }
        self.anchor = ClockAnchor::new(now + delay, beat);
    }

    fn halt(&mut self, beat: f64) {
        if self.audio.is_ready() {
            self.audio.stop_all();
        }
        self.state = TransportState::Stopped;
        self.rebase(beat, 0.0);
        for (_, host) in self.hosts.iter_mut() {
            host.set_running(false);
            host.set_beat(beat, SetBeatOptions::synced(BeatSource::Engine));
        }
    }
}

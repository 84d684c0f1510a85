use super::*;
use crate::audio::SoftwareScheduler;
use crate::clock::{Clock, ManualClock};
use crate::config::PlaybackConfig;
use crate::host::{HostController, HostId, HostSurface, SeekRequest};
use crate::testutil::{quarter_note_part, FakeSurface};
use crate::timeline::{derive_timeline, Timeline};
use std::time::Duration;

type TestEngine = PlaybackEngine<SoftwareScheduler<ManualClock>, ManualClock>;

const FRAME: f64 = 1.0 / 60.0;

/// Two 4/4 measures of quarter notes: 8 beats, 8 notes
fn timeline() -> Timeline {
    derive_timeline(&[quarter_note_part(2)])
}

fn engine_with(config: PlaybackConfig) -> (TestEngine, ManualClock) {
    let clock = ManualClock::new();
    let audio = SoftwareScheduler::new(clock.clone());
    (
        PlaybackEngine::new(timeline(), audio, clock.clone(), config),
        clock,
    )
}

fn engine() -> (TestEngine, ManualClock) {
    engine_with(PlaybackConfig::default())
}

fn looping() -> PlaybackConfig {
    PlaybackConfig {
        looping: true,
        ..PlaybackConfig::default()
    }
}

fn add_surface(engine: &mut TestEngine, surface: FakeSurface) -> HostId {
    let host = HostSurface::new(surface, engine.total_beats(), engine.config());
    engine.add_host(host)
}

fn strip() -> FakeSurface {
    FakeSurface::strip(100.0, 40.0, 8, 60.0)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[tokio::test]
async fn test_play_holds_beat_during_preroll() {
    let (mut engine, clock) = engine();

    assert_eq!(engine.play().await, PlayOutcome::Started { audio: true });
    assert!(engine.is_playing());
    assert_eq!(engine.audio().reschedule_count(), 1);

    // 150ms pre-roll from beat 0
    clock.advance(0.1);
    assert_eq!(engine.tick(), Some(0.0));
    clock.advance(0.05);
    assert_close(engine.tick().unwrap(), 0.0);

    clock.advance(0.5);
    assert_close(engine.tick().unwrap(), 1.0);
}

#[tokio::test]
async fn test_no_preroll_away_from_start() {
    let (mut engine, clock) = engine();
    engine.seek(SeekRequest::Beat(2.0));
    engine.play().await;

    assert_eq!(engine.anchor().time, 0.0);
    clock.advance(0.25);
    assert_close(engine.tick().unwrap(), 2.5);
}

#[tokio::test]
async fn test_play_when_playing_is_noop() {
    let (mut engine, _clock) = engine();
    engine.play().await;
    assert_eq!(engine.play().await, PlayOutcome::AlreadyPlaying);
    assert_eq!(engine.audio().reschedule_count(), 1);
}

#[tokio::test]
async fn test_pause_freezes_beat() {
    let (mut engine, clock) = engine();
    engine.seek(SeekRequest::Beat(2.0));
    engine.play().await;

    clock.advance(0.5);
    engine.pause();
    assert!(!engine.is_playing());
    assert_eq!(engine.state(), TransportState::Stopped);
    assert_close(engine.current_beat(), 3.0);
    assert!(engine.audio().voices().is_empty());

    clock.advance(2.0);
    assert_eq!(engine.tick(), None);
    assert_close(engine.current_beat(), 3.0);
}

#[test]
fn test_seek_clamps_and_ignores_non_finite() {
    let (mut engine, _clock) = engine();

    assert_eq!(engine.seek(SeekRequest::Progress(0.5)), Some(4.0));
    assert_eq!(engine.seek(SeekRequest::Delta(-10.0)), Some(0.0));
    assert_eq!(engine.seek(SeekRequest::Beat(100.0)), Some(8.0));
    assert_eq!(engine.seek(SeekRequest::Beat(f64::NAN)), None);
    assert_eq!(engine.current_beat(), 8.0);
}

#[test]
fn test_seek_is_idempotent_when_stopped() {
    let (mut engine, clock) = engine();
    clock.set(3.0);

    engine.seek(SeekRequest::Beat(3.0));
    let once = engine.anchor();
    engine.seek(SeekRequest::Beat(engine.current_beat()));
    assert_eq!(engine.anchor(), once);
    assert_eq!(once, ClockAnchor::new(3.0, 3.0));
}

#[tokio::test]
async fn test_seek_is_idempotent_while_playing() {
    let (mut engine, clock) = engine();
    engine.play().await;
    clock.advance(1.0);

    let beat = engine.current_beat();
    assert_close(beat, 1.7);
    engine.seek(SeekRequest::Beat(beat));
    let once = engine.anchor();
    engine.seek(SeekRequest::Beat(engine.current_beat()));
    assert_eq!(engine.anchor(), once);

    // Each seek while playing reschedules without delay
    assert_eq!(engine.audio().reschedule_count(), 3);
    assert_eq!(once.time, 1.0);
}

#[tokio::test]
async fn test_tempo_change_keeps_current_beat() {
    let (mut engine, clock) = engine();
    engine.seek(SeekRequest::Beat(2.0));
    engine.play().await;
    clock.advance(1.0);
    assert_close(engine.tick().unwrap(), 4.0);

    assert!(engine.set_tempo(90.0));
    assert_close(engine.current_beat(), 4.0);
    assert_eq!(engine.audio().reschedule_count(), 2);

    // 90 BPM: 1.5 beats per second from here on
    clock.advance(1.0);
    assert_close(engine.tick().unwrap(), 5.5);
}

#[test]
fn test_tempo_60_then_120_halves_seconds_per_beat() {
    let (mut engine, _clock) = engine();
    engine.seek(SeekRequest::Beat(3.0));

    assert!(engine.set_tempo(60.0));
    assert_eq!(engine.seconds_per_beat(), 1.0);
    assert!(engine.set_tempo(120.0));
    assert_eq!(engine.seconds_per_beat(), 0.5);
    assert_eq!(engine.current_beat(), 3.0);
}

#[test]
fn test_invalid_tempo_is_ignored() {
    let (mut engine, _clock) = engine();
    for bpm in [f64::NAN, f64::INFINITY, 0.0, -40.0] {
        assert!(!engine.set_tempo(bpm));
    }
    assert_eq!(engine.tempo(), 120.0);
}

#[tokio::test]
async fn test_loop_reschedules_once_per_crossing() {
    let (mut engine, clock) = engine_with(looping());
    engine.play().await;

    let mut previous = 0.0;
    let mut wraps = 0;
    for _ in 0..540 {
        clock.advance(FRAME);
        let beat = engine.tick().unwrap();
        assert!((0.0..8.0).contains(&beat), "beat {beat} out of range");
        if beat < previous {
            wraps += 1;
        }
        previous = beat;
    }

    assert_eq!(wraps, 2);
    assert_eq!(engine.audio().reschedule_count(), 1 + wraps);
    assert!(engine.is_playing());
}

#[tokio::test]
async fn test_loop_flag_rearms_inside_range() {
    let (mut engine, clock) = engine_with(looping());
    engine.seek(SeekRequest::Beat(7.5));
    engine.play().await;
    assert_eq!(engine.audio().reschedule_count(), 1);

    clock.advance(0.5);
    assert_eq!(engine.tick(), Some(0.0));
    assert_eq!(engine.anchor().beat, 0.0);
    assert_eq!(engine.audio().reschedule_count(), 2);

    // Same instant again: still the same crossing
    assert_eq!(engine.tick(), Some(0.0));
    assert_eq!(engine.audio().reschedule_count(), 2);

    // Not yet re-armed at 0.2 beats
    clock.advance(0.1);
    assert_close(engine.tick().unwrap(), 0.2);
    assert_eq!(engine.audio().reschedule_count(), 2);

    // A throttled frame jumps a whole pass: wraps once, keeping phase
    clock.advance(4.0);
    assert_close(engine.tick().unwrap(), 0.2);
    assert_eq!(engine.audio().reschedule_count(), 3);

    // Back inside the range the next crossing loops normally
    clock.advance(0.5);
    assert_close(engine.tick().unwrap(), 1.2);
    clock.advance(3.5);
    assert_eq!(engine.tick(), Some(0.0));
    assert_eq!(engine.audio().reschedule_count(), 4);
}

#[tokio::test]
async fn test_end_without_loop_stops_at_total() {
    let (mut engine, clock) = engine();
    let surface = strip();
    let id = add_surface(&mut engine, surface.clone());
    engine.seek(SeekRequest::Beat(7.0));
    engine.play().await;
    assert!(surface.record().running);

    clock.advance(0.6);
    assert_eq!(engine.tick(), Some(8.0));
    assert!(!engine.is_playing());
    assert_eq!(engine.current_beat(), 8.0);
    assert!(engine.audio().voices().is_empty());
    assert!(!surface.record().running);
    assert_eq!(engine.host(id).unwrap().beat(), 8.0);

    // Playing from the end starts over, with pre-roll
    engine.play().await;
    assert_eq!(engine.anchor().beat, 0.0);
    assert_close(engine.anchor().time, clock.now() + 0.15);
}

#[tokio::test]
async fn test_audio_gated_play_is_blocked() {
    let clock = ManualClock::new();
    let audio = SoftwareScheduler::new(clock.clone()).with_gesture_required(true);
    let mut engine = PlaybackEngine::new(timeline(), audio, clock.clone(), PlaybackConfig::default());
    let surface = strip();
    add_surface(&mut engine, surface.clone());

    assert_eq!(engine.play().await, PlayOutcome::Blocked);
    assert!(!engine.is_playing());
    assert!(!surface.record().running);
    assert!(!engine.wants_frame_callback());

    engine.audio_mut().unlock();
    assert_eq!(engine.play().await, PlayOutcome::Started { audio: true });
    assert!(surface.record().running);
}

#[tokio::test]
async fn test_visual_only_when_audio_optional() {
    let clock = ManualClock::new();
    let audio = SoftwareScheduler::new(clock.clone()).with_gesture_required(true);
    let config = PlaybackConfig {
        audio_required: false,
        ..PlaybackConfig::default()
    };
    let mut engine = PlaybackEngine::new(timeline(), audio, clock.clone(), config);

    assert_eq!(engine.play().await, PlayOutcome::Started { audio: false });
    assert!(!engine.audio_active());

    clock.advance(1.15);
    assert_close(engine.tick().unwrap(), 2.0);
    assert_eq!(engine.audio().reschedule_count(), 0);
}

#[tokio::test]
async fn test_audio_clock_wins_and_reanchors_on_drift() {
    let animation = ManualClock::new();
    let audio_clock = ManualClock::new();
    let audio = SoftwareScheduler::new(audio_clock.clone());
    let mut engine =
        PlaybackEngine::new(timeline(), audio, animation.clone(), PlaybackConfig::default());
    engine.seek(SeekRequest::Beat(2.0));
    engine.play().await;

    // Small disagreement stays within tolerance
    animation.advance(0.5);
    audio_clock.advance(0.51);
    let before = engine.anchor();
    assert_close(engine.tick().unwrap(), 3.02);
    assert_eq!(engine.anchor(), before);

    // The animation clock fell well behind the audio clock
    animation.advance(0.5);
    audio_clock.advance(0.69);
    assert_close(engine.tick().unwrap(), 4.4);
    let reanchored = engine.anchor();
    assert_close(reanchored.beat_at(animation.now(), engine.seconds_per_beat()), 4.4);

    animation.advance(0.5);
    audio_clock.advance(0.5);
    assert_close(engine.tick().unwrap(), 5.4);
    assert_eq!(engine.anchor(), reanchored);
}

#[tokio::test]
async fn test_scrub_pauses_and_resumes() {
    let (mut engine, clock) = engine();
    let id = add_surface(&mut engine, strip());
    engine.seek(SeekRequest::Beat(2.0));
    engine.play().await;
    clock.advance(0.5);
    assert_close(engine.tick().unwrap(), 3.0);

    assert!(engine.pointer_down(id, 300.0));
    assert_eq!(
        engine.state(),
        TransportState::Scrubbing {
            host: id,
            resume: true
        }
    );
    assert!(!engine.is_playing());
    assert!(engine.audio().voices().is_empty());
    assert!(!engine.pointer_down(id, 300.0));

    // Dragging content left by one beat's width moves forward a beat
    assert_close(engine.pointer_move(id, 260.0).unwrap(), 4.0);
    assert_eq!(engine.pointer_move(id + 1, 200.0), None);
    assert_close(engine.current_beat(), 4.0);

    let outcome = engine.pointer_up(id).await;
    assert_eq!(outcome, Some(PlayOutcome::Started { audio: true }));
    assert!(engine.is_playing());
    assert_close(engine.anchor().beat, 4.0);
}

#[tokio::test]
async fn test_scrub_from_stopped_stays_stopped() {
    let (mut engine, _clock) = engine();
    let id = add_surface(&mut engine, strip());

    assert!(engine.pointer_down(id, 300.0));
    assert_eq!(engine.pointer_cancel(id).await, None);
    assert_eq!(engine.state(), TransportState::Stopped);
    assert!(!engine.pointer_down(id + 7, 0.0));
}

#[tokio::test]
async fn test_play_during_scrub_is_deferred() {
    let (mut engine, _clock) = engine();
    let id = add_surface(&mut engine, strip());

    engine.pointer_down(id, 300.0);
    assert_eq!(engine.play().await, PlayOutcome::Deferred);
    assert_eq!(
        engine.state(),
        TransportState::Scrubbing {
            host: id,
            resume: true
        }
    );
    assert_eq!(
        engine.pointer_up(id).await,
        Some(PlayOutcome::Started { audio: true })
    );

    // Pausing mid-scrub cancels the resume
    engine.pointer_down(id, 300.0);
    engine.pause();
    assert_eq!(engine.pointer_up(id).await, None);
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn test_stepped_host_fallback() {
    let (mut engine, clock) = engine();
    let smooth = add_surface(&mut engine, strip());
    let stepped = add_surface(&mut engine, FakeSurface::unmeasurable(60.0));
    assert!(engine.host(stepped).unwrap().is_reduced());
    assert!(!engine.wants_frame_callback());
    assert_eq!(engine.step_interval(), None);

    engine.seek(SeekRequest::Beat(1.0));
    engine.play().await;
    assert!(engine.wants_frame_callback());
    assert_eq!(engine.step_interval(), Some(Duration::from_millis(500)));

    clock.advance(0.3);
    engine.tick();
    assert_close(engine.host(smooth).unwrap().beat(), 1.6);
    assert_eq!(engine.host(stepped).unwrap().beat(), 1.0);

    clock.advance(0.25);
    engine.tick();
    assert_eq!(engine.host(stepped).unwrap().beat(), 2.0);

    // Seeking mid-beat keeps the stepped host on whole beats
    engine.seek(SeekRequest::Beat(4.5));
    assert_close(engine.host(smooth).unwrap().beat(), 4.5);
    assert_eq!(engine.host(stepped).unwrap().beat(), 4.0);
    clock.advance(0.1);
    engine.tick();
    assert_eq!(engine.host(stepped).unwrap().beat(), 4.0);

    // Only stepped hosts left: no frame callback, the timer keeps going
    assert!(engine.remove_host(smooth));
    assert!(!engine.remove_host(smooth));
    assert!(!engine.wants_frame_callback());
    assert!(engine.step_interval().is_some());
}

#[tokio::test]
async fn test_step_interval_survives_extreme_tempo() {
    let (mut engine, _clock) = engine();
    add_surface(&mut engine, FakeSurface::unmeasurable(60.0));
    engine.play().await;

    assert!(engine.set_tempo(1e-300));
    assert_eq!(engine.step_interval(), None);

    assert!(engine.set_tempo(60.0));
    assert_eq!(engine.step_interval(), Some(Duration::from_secs(1)));
}

#[test]
fn test_added_host_syncs_to_current_beat() {
    let (mut engine, _clock) = engine();
    engine.seek(SeekRequest::Beat(3.0));

    let surface = strip();
    let id = add_surface(&mut engine, surface.clone());
    assert_eq!(engine.host(id).unwrap().beat(), 3.0);
    assert_eq!(surface.scroll(), 160.0);

    engine.seek(SeekRequest::Delta(1.0));
    assert_eq!(surface.scroll(), 200.0);
}

#[test]
fn test_user_scroll_and_wheel_seek() {
    let (mut engine, _clock) = engine();
    let id = add_surface(&mut engine, strip());
    engine.frame_painted(id);

    assert_eq!(engine.scroll(id, 200.0), Some(4.0));
    assert_eq!(engine.current_beat(), 4.0);
    assert_eq!(engine.wheel(id, 40.0), Some(5.0));
    assert_eq!(engine.current_beat(), 5.0);
    // Our own scroll write echoes back and is ignored
    assert_eq!(engine.scroll(id, 240.0), None);
    assert_eq!(engine.scroll(id + 1, 0.0), None);
}

#[test]
fn test_remeasure_all_keeps_beat() {
    let (mut engine, _clock) = engine();
    let surface = strip();
    add_surface(&mut engine, surface.clone());
    engine.seek(SeekRequest::Beat(2.0));
    assert_eq!(surface.scroll(), 120.0);

    {
        let mut record = surface.record_mut();
        record.markers = (0..=8).map(|b| 100.0 + b as f64 * 60.0).collect();
        record.playhead = 80.0;
    }
    engine.remeasure_all();
    assert_eq!(surface.scroll(), 140.0);
    assert_eq!(engine.current_beat(), 2.0);
}

#[tokio::test]
async fn test_rebuild_replaces_hosts() {
    let (mut engine, _clock) = engine();
    let old = strip();
    let old_id = add_surface(&mut engine, old.clone());
    engine.play().await;

    let config = engine.config().clone();
    let fresh = strip();
    let hosts: Vec<Box<dyn HostController>> = vec![
        Box::new(HostSurface::new(fresh.clone(), 8.0, &config)),
        Box::new(HostSurface::new(FakeSurface::unmeasurable(0.0), 8.0, &config)),
    ];
    let ids = engine.rebuild(hosts);

    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&old_id));
    assert!(engine.host(old_id).is_none());
    assert!(!old.record().running);
    assert!(fresh.record().running);
}

#[tokio::test]
async fn test_toggle() {
    let (mut engine, _clock) = engine();
    assert!(engine.toggle().await);
    assert!(engine.is_playing());
    assert!(!engine.toggle().await);
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn test_signals_apply_in_order() {
    let (mut engine, _clock) = engine();
    let sender = engine.signal_sender();

    assert!(sender.set_tempo(90.0));
    assert!(sender.seek(SeekRequest::Beat(2.0)));
    assert!(sender.set_tempo(f64::NAN));
    assert!(sender.toggle_play());
    assert_eq!(engine.process_signals().await, 4);

    assert!(engine.is_playing());
    assert_eq!(engine.tempo(), 90.0);
    assert_eq!(engine.anchor().beat, 2.0);
    assert_eq!(engine.process_signals().await, 0);

    sender.visibility_changed(false);
    engine.process_signals().await;
    assert!(!engine.is_playing());

    drop(engine);
    assert!(!sender.toggle_play());
}

#[tokio::test]
async fn test_hidden_page_pauses() {
    let (mut engine, _clock) = engine();
    engine.play().await;

    engine.visibility_changed(true);
    assert!(engine.is_playing());
    engine.visibility_changed(false);
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn test_dispose_releases_everything() {
    let (mut engine, _clock) = engine();
    let surface = strip();
    add_surface(&mut engine, surface.clone());
    engine.play().await;

    engine.dispose();
    assert!(!engine.is_playing());
    assert_eq!(engine.host_count(), 0);
    assert!(!surface.record().running);
    assert!(engine.audio().voices().is_empty());
    assert_eq!(engine.tick(), None);
}

use std::env;
use std::fs;
use std::process;

use gen_playback::audio::{SoftwareScheduler, VoiceEvent};
use gen_playback::clock::{Clock, ManualClock};
use gen_playback::{PlayOutcome, PlaybackConfig, PlaybackEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: gen-playback <score.musicxml> [--config <file.yaml>] [--simulate <seconds>]";

/// Frame rate of the headless simulation
const SIMULATION_FPS: f64 = 60.0;

struct Args {
    score: String,
    config: Option<String>,
    simulate: Option<f64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut score = None;
    let mut config = None;
    let mut simulate = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(args.next().ok_or("--config needs a file")?);
            }
            "--simulate" => {
                let value = args.next().ok_or("--simulate needs a duration")?;
                let seconds: f64 = value
                    .parse()
                    .map_err(|_| format!("Invalid duration '{}'", value))?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(format!("Invalid duration '{}'", value));
                }
                simulate = Some(seconds);
            }
            _ if score.is_none() => score = Some(arg),
            _ => return Err(format!("Unexpected argument '{}'", arg)),
        }
    }

    Ok(Args {
        score: score.ok_or("Missing score file")?,
        config,
        simulate,
    })
}

fn read(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    let config = match args.config.as_deref().map(read) {
        Some(yaml) => match PlaybackConfig::from_yaml(&yaml) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => PlaybackConfig::default(),
    };

    let timeline = match gen_playback::load_timeline(&read(&args.score)) {
        Ok(timeline) => timeline,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&timeline) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing timeline: {}", e);
            process::exit(1);
        }
    }

    if let Some(seconds) = args.simulate {
        simulate(timeline, config, seconds).await;
    }
}

/// Run the engine on a manual clock and log what a listener would see.
async fn simulate(timeline: gen_playback::Timeline, config: PlaybackConfig, seconds: f64) {
    let clock = ManualClock::new();
    let audio = SoftwareScheduler::new(clock.clone()).with_fade(config.fade);
    let mut engine = PlaybackEngine::new(timeline, audio, clock.clone(), config);

    if let PlayOutcome::Blocked = engine.play().await {
        eprintln!("Audio unavailable, nothing to simulate");
        process::exit(1);
    }

    let frames = (seconds * SIMULATION_FPS).ceil() as usize;
    let mut last_whole = None;
    for _ in 0..frames {
        clock.advance(1.0 / SIMULATION_FPS);
        let Some(beat) = engine.tick() else {
            break;
        };

        let whole = beat.floor() as i64;
        if last_whole != Some(whole) {
            last_whole = Some(whole);
            info!(time = clock.now(), beat = whole, "Beat");
        }

        for event in engine.audio_mut().poll() {
            match event {
                VoiceEvent::NoteOn { note, midi, at, .. } => info!(note, midi, at, "Note on"),
                VoiceEvent::NoteOff {
                    note,
                    midi,
                    at,
                    fade,
                } => info!(note, midi, at, fade, "Note off"),
            }
        }
    }

    engine.dispose();
}


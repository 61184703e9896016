mod analyser;
mod app;
mod capture;
mod source;
mod synth;
mod ui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use deck_core::{EngineSettings, RenderLoop};
use deck_proto::config::Config;
use deck_proto::QualityTier;

use crate::source::{LabBackend, Source};

/// Terminal bench for the deck analysis core: meters, spectrum and
/// oscilloscope over a synthetic tone or the default input device.
#[derive(Debug, Parser)]
#[command(name = "sound-viz-lab", version)]
struct Args {
    /// Starting quality tier (ultra, high, medium, low)
    #[arg(long)]
    tier: Option<QualityTier>,

    /// Host frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Keep the tier fixed regardless of measured performance
    #[arg(long)]
    no_auto_adjust: bool,

    #[arg(long, value_enum, default_value_t = Source::Synth)]
    source: Source,

    /// Test tone frequency in Hz
    #[arg(long)]
    tone: Option<f32>,

    /// Run headless for this many frames and print the final snapshot as JSON
    #[arg(long, value_name = "FRAMES")]
    dump: Option<u64>,

    /// Read configuration from this file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_path = deck_proto::platform::log_path();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("sound-viz-lab log: {}", log_path.display());
    tracing::info!("sound-viz-lab starting");

    // ── Config + CLI overrides ───────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(tier) = args.tier {
        config.quality.initial_tier = tier;
    }
    if args.no_auto_adjust {
        config.quality.auto_adjust = false;
    }
    if let Some(fps) = args.fps {
        config.lab.frame_rate = fps;
    }
    if let Some(tone) = args.tone {
        config.lab.tone_hz = tone;
    }
    let frame_rate = config.lab.frame_rate.clamp(1, 240);

    let backend = LabBackend::open(args.source, config.lab.tone_hz);
    backend.apply_sample_rate(&mut config.spectrum);
    let track = backend.track(config.lab.tone_hz);
    let engine = RenderLoop::new(backend, EngineSettings::from_config(&config));
    tracing::info!(
        "tier={} auto_adjust={} fps={} source={:?}",
        engine.profile().tier,
        config.quality.auto_adjust,
        frame_rate,
        args.source
    );

    if let Some(frames) = args.dump {
        return dump(engine, &track, frames, frame_rate);
    }

    let app = app::App::new(engine, track, frame_rate);
    app.run().await
}

/// Drive the engine on a simulated clock and print where it ends up.
fn dump(
    mut engine: RenderLoop<LabBackend>,
    track: &deck_core::TrackRef,
    frames: u64,
    frame_rate: u32,
) -> anyhow::Result<()> {
    let step = Duration::from_millis(1000 / u64::from(frame_rate));
    let mut now = Instant::now();
    let token = engine.play(track, now)?;

    for _ in 0..frames {
        now += step;
        engine.on_frame(token, now);
        engine.poll_timers(now);
    }

    tracing::info!("dumped snapshot after {} frames", frames);
    println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
    Ok(())
}

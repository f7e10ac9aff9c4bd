use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use swing_tempo::audio::render::click_offsets;
use swing_tempo::audio::{AudioArtifact, WavSummary};
use swing_tempo::config::AppConfig;
use swing_tempo::engine::{AudioBackend, CpalBackend, EngineHandle, StubBackend};
use swing_tempo::presets::{self, ClubPreset, CLUB_PRESETS};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "swing_cli",
    about = "Golf swing tempo click tracks: export, live playback and inspection"
)]
struct Cli {
    /// Configuration file (defaults to assets/swing_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log filter, e.g. `info` or `swing_tempo=debug`
    #[arg(long, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a click track to a WAV file
    Export {
        /// Tempo in BPM (defaults to the club's default tempo)
        #[arg(long)]
        bpm: Option<u32>,
        /// Club preset: driver, long_iron, mid_iron, wedge
        #[arg(long)]
        club: Option<String>,
        /// Length in seconds (defaults to the configured duration)
        #[arg(long)]
        duration: Option<f64>,
        #[arg(long)]
        channels: Option<u16>,
        #[arg(long)]
        sample_rate: Option<u32>,
        /// Output path (defaults to golf_metronome_{club}_{bpm}bpm.wav)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Play the click track live and print telemetry as JSON lines
    Play {
        #[arg(long)]
        bpm: Option<u32>,
        #[arg(long)]
        club: Option<String>,
        /// How long to play before stopping
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        /// Schedule against a silent stub output instead of the sound card
        #[arg(long)]
        stub: bool,
    },
    /// List club tempo presets
    Presets,
    /// Print the header of a WAV file
    Inspect { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Export {
            bpm,
            club,
            duration,
            channels,
            sample_rate,
            output,
        } => run_export(config, bpm, club, duration, channels, sample_rate, output),
        Commands::Play {
            bpm,
            club,
            seconds,
            stub,
        } => run_play(config, bpm, club, seconds, stub),
        Commands::Presets => run_presets(),
        Commands::Inspect { path } => run_inspect(path),
    }
}

/// Resolve `--bpm`/`--club` into a tempo and a label for file names.
fn resolve_tempo(bpm: Option<u32>, club: Option<String>) -> Result<(u32, String)> {
    let preset: Option<&ClubPreset> = match club {
        Some(id) => match presets::find(&id) {
            Some(preset) => Some(preset),
            None => bail!("unknown club '{}'", id),
        },
        None => None,
    };

    match (bpm, preset) {
        (Some(bpm), Some(preset)) => {
            if !preset.range.contains(bpm) {
                tracing::warn!(
                    bpm,
                    club = preset.id,
                    "BPM outside the club range {}-{}",
                    preset.range.min,
                    preset.range.max
                );
            }
            Ok((bpm, preset.name.to_string()))
        }
        (Some(bpm), None) => Ok((bpm, "custom".to_string())),
        (None, Some(preset)) => Ok((preset.default_bpm, preset.name.to_string())),
        (None, None) => {
            let preset = presets::default_preset();
            Ok((preset.default_bpm, preset.name.to_string()))
        }
    }
}

fn run_export(
    config: AppConfig,
    bpm: Option<u32>,
    club: Option<String>,
    duration: Option<f64>,
    channels: Option<u16>,
    sample_rate: Option<u32>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let (bpm, label) = resolve_tempo(bpm, club)?;

    let mut export = config.export.clone();
    if let Some(channels) = channels {
        export.channels = channels;
    }
    if let Some(sample_rate) = sample_rate {
        export.sample_rate = sample_rate;
    }
    let duration = duration.unwrap_or(export.default_duration_secs);

    let engine = EngineHandle::with_backend(Arc::new(CpalBackend::new()), config);
    let artifact = engine
        .export_with(bpm, duration, &export)
        .with_context(|| format!("rendering {}s at {} BPM", duration, bpm))?;

    let path = output.unwrap_or_else(|| PathBuf::from(AudioArtifact::suggested_file_name(&label, bpm)));
    fs::write(&path, artifact.as_bytes()).with_context(|| format!("writing {}", path.display()))?;

    let report = ExportReport {
        path: path.display().to_string(),
        bpm,
        duration_secs: duration,
        clicks: click_offsets(bpm, duration, export.sample_rate)?.len(),
        bytes: artifact.len(),
        wav: artifact.summary()?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_play(
    config: AppConfig,
    bpm: Option<u32>,
    club: Option<String>,
    seconds: f64,
    stub: bool,
) -> Result<ExitCode> {
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("--seconds must be positive");
    }
    let (bpm, _) = resolve_tempo(bpm, club)?;

    let backend: Arc<dyn AudioBackend> = if stub {
        Arc::new(StubBackend::new())
    } else {
        Arc::new(CpalBackend::new())
    };
    let engine = EngineHandle::with_backend(backend, config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("creating runtime")?;

    runtime.block_on(async {
        let mut events = Box::pin(engine.telemetry_stream());
        engine.start_playback(bpm).context("starting playback")?;

        let deadline = tokio::time::sleep(Duration::from_secs_f64(seconds));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(event) = events.next() => println!("{}", serde_json::to_string(&event)?),
            }
        }

        let status = engine.status()?;
        engine.stop_playback().context("stopping playback")?;
        while let Some(event) = events.next().now_or_never().flatten() {
            println!("{}", serde_json::to_string(&event)?);
        }
        println!("{}", serde_json::to_string(&status)?);
        anyhow::Ok(())
    })?;

    Ok(ExitCode::from(0))
}

fn run_presets() -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&CLUB_PRESETS)?);
    Ok(ExitCode::from(0))
}

fn run_inspect(path: PathBuf) -> Result<ExitCode> {
    let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let summary = WavSummary::from_bytes(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;

    let report = InspectReport {
        path: path.display().to_string(),
        duration_secs: summary.duration_secs(),
        wav: summary,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct ExportReport {
    path: String,
    bpm: u32,
    duration_secs: f64,
    clicks: usize,
    bytes: usize,
    wav: WavSummary,
}

#[derive(Serialize)]
struct InspectReport {
    path: String,
    duration_secs: f64,
    wav: WavSummary,
}

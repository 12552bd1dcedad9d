// src/bin/sleep_analyze.rs

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use sleepscope::audio::{get_audio_info, Decoder, SymphoniaDecoder};
use sleepscope::{AnalysisConfig, AnalysisPipeline, RecordingSession};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Command-line tool for analyzing a sleep recording
#[derive(Parser, Debug)]
#[command(name = "sleep-analyze")]
#[command(about = "Extract a waveform and flag unusual sounds in a sleep recording", long_about = None)]
struct Args {
    /// Input audio file (M4A, MP3, FLAC, WAV, OGG, etc.)
    #[arg(short, long)]
    input: PathBuf,

    /// Number of waveform samples to produce
    #[arg(short, long)]
    samples: Option<usize>,

    /// Recording length in seconds, when the file's metadata is missing or wrong
    #[arg(short, long)]
    duration: Option<f64>,

    /// JSON file with analysis settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stream the byte fallback from disk for files larger than this many bytes
    #[arg(long)]
    large_file_threshold: Option<u64>,

    /// Print the session as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Show detailed information
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter support
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sleepscope=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(samples) = args.samples {
        config.waveform.sample_count = samples;
    }
    if let Some(threshold) = args.large_file_threshold {
        config.waveform.large_file_threshold = threshold;
    }
    config.validate()?;

    let total_duration = resolve_duration(&args.input, args.duration)?;

    let start = std::time::Instant::now();
    let pipeline = AnalysisPipeline::with_config(config);
    let analysis = pipeline.analyze(&args.input, total_duration);

    let mut session = RecordingSession::new(&args.input, recording_start(&args.input, total_duration), total_duration);
    session.apply(analysis);

    if args.json {
        println!("{}", session.to_json()?);
        return Ok(());
    }

    println!("🌙 Sleep Recording Analysis");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\n📊 Input File: {}", args.input.display());
    println!("   Duration: {:.2} seconds ({:.2} hours)",
        total_duration.as_secs_f64(), total_duration.as_secs_f64() / 3600.0);

    if args.verbose {
        let waveform = session.waveform.as_deref().unwrap_or(&[]);
        let mean = if waveform.is_empty() {
            0.0
        } else {
            waveform.iter().sum::<f64>() / waveform.len() as f64
        };
        let settings = pipeline.config();
        println!("   Waveform samples: {}", waveform.len());
        println!("   Threshold: {:.1} sigma, clamped to [{:.2}, {:.2}]",
            settings.detector.threshold_sigma, settings.detector.threshold_floor, settings.detector.threshold_ceiling);
        println!("   Mean level: {:.3}", mean);
        println!("   Analysis time: {:.2}s", start.elapsed().as_secs_f64());
    }

    if session.anomalies.is_empty() {
        println!("\n✅ No unusual sounds detected");
    } else {
        println!("\n🔔 {} unusual sound(s):", session.anomalies.len());
        for anomaly in &session.anomalies {
            println!(
                "   {} - {}  peak {:.2}  [{}]",
                format_clock(anomaly.start_time),
                format_clock(anomaly.end_time),
                anomaly.peak_amplitude,
                anomaly.category
            );
        }
    }

    Ok(())
}

/// Duration from the flag, else container metadata, else a full decode
fn resolve_duration(path: &Path, explicit: Option<f64>) -> anyhow::Result<Duration> {
    if let Some(secs) = explicit {
        return Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid --duration value: {}", secs));
    }

    match get_audio_info(path) {
        Ok(info) if !info.duration().is_zero() => return Ok(info.duration()),
        Ok(_) => warn!(path = %path.display(), "Container has no duration, decoding to measure it"),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not probe file"),
    }

    match SymphoniaDecoder.decode(path) {
        Ok(pcm) => Ok(pcm.duration()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unknown duration, anomalies will not be placed");
            Ok(Duration::ZERO)
        }
    }
}

/// Best guess at when recording began: the file was last written when capture stopped
fn recording_start(path: &Path, duration: Duration) -> DateTime<Utc> {
    let finished = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| finished.checked_sub_signed(d))
        .unwrap_or(finished)
}

fn format_clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

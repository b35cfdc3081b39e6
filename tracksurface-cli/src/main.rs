//! TrackSurface CLI - Command-line interface
//!
//! This binary drives the track-ingestion pipeline from the command line:
//! `process` runs a GPX file through the full job pipeline, `classify`
//! classifies an ad-hoc list of coordinates.

mod error;
mod lookup;

use clap::{Parser, Subcommand};
use error::CliError;
use lookup::OfflineLookup;
use std::sync::Arc;
use std::time::Duration;
use tracksurface::artifact::NoopArtifactStore;
use tracksurface::config::PipelineConfig;
use tracksurface::coord::TrackPoint;
use tracksurface::job::InMemoryJobStore;
use tracksurface::logging::{default_log_dir, default_log_file, init_logging};
use tracksurface::pipeline::IngestPipeline;
use tracksurface::progress::ProgressEvent;
use tracksurface::track::GpxTrackParser;

#[derive(Parser)]
#[command(name = "tracksurface")]
#[command(version = tracksurface::VERSION)]
#[command(about = "Classify road surfaces along GPS tracks", long_about = None)]
struct Cli {
    /// Write structured logs to the log directory (and stdout)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a GPX file through the ingestion pipeline and print the
    /// resulting route summary as JSON
    Process {
        /// Path to the GPX file
        file: String,
    },
    /// Classify a list of coordinates and print the unpaved sections
    /// as JSON
    Classify {
        /// Semicolon-separated lon,lat pairs, e.g. "147.32,-42.88;147.33,-42.89"
        #[arg(long)]
        points: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging is opt-in: the default output of both subcommands is JSON
    // on stdout and log lines would corrupt it.
    let _guard = if cli.verbose {
        match init_logging(default_log_dir(), default_log_file()) {
            Ok(guard) => Some(guard),
            Err(e) => CliError::LoggingInit(e.to_string()).exit(),
        }
    } else {
        None
    };

    let result = match cli.command {
        Command::Process { file } => process(&file).await,
        Command::Classify { points } => classify(&points).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}

fn build_pipeline() -> IngestPipeline {
    IngestPipeline::new(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(OfflineLookup::new()),
        Arc::new(GpxTrackParser::new()),
        Arc::new(NoopArtifactStore),
        // Snappy progress for an interactive run.
        PipelineConfig::new().with_progress_interval(Duration::from_millis(200)),
    )
}

async fn process(file: &str) -> Result<(), CliError> {
    let raw = std::fs::read(file).map_err(|error| CliError::FileRead {
        path: file.to_string(),
        error,
    })?;

    let pipeline = build_pipeline();
    let job = pipeline.ingest(raw);
    let mut events = pipeline.subscribe(&job);

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::Progress(value) => {
                eprintln!("processing... {}%", value);
            }
            ProgressEvent::Completed(summary) => {
                eprintln!(
                    "done: {} points, {} unpaved section(s)",
                    summary.point_count,
                    summary.unpaved_sections.len()
                );
                println!("{}", render_json(&summary));
                return Ok(());
            }
            ProgressEvent::Failed(message) => {
                return Err(CliError::Processing(message));
            }
            ProgressEvent::InvalidJob => {
                return Err(CliError::Processing("job disappeared".to_string()));
            }
        }
    }

    Err(CliError::Processing(
        "progress stream closed before the job finished".to_string(),
    ))
}

async fn classify(points: &str) -> Result<(), CliError> {
    let points = parse_points(points)?;
    let pipeline = build_pipeline();

    let sections = pipeline
        .classify_batch(&points)
        .await
        .map_err(|e| CliError::Lookup(e.to_string()))?;

    eprintln!(
        "{} point(s), {} unpaved section(s)",
        points.len(),
        sections.len()
    );
    println!("{}", render_json(&sections));
    Ok(())
}

/// Parses semicolon-separated `lon,lat` pairs.
fn parse_points(input: &str) -> Result<Vec<TrackPoint>, CliError> {
    let mut points = Vec::new();
    for pair in input.split(';').filter(|p| !p.trim().is_empty()) {
        let mut parts = pair.splitn(2, ',');
        let (lon, lat) = match (parts.next(), parts.next()) {
            (Some(lon), Some(lat)) => (lon.trim(), lat.trim()),
            _ => return Err(CliError::InvalidPoints(format!("'{}' is not a pair", pair))),
        };
        let lon: f64 = lon
            .parse()
            .map_err(|_| CliError::InvalidPoints(format!("'{}' is not a number", lon)))?;
        let lat: f64 = lat
            .parse()
            .map_err(|_| CliError::InvalidPoints(format!("'{}' is not a number", lat)))?;
        let point =
            TrackPoint::new(lon, lat).map_err(|e| CliError::InvalidPoints(e.to_string()))?;
        points.push(point);
    }
    if points.is_empty() {
        return Err(CliError::InvalidPoints("no points given".to_string()));
    }
    Ok(points)
}

fn render_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

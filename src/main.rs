//! # Sonde Ingest
//!
//! Decode one ocean sensor telemetry frame and publish it to the time-series store.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (`SONDE_INGEST_CONFIG`, else `config/default.toml`, else defaults)
//!    - Set up logging with tracing subscriber
//!
//! 2. **Ingest**
//!    - Read and decode the frame file given as the only argument
//!    - Expand it into time-series points
//!    - Write them through the batch writer, retrying transient failures
//!
//! 3. **Shutdown**
//!    - Drain and close the writer, releasing the store connection
//!    - Save points of failed batches next to the frame for resubmission
//!
//! # Examples
//!
//! ```bash
//! SONDE_INGEST_TOKEN=... cargo run --release -- frames/0001.bin
//! ```
//!
//! Expected output:
//! ```text
//! INFO sonde_ingest: Sonde Ingest v0.1.0 starting...
//! INFO sonde_ingest: Decoded frame 12 from sensor 7 captured at 2023-11-14T22:13:20+00:00
//! INFO sonde_ingest::writer::observer: Successfully wrote batch 1 (361 points, 1 attempt(s))
//! INFO sonde_ingest: Wrote 361 points in 1 batch(es), 0 retries
//! ```

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use sonde_ingest::config::{Config, LoggingConfig, TOKEN_ENV_VAR};
use sonde_ingest::frame::decoder::decode_frame;
use sonde_ingest::frame::reader::read_frame;
use sonde_ingest::points::mapper::map_to_points;
use sonde_ingest::store::InfluxStore;
use sonde_ingest::writer::observer::LoggingObserver;
use sonde_ingest::writer::{BatchWriter, FailedBatch, Shutdown, WriteError};

/// Environment variable naming the configuration file
const CONFIG_ENV_VAR: &str = "SONDE_INGEST_CONFIG";

/// Configuration file used when present and no override is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "sonde-ingest.log";

/// Suffix appended to the frame path for points that could not be written
const DEAD_LETTER_SUFFIX: &str = "failed.jsonl";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let frame_path = frame_path_from_args(&args)?;

    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("Sonde Ingest v{} starting...", env!("CARGO_PKG_VERSION"));

    ingest(&frame_path, &config).await
}

/// The single frame file argument
fn frame_path_from_args(args: &[String]) -> Result<PathBuf> {
    match args {
        [path] => Ok(PathBuf::from(path)),
        _ => bail!(
            "Expected exactly one frame file argument, got {}\nUsage: sonde-ingest <frame-file>",
            args.len()
        ),
    }
}

fn load_config() -> Result<Config> {
    let config = match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            Config::load(&path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration {}", DEFAULT_CONFIG_PATH))?,
        None => Config::default(),
    };

    Ok(config.with_token_override(std::env::var(TOKEN_ENV_VAR).ok()))
}

/// Install the tracing subscriber
///
/// The returned guard flushes the file writer when dropped and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = if config.dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

async fn ingest(frame_path: &Path, config: &Config) -> Result<()> {
    let data = read_frame(frame_path)
        .with_context(|| format!("Failed to read frame file {}", frame_path.display()))?;
    let record = decode_frame(&data)
        .with_context(|| format!("Failed to decode frame file {}", frame_path.display()))?;

    let captured_at = record
        .captured_at()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| record.timestamp.to_string());
    info!(
        "Decoded frame {} from sensor {} captured at {}",
        record.sequence_id, record.sensor_id, captured_at
    );

    let points = map_to_points(&record);

    let store = InfluxStore::new(&config.store).context("Failed to create store client")?;
    info!("Writing {} points to {}", points.len(), store.write_url());

    let writer = BatchWriter::new(store, config.writer.clone(), Arc::new(LoggingObserver));
    let result = writer.write(points).await;
    if let Err(e) = writer.close(Shutdown::Drain).await {
        warn!("Batch writer did not close cleanly: {}", e);
    }
    drop(writer);

    match result {
        Ok(summary) => {
            info!(
                "Wrote {} points in {} batch(es), {} retries",
                summary.points, summary.batches, summary.retries
            );
            Ok(())
        }
        Err(WriteError::Exhausted { failed, summary }) => {
            let path = dead_letter_path(frame_path);
            write_dead_letters(&path, &failed)
                .with_context(|| format!("Failed to save unwritten points to {}", path.display()))?;

            bail!(
                "Failed to write frame {}: {} batch(es) exhausted retries ({} written); \
                 unwritten points saved to {}",
                frame_path.display(),
                failed.len(),
                summary.batches,
                path.display()
            )
        }
        Err(e) => Err(e).with_context(|| format!("Failed to write frame {}", frame_path.display())),
    }
}

/// Path of the dead-letter file for a frame
fn dead_letter_path(frame_path: &Path) -> PathBuf {
    let mut name = frame_path.as_os_str().to_owned();
    name.push(".");
    name.push(DEAD_LETTER_SUFFIX);
    PathBuf::from(name)
}

/// Write the points of failed batches as JSON lines
fn write_dead_letters(path: &Path, failed: &[FailedBatch]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    for point in failed.iter().flat_map(|batch| batch.points.iter()) {
        serde_json::to_writer(&mut out, point)?;
        out.write_all(b"\n")?;
    }

    out.flush()?;
    Ok(())
}

//! Stream Sync Simulator
//!
//! Runs the sync controller against simulated live streams described by a
//! scenario file. Sync events are written to stdout as JSON lines; logs go to
//! stderr.
//!
//! # Usage
//!
//! ```bash
//! sync-sim --scenario tools/sync-sim/scenarios/two-cameras.toml --duration-ms 8000
//!
//! # Tighter drift tolerance
//! sync-sim --scenario two-cameras.toml --config sync.toml
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (default: `info`)

mod scenario;
mod simulated;

use anyhow::{Context, Result};
use clap::Parser;
use remotemedia_stream_sync::{
    Clock, PlaybackIntent, StreamSet, SyncConfig, SyncController, SystemClock, TerminalSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::info;

use scenario::Scenario;
use simulated::SimulatedStream;

/// Drive the stream sync controller against simulated live streams
#[derive(Parser)]
#[command(name = "sync-sim")]
#[command(author, version)]
#[command(about = "Simulate multi-stream wall-clock sync")]
struct Args {
    /// Scenario file (TOML)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Sync controller configuration (TOML, optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to run before shutting down
    #[arg(short, long, default_value_t = 5_000)]
    duration_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let scenario = Scenario::from_file(&args.scenario)?;
    let config = match &args.config {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("Failed to load sync config {}", path.display()))?,
        None => SyncConfig::default(),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        streams = scenario.streams.len(),
        duration_ms = args.duration_ms,
        "Stream sync simulator starting"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let set = Arc::new(StreamSet::new());
    let mut simulated = Vec::with_capacity(scenario.streams.len());
    for spec in &scenario.streams {
        let stream = Arc::new(SimulatedStream::new(spec, clock.clone()));
        set.insert(spec.id.as_str(), stream.clone());
        simulated.push(stream);
    }

    let requested_start = scenario
        .requested_start_offset_ms
        .map(|offset| clock.now_ms() + offset);
    let intent = PlaybackIntent {
        requested_start,
        playing: scenario.playing,
        muted: scenario.muted,
    };
    let (_intent_tx, intent_rx) = watch::channel(intent);

    let controller = SyncController::new(config, set, intent_rx)
        .with_clock(clock.clone())
        .with_sink(Arc::new(TerminalSink::stdout()));
    let snapshots = controller.subscribe();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = controller.spawn(shutdown_rx);

    let mut failure_shutdown = shutdown_tx.subscribe();
    let failures = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(50));
        loop {
            tokio::select! {
                _ = failure_shutdown.recv() => break,
                _ = ticker.tick() => {
                    for stream in &simulated {
                        stream.poll_failure();
                    }
                }
            }
        }
        simulated
    });

    tokio::time::sleep(Duration::from_millis(args.duration_ms)).await;
    let _ = shutdown_tx.send(());

    let controller = handle.await.context("Sync loop panicked")?;
    let simulated = failures.await.context("Failure injector panicked")?;

    let state = snapshots.borrow().clone();
    info!(
        ticks = controller.ticks(),
        reference = ?state.reference,
        last_known_timestamp = ?state.last_known_timestamp,
        is_live = state.is_live,
        is_playing = state.is_playing,
        "Simulation finished"
    );
    for stream in &simulated {
        info!(stream_id = stream.id(), muted = stream.is_muted(), "Final stream state");
    }

    Ok(())
}

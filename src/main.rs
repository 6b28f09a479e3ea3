//! Endpoint failover monitor.
//!
//! Tracks every configured RPC node pool and oracle keeper mirror group,
//! logging ban and selection events as they happen.
//!
//! # Architecture Overview
//!
//! ```text
//!   failover.toml
//!        │
//!        ▼
//!   ┌─────────┐     ┌──────────────┐     ┌──────────────────┐
//!   │ config  │────▶│   adapters   │────▶│ FallbackTracker  │  one per chain
//!   │ loader  │     │ rpc / oracle │     │  sweep loop      │
//!   └─────────┘     └──────┬───────┘     └────────┬─────────┘
//!                          │                      │ probes (concurrent)
//!          current_urls    │                      ▼
//!          mark_failed ◀───┘             ┌──────────────────┐
//!                                        │ RPC nodes /      │
//!                                        │ keeper mirrors   │
//!                                        └──────────────────┘
//!
//!   tracker ──publish──▶ EventBus ──▶ listeners (logging here, call sites elsewhere)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use endpoint_failover::adapters::ServiceTrackers;
use endpoint_failover::config::load_config;
use endpoint_failover::events::{EventBus, EventKind};
use endpoint_failover::lifecycle::shutdown::ShutdownSignal;
use endpoint_failover::lifecycle::{signals, Shutdown};
use endpoint_failover::observability::{logging, metrics};
use endpoint_failover::{FallbackTracker, OracleKeepers, RpcProviders, TrackOptions};

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "failover-monitor")]
#[command(about = "Track redundant RPC and oracle keeper endpoints", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "failover.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Track all services until SIGINT/SIGTERM (default)
    Run,
    /// Run one sweep per service and print the results as JSON
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        config = %cli.config.display(),
        rpc_services = config.rpc.len(),
        oracle_services = config.oracle.len(),
        check_interval_ms = config.tracker.check_interval_ms,
        "Configuration loaded"
    );

    let bus = EventBus::new();
    let rpc = RpcProviders::new(&config.rpc, config.tracker, bus.clone());
    let oracle = OracleKeepers::new(&config.oracle, config.tracker, config.switcher.into(), bus.clone());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => {
            let mut report = Map::new();
            for trackers in [rpc.trackers(), oracle.trackers()] {
                check_services(trackers, &mut report).await?;
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);
        }
        Commands::Run => {
            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            for trackers in [rpc.trackers(), oracle.trackers()] {
                log_events(trackers, &bus);
                trackers.track_all(TrackOptions::warm_up())?;
            }

            let shutdown = Shutdown::new();
            let reporter = tokio::spawn(report_status(
                [rpc.trackers(), oracle.trackers()]
                    .iter()
                    .flat_map(|t| t.services().into_iter().filter_map(|id| t.tracker(id).ok()))
                    .collect(),
                shutdown.subscribe(),
            ));

            signals::wait_for_shutdown_signal().await;
            shutdown.trigger();
            rpc.trackers().stop_all();
            oracle.trackers().stop_all();
            let _ = reporter.await;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn check_services(
    trackers: &ServiceTrackers,
    report: &mut Map<String, Value>,
) -> Result<(), Box<dyn std::error::Error>> {
    for id in trackers.services() {
        let tracker = trackers.tracker(id)?;
        tracker.sweep_once().await;
        report.insert(
            tracker.key().to_string(),
            json!({
                "selection": tracker.selection(),
                "endpoints": tracker.endpoint_stats(),
            }),
        );
    }
    Ok(())
}

fn log_events(trackers: &ServiceTrackers, bus: &EventBus) {
    for id in trackers.services() {
        let key = trackers.tracker_key(id);
        for kind in [EventKind::EndpointBanned, EventKind::EndpointsUpdated] {
            let tracker = key.clone();
            bus.subscribe(&key, kind, move |event| match serde_json::to_string(event) {
                Ok(payload) => tracing::info!(tracker = %tracker, event = %payload, "Tracker event"),
                Err(e) => tracing::warn!(tracker = %tracker, error = %e, "Failed to encode event"),
            });
        }
    }
}

async fn report_status(
    trackers: Vec<Arc<FallbackTracker>>,
    mut shutdown: ShutdownSignal,
) {
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + STATUS_INTERVAL,
        STATUS_INTERVAL,
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for tracker in &trackers {
                    let stats = tracker.endpoint_stats();
                    tracing::info!(
                        tracker = %tracker.key(),
                        primary = %tracker.pick_primary_endpoint(),
                        secondary = %tracker.pick_secondary_endpoint(),
                        banned = stats.iter().filter(|s| s.banned).count(),
                        healthy = stats.iter().filter(|s| s.healthy_latency().is_some()).count(),
                        "Status"
                    );
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

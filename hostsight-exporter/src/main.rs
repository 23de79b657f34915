//! Prometheus exporter for host metrics.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hostsight_collector::SystemSource;
use hostsight_common::init_tracing;
use tokio::sync::watch;
use tracing::{error, info};

use hostsight_exporter::{ExporterConfig, HttpServer, MetricRegistry, Scheduler};

/// Prometheus exporter for host metrics.
#[derive(Parser, Debug)]
#[command(name = "hostsight-exporter")]
#[command(about = "Export host metrics (procfs, df, netstat) as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error; overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting HostSight exporter"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let registry = Arc::new(MetricRegistry::with_catalog(
        &config.prometheus.prefix,
        &config.prometheus.default_labels,
    ));

    let scheduler = Scheduler::new(
        SystemSource::new(),
        config.collection.clone(),
        &config.prometheus.prefix,
        registry.clone(),
    );

    let http_server = HttpServer::new(
        registry.clone(),
        scheduler.subscribe(),
        config.prometheus.listen_addr()?,
        config.prometheus.path.clone(),
    );

    // A port already in use ends the process here
    let bound = http_server.bind().await?;

    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = bound.serve(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for tasks to complete
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = scheduler_task.await;
        let _ = http_task.await;
    })
    .await;

    // Print final stats
    let stats = registry.stats();
    info!(
        cycles = stats.cycles_applied,
        families_replaced = stats.families_replaced,
        updates_rejected = stats.updates_rejected,
        points_dropped = stats.points_dropped,
        series_count = registry.series_count(),
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

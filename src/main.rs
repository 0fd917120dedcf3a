use anyhow::Context;
use clap::Parser;
use portwatch::cli::Cli;
use portwatch::metrics::OpenPortGauge;
use portwatch::scanner::{ScanScheduler, TcpProber};
use portwatch::server::{self, SHUTDOWN_GRACE};
use portwatch::storage::DiskStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "failed to run command");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings().context("invalid configuration")?;

    info!(address = %cli.listen_address, "listening");
    info!(count = settings.targets.host_count(), "number of hosts");
    info!(count = settings.targets.port_count(), "number of ports");
    info!(count = settings.max_connections, "max connections");
    info!(timeout = ?settings.conn_timeout, "timeout");

    let cache_dir = cli.cache_dir();
    let store = Arc::new(
        DiskStore::open(&cache_dir)
            .with_context(|| format!("failed to open cache at {}", cache_dir.display()))?,
    );
    let entries = store.len().context("failed to read cache")?;
    info!(path = %store.path().display(), entries, "cache opened");

    let listener = TcpListener::bind(server::bind_address(&cli.listen_address))
        .await
        .with_context(|| format!("failed to listen on {}", cli.listen_address))?;

    let gauge = Arc::new(OpenPortGauge::new());
    let prober = Arc::new(TcpProber::new(settings.conn_timeout));
    let scheduler = ScanScheduler::from_settings(&settings, store, prober, Arc::clone(&gauge));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received");
                    shutdown.cancel();
                }
                Err(e) => error!(error = %e, "failed to listen for interrupt"),
            }
        }
    });

    let scanner = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { scheduler.run(shutdown).await }
    });

    let served = server::serve(listener, gauge, shutdown.clone(), SHUTDOWN_GRACE).await;
    // Stop scanning if the server exits on its own, then let running probes finish.
    shutdown.cancel();
    scanner.await.context("scanner task failed")?;

    served.context("metrics server failed")
}

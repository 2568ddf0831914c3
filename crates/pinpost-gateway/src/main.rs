use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pinpost_core::PinpostConfig;
use pinpost_publisher::PinterestPublisher;
use pinpost_scheduler::{sweep_worker, DueItemScheduler};
use pinpost_store::{PinStore, SqlitePinStore};
use tracing::info;

mod app;
mod http;

#[derive(Parser)]
#[command(name = "pinpost-gateway", version, about = "Schedule pins and publish them when due")]
struct Cli {
    /// Path to pinpost.toml (defaults to ~/.pinpost/pinpost.toml).
    #[arg(long, env = "PINPOST_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Run the HTTP server and the background sweep worker (default).
    #[default]
    Serve,
    /// Run one sweep in the foreground, print its report as JSON, and exit.
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pinpost_gateway=info,pinpost_scheduler=info,pinpost_publisher=info,pinpost_store=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    let config = PinpostConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        PinpostConfig::default()
    });

    // open SQLite database and bootstrap the schema (idempotent)
    let db_path = &config.database.path;
    ensure_parent_dir(db_path)?;
    info!(path = %db_path, "opening SQLite database");
    let store: Arc<dyn PinStore> = Arc::new(SqlitePinStore::open(db_path)?);

    let publisher = Arc::new(PinterestPublisher::from_config(&config.pinterest)?);
    info!(base_url = %config.pinterest.base_url, "publisher: Pinterest");

    let scheduler = DueItemScheduler::new(Arc::clone(&store), publisher);

    match cli.command.unwrap_or_default() {
        Command::Sweep => {
            let report = scheduler.run_sweep().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Serve => serve(config, store, scheduler).await,
    }
}

async fn serve(
    config: PinpostConfig,
    store: Arc<dyn PinStore>,
    scheduler: DueItemScheduler,
) -> anyhow::Result<()> {
    let poll_interval = config.scheduler.poll_interval_secs.map(Duration::from_secs);
    let (worker, trigger) = sweep_worker(scheduler, config.scheduler.queue_depth, poll_interval);

    // spawn the sweep worker in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let addr: SocketAddr = config.listen_addr().parse()?;
    let state = Arc::new(app::AppState::new(config, store, trigger));
    let router = app::build_router(state);

    info!("Pinpost gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // let the sweep in progress finish before exiting
    let _ = shutdown_tx.send(true);
    worker_exited_cleanly(worker_handle.await);
    info!("Pinpost gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Log a worker that panicked or was cancelled instead of dropping the error.
fn worker_exited_cleanly(joined: Result<(), tokio::task::JoinError>) -> bool {
    match joined {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, panicked = e.is_panic(), "sweep worker task failed");
            false
        }
    }
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) -> pinpost_core::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

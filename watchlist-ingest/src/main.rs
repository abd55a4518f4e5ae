//! watchlist-ingest - Watchlist ingestion and deduplication service
//!
//! Pulls raw records from every enabled source on a fixed interval,
//! normalizes and deduplicates them into the canonical store, resolves
//! family relationships, and records per-source analytics for each cycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchlist_common::config::{default_config_path, resolve_root_folder, TomlConfig};
use watchlist_common::db::init_database;
use watchlist_ingest::config::{CliOverrides, IngestConfig};
use watchlist_ingest::db::max_lock_wait_ms;
use watchlist_ingest::sources::SourceRegistry;
use watchlist_ingest::{CycleController, Pipeline};

/// Command-line arguments for watchlist-ingest
#[derive(Parser, Debug)]
#[command(name = "watchlist-ingest")]
#[command(about = "Watchlist ingestion and deduplication service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WATCHLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database and relative source paths
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Records per chunk
    #[arg(long, env = "WATCHLIST_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Seconds to sleep between cycles
    #[arg(long, env = "WATCHLIST_INTERVAL_SECS")]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml = if config_path.exists() {
        TomlConfig::load(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        TomlConfig::default()
    };

    // Initialize tracing; RUST_LOG wins over the TOML level
    let default_filter = format!(
        "watchlist_ingest={level},watchlist_common={level}",
        level = toml.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting watchlist-ingest v{}",
        env!("CARGO_PKG_VERSION")
    );
    if config_path.exists() {
        info!("Configuration: {}", config_path.display());
    } else {
        warn!(
            "Config file {} not found, using compiled defaults",
            config_path.display()
        );
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let overrides = CliOverrides {
        batch_size: args.batch_size,
        interval_secs: args.interval_secs,
    };
    let config = IngestConfig::resolve(&toml, root_folder.clone(), &overrides);
    info!(
        batch_size = config.batch.batch_size,
        max_workers = config.batch.max_workers,
        interval_secs = config.cycle_interval.as_secs(),
        staging_scope = ?config.staging_scope,
        "Ingest configuration resolved"
    );

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database: {}", config.database_path.display());

    let lock_wait = max_lock_wait_ms(&pool).await;
    let registry = SourceRegistry::from_declarations(&config.sources, &root_folder);
    info!(
        "Registered {} source(s): {}",
        registry.len(),
        registry.keys().join(", ")
    );

    let pipeline = Pipeline::sqlite(&pool, lock_wait);
    let mut controller = CycleController::new(pipeline, config, toml, pool.clone(), registry);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    let result = controller.run(cancel, args.once).await;
    pool.close().await;

    match result {
        Ok(()) => {
            info!("watchlist-ingest stopped");
            Ok(())
        }
        Err(e) => {
            error!("watchlist-ingest stopped on error: {:#}", e);
            Err(e)
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing current cycle before shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, finishing current cycle before shutdown");
        },
    }
}

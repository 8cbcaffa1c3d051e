//! Log Sync Daemon - keeps pipeline execution logs in step with the build engine
//!
//! The daemon periodically:
//! - Selects execution log records still marked in progress
//! - Pulls the current step log from the build engine
//! - Marks records finished once their step has ended

use clap::Parser;
use logsync_daemon::config::{EngineConfig, StorageConfig};
use logsync_daemon::{
    DaemonConfig, DaemonError, DaemonResult, HttpEngine, InMemoryEngine, InMemoryStorage,
    LogSyncerBuilder, PipelineEngine, Seed,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log Sync Daemon CLI
#[derive(Parser)]
#[command(name = "logsyncd")]
#[command(about = "Pipeline execution log syncer", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LOGSYNC_CONFIG")]
    config: Option<String>,

    /// Cluster to sync
    #[arg(long, env = "LOGSYNC_CLUSTER")]
    cluster: Option<String>,

    /// Restrict to one namespace
    #[arg(long, env = "LOGSYNC_NAMESPACE")]
    namespace: Option<String>,

    /// Seconds between sync cycles
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Log level
    #[arg(long, env = "LOGSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "LOGSYNC_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(cluster) = cli.cluster {
        config.scope.cluster = cluster;
    }
    if let Some(namespace) = cli.namespace {
        config.scope.namespace = Some(namespace);
    }
    if let Some(secs) = cli.interval_secs {
        config.syncer.sync_interval_secs = secs;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let storage = match &config.storage {
        StorageConfig::Memory { seed_path: Some(path) } => {
            tracing::info!(path = %path, "Loading seed data");
            InMemoryStorage::from_seed(Seed::from_file(path)?).await?
        }
        StorageConfig::Memory { seed_path: None } => InMemoryStorage::new(),
    };

    let engine: Arc<dyn PipelineEngine> = match &config.engine {
        EngineConfig::Memory => Arc::new(InMemoryEngine::new()),
        EngineConfig::Http {
            base_url,
            request_timeout_secs,
        } => Arc::new(HttpEngine::new(
            base_url.clone(),
            Duration::from_secs(*request_timeout_secs),
        )?),
    };

    let syncer = LogSyncerBuilder::new(config.scope.to_scope())
        .with_config(config.syncer.clone())
        .with_storage(Arc::new(storage))
        .with_engine(engine)
        .build()?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    syncer.run(cancel).await;
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, stopping after the current cycle");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, stopping after the current cycle");
        },
    }
}

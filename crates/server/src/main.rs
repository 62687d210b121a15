//! OptiPredict gateway binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use optipredict_core::config::AppConfig;
use optipredict_metadata::MetadataStore;
use optipredict_server::{AppState, ScratchStore, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// OptiPredict upload gateway
#[derive(Parser, Debug)]
#[command(name = "optipredictd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "OPTIPREDICT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("OptiPredict gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    config.validate().context("invalid configuration")?;

    optipredict_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let metadata = optipredict_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata health check failed")?;
    tracing::info!("Metadata store initialized");

    let scratch = ScratchStore::open(&config.scratch.path)
        .await
        .with_context(|| {
            format!(
                "failed to open scratch directory {}",
                config.scratch.path.display()
            )
        })?;
    tracing::info!(path = %config.scratch.path.display(), "Scratch directory ready");

    tracing::info!(
        ml_service = %config.ml_service.base_url,
        max_upload_mb = config.server.max_upload_bytes / optipredict_core::BYTES_PER_MB,
        "Upstream configured"
    );

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let state = AppState::new(config, metadata, scratch).context("failed to build ML client")?;
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Load configuration from the optional file plus `OPTIPREDICT_` env vars.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    // OPTIPREDICT_CONFIG only names the file
    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with("OPTIPREDICT_") && key != "OPTIPREDICT_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: optipredictd --config /path/to/config.toml\n  \
             2. Environment variables: OPTIPREDICT_AUTH__JWT_SECRET=... \
             OPTIPREDICT_ML_SERVICE__BASE_URL=http://localhost:5001 optipredictd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set OPTIPREDICT_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    figment
        .merge(Env::prefixed("OPTIPREDICT_").split("__"))
        .extract()
        .context("failed to load configuration")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

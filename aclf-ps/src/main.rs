//! Prediction Service (aclf-ps) - Main entry point
//!
//! Loads the classifier artifact once at startup and serves `POST /predict`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use aclf_common::config::{self, TomlConfig, DEFAULT_BIND_ADDRESS, DEFAULT_PORT};
use aclf_common::model::DEFAULT_MODEL_PATH;
use aclf_common::ModelArtifact;
use aclf_ps::api::health::BuildInfo;
use aclf_ps::{build_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for aclf-ps
#[derive(Parser, Debug)]
#[command(name = "aclf-ps")]
#[command(about = "Audio clip classification service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "ACLF_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "ACLF_BIND")]
    bind: Option<String>,

    /// Model artifact written by aclf-mt
    #[arg(short, long, env = "ACLF_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Directory for temporary upload files
    #[arg(long, env = "ACLF_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "ACLF_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let level = toml_config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("aclf_ps={level},aclf_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = config::resolve(args.port, toml_config.port, DEFAULT_PORT);
    let bind = config::resolve(
        args.bind,
        toml_config.bind_address,
        DEFAULT_BIND_ADDRESS.to_string(),
    );
    let model_path = config::resolve(
        args.model,
        toml_config.model_path,
        PathBuf::from(DEFAULT_MODEL_PATH),
    );
    let upload_dir = config::resolve(args.upload_dir, toml_config.upload_dir, std::env::temp_dir());

    info!(
        "Starting aclf-ps v{} ({})",
        env!("CARGO_PKG_VERSION"),
        BuildInfo::current()
    );
    info!("Model: {}", model_path.display());
    info!("Upload directory: {}", upload_dir.display());

    let artifact = ModelArtifact::load(&model_path)
        .with_context(|| format!("Failed to load model artifact {}", model_path.display()))?;
    info!("Serving labels: {:?}", artifact.classes());

    std::fs::create_dir_all(&upload_dir)
        .with_context(|| format!("Failed to create upload directory {}", upload_dir.display()))?;

    let state = AppState::from_artifact(artifact, upload_dir)
        .context("Failed to initialize feature pipeline")?
        .with_max_upload_bytes(toml_config.max_upload_bytes);

    let app = build_router(state);

    let ip: IpAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address {bind}"))?;
    let addr = SocketAddr::new(ip, port);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

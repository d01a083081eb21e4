//! nat-web - News annotation service
//!
//! Loads the article dataset once, then serves the annotation form and the
//! session API until interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nat_common::articles::ArticleCatalog;
use nat_common::config::TomlConfig;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nat_web::sessions::spawn_session_reaper;
use nat_web::{build_router, AppState};

/// Command-line arguments for nat-web
#[derive(Parser, Debug)]
#[command(name = "nat-web")]
#[command(about = "Crowdsourced news annotation service")]
#[command(version)]
struct Args {
    /// Config file (overrides NAT_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "NAT_PORT")]
    port: Option<u16>,

    /// Article dataset CSV
    #[arg(short, long, env = "NAT_DATASET")]
    dataset: Option<PathBuf>,

    /// Production mode (disables the diagnostic export)
    #[arg(long, env = "NAT_PRODUCTION")]
    production: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dataset) = args.dataset {
        config.dataset.path = dataset;
    }
    config.production |= args.production;

    // Initialize tracing; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting nat-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    source.report();

    // The dataset must load before anything is served
    let catalog = match ArticleCatalog::load(&config.dataset.path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load article dataset: {}", e);
            return Err(e).context("Article dataset is required");
        }
    };

    let sink = config.sink.build().context("Failed to configure submission sink")?;
    let state = AppState::from_config(catalog, &config, sink)
        .context("Invalid annotation settings")?;
    if state.production {
        info!("Production mode: diagnostic export disabled");
    }

    let sweep_interval = config
        .sessions
        .sweep_interval()
        .context("Invalid session retention settings")?;
    spawn_session_reaper(state.sessions.clone(), state.retention, sweep_interval);
    info!(
        "Session retention: idle {}s, finished {}s, sweep every {}s",
        state.retention.idle_timeout.as_secs(),
        state.retention.finished_ttl.as_secs(),
        sweep_interval.as_secs()
    );

    let app = build_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("nat-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

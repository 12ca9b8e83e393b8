// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the Chirpy server.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backend_lib::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    router::create_router,
    storage::FlatFileStorage,
    AppState,
};

#[derive(Debug, Parser)]
#[command(name = "chirpy", about = "Chirpy API server")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Delete the database file before starting
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    if args.debug {
        settings.reset_db = true;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_ascii_lowercase())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!(?settings, "settings loaded");

    let storage = FlatFileStorage::open(&settings.db_path, settings.reset_db)
        .await
        .with_context(|| format!("opening database {}", settings.db_path.display()))?;
    if settings.reset_db {
        tracing::warn!(path = %settings.db_path.display(), "database reset");
    }

    let addr = settings.bind_addr;
    let state = Arc::new(AppState::new(storage, settings));
    let app = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

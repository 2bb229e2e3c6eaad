//! hostlink-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, brings stored relationship tiers in line with the configured
//! thresholds, and serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use hostlink_core::Engine;
use hostlink_server::{app, expand_tilde, load_settings};
use hostlink_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Hostlink identification and relationship server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let (server_cfg, engine_cfg) =
    load_settings(&cli.config).context("failed to load configuration")?;
  tracing::info!(
    verification_vote_threshold = engine_cfg.verification_vote_threshold,
    thresholds = ?engine_cfg.thresholds(),
    "engine configured"
  );

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = Arc::new(Engine::new(store, engine_cfg));
  let changed = engine
    .reclassify_all()
    .await
    .context("failed to reclassify stored relationships")?;
  tracing::info!(changed, "relationship tiers checked against thresholds");

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(engine)).await.context("server error")?;

  Ok(())
}

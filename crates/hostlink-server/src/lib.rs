//! Hosting glue for Hostlink: configuration, the top-level router, and the
//! pieces of startup that are worth testing without a socket.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use hostlink_core::{Engine, config::EngineConfig, store::EngineStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `HOSTLINK_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("hostlink.db"),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Load both halves of the configuration from `path` (optional) and the
/// environment.
///
/// Server keys take the `HOSTLINK_` prefix; engine keys are read unprefixed
/// (`VERIFICATION_VOTE_THRESHOLD`, `RELATIONSHIP_PREFERRED_THRESHOLD`, ...).
pub fn load_settings(path: &Path) -> Result<(ServerConfig, EngineConfig), config::ConfigError> {
  let server = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("HOSTLINK"))
    .build()?
    .try_deserialize::<ServerConfig>()?;

  let engine = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::default())
    .build()?
    .try_deserialize::<EngineConfig>()?;

  Ok((server, engine))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API under `/api`, a liveness probe at `/health`, and request tracing
/// around both.
pub fn app<S>(engine: Arc<Engine<S>>) -> Router
where
  S: EngineStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", hostlink_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

//! footfall server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! JSON file store, spawns the periodic reconciliation task, and serves the
//! analytics API over HTTP.

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::http::{HeaderValue, Method, header};
use clap::Parser;
use footfall_api::AppState;
use footfall_reconcile::{HttpRemote, Reconciler, spawn_periodic};
use footfall_store_json::JsonStore;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Footfall analytics collector")]
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FOOTFALL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in the data directory.
  let data_dir = expand_tilde(&server_cfg.data_dir);

  // Open the store; this creates the data directory on first run.
  let store = Arc::new(
    JsonStore::open(&data_dir)
      .await
      .with_context(|| format!("failed to open store at {data_dir:?}"))?,
  );

  // Reconciler + recurring pass.
  let remote = HttpRemote::new(&server_cfg.remote_url)
    .context("failed to build remote client")?;
  let reconciler = Arc::new(Reconciler::new(store.clone(), remote));
  spawn_periodic(
    reconciler.clone(),
    Duration::from_secs(server_cfg.reconcile_interval_secs),
  );

  let state = AppState::new(store, reconciler);

  let app = footfall_api::api_router(state)
    .layer(cors_layer(&server_cfg))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Allow-list CORS for the storefront and dashboard origins.
fn cors_layer(cfg: &ServerConfig) -> CorsLayer {
  let origins: Vec<HeaderValue> = cfg
    .allowed_origins
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

  CorsLayer::new()
    .allow_origin(origins)
    .allow_methods([Method::GET, Method::POST])
    .allow_headers([header::CONTENT_TYPE])
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

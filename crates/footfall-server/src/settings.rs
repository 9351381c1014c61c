//! Runtime server configuration, deserialised from `config.toml` layered
//! under `FOOTFALL_*` environment variables.

use std::path::PathBuf;

use serde::Deserialize;

fn default_host() -> String {
  "0.0.0.0".to_string()
}

fn default_port() -> u16 {
  10000
}

fn default_data_dir() -> PathBuf {
  PathBuf::from("data")
}

fn default_reconcile_interval() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,

  #[serde(default = "default_port")]
  pub port: u16,

  /// Directory holding the record set and comparison snapshot files.
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,

  /// URL of the published reference copy of the record set.
  pub remote_url: String,

  #[serde(default = "default_reconcile_interval")]
  pub reconcile_interval_secs: u64,

  /// CORS allow-list. Empty means no cross-origin callers.
  #[serde(default)]
  pub allowed_origins: Vec<String>,
}

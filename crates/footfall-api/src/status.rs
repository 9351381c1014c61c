//! Handlers for the dashboard support endpoints `/status` and `/logs`.

use axum::{Json, extract::State};
use serde::Serialize;

use footfall_core::{oplog::OpEntry, store::StatStore};
use footfall_reconcile::RemoteSource;

use crate::{AppState, error::ApiError};

/// Body of `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusBody {
  pub uptime_seconds: u64,
  pub record_count:   usize,
  pub last_entry:     Option<LastEntry>,
}

/// Summary of the most recently appended record.
#[derive(Debug, Serialize)]
pub struct LastEntry {
  pub entry_timestamp: String,
  pub country:         String,
  pub ip:              String,
}

/// `GET /status`
pub async fn status<S, R>(
  State(state): State<AppState<S, R>>,
) -> Result<Json<StatusBody>, ApiError>
where
  S: StatStore,
  R: RemoteSource,
{
  let records = state
    .store
    .read_all()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let last_entry = records.last().map(|r| LastEntry {
    entry_timestamp: r.entry_timestamp.clone(),
    country:         r.country.clone(),
    ip:              r.ip.clone(),
  });

  Ok(Json(StatusBody {
    uptime_seconds: state.started_at.elapsed().as_secs(),
    record_count: records.len(),
    last_entry,
  }))
}

/// `GET /logs` — recent operations, oldest first.
pub async fn logs<S, R>(State(state): State<AppState<S, R>>) -> Json<Vec<OpEntry>>
where
  S: StatStore,
  R: RemoteSource,
{
  Json(state.op_entries())
}

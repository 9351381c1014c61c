//! Handlers for `/events` — the ingest service and the full read.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events` | Body: partial [`NewVisit`]; returns stored record + `is_new` |
//! | `GET`  | `/events` | Full record sequence in insertion order |

use axum::{Json, extract::State};
use footfall_core::{
  oplog::OpKind,
  record::{NewVisit, VisitRecord, entry_timestamp_now},
  store::{StatStore, UpsertOutcome},
};
use footfall_reconcile::RemoteSource;

use crate::{AppState, error::ApiError};

/// `POST /events`
///
/// The entry timestamp is assigned here from the storefront reference clock;
/// whatever the client sent for it is discarded. Validation runs before the
/// store is touched, so a `400` implies no mutation.
pub async fn ingest<S, R>(
  State(state): State<AppState<S, R>>,
  Json(mut event): Json<NewVisit>,
) -> Result<Json<UpsertOutcome>, ApiError>
where
  S: StatStore,
  R: RemoteSource,
{
  event.entry_timestamp = entry_timestamp_now();
  event
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let outcome = state
    .store
    .upsert(event)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  state.log_op(
    OpKind::Ingest,
    format!(
      "{} ({})",
      outcome.record.ip,
      if outcome.is_new { "new" } else { "merged" }
    ),
  );

  Ok(Json(outcome))
}

/// `GET /events`
pub async fn list<S, R>(
  State(state): State<AppState<S, R>>,
) -> Result<Json<Vec<VisitRecord>>, ApiError>
where
  S: StatStore,
  R: RemoteSource,
{
  let records = state
    .store
    .read_all()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(records))
}

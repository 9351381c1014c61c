//! Handlers for `/clear`, `/reconcile`, and `/comparison`.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use footfall_core::{oplog::OpKind, record::VisitRecord, store::StatStore};
use footfall_reconcile::RemoteSource;

use crate::{AppState, error::ApiError};

/// `POST /clear` — reset the record set. Idempotent; clearing an empty store
/// is a no-op success.
pub async fn clear<S, R>(
  State(state): State<AppState<S, R>>,
) -> Result<Json<Value>, ApiError>
where
  S: StatStore,
  R: RemoteSource,
{
  state
    .store
    .clear()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  state.log_op(OpKind::Clear, "record set cleared");
  Ok(Json(json!({ "cleared": true })))
}

/// `POST /reconcile` — run a reconciliation pass and return the new orders.
/// On upstream failure the previous comparison snapshot survives.
pub async fn reconcile<S, R>(
  State(state): State<AppState<S, R>>,
) -> Result<Json<Vec<VisitRecord>>, ApiError>
where
  S: StatStore,
  R: RemoteSource,
{
  let new_orders = state.reconciler.diff_against_remote().await?;
  state.log_op(
    OpKind::Reconcile,
    format!("{} new orders", new_orders.len()),
  );
  Ok(Json(new_orders))
}

/// `GET /comparison` — the last persisted snapshot, no recomputation.
pub async fn comparison<S, R>(
  State(state): State<AppState<S, R>>,
) -> Result<Json<Vec<VisitRecord>>, ApiError>
where
  S: StatStore,
  R: RemoteSource,
{
  let snapshot = state
    .store
    .load_comparison()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(snapshot))
}

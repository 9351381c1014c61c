//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("remote fetch failed: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<footfall_reconcile::Error> for ApiError {
  fn from(e: footfall_reconcile::Error) -> Self {
    match e {
      footfall_reconcile::Error::Remote(inner) => ApiError::Upstream(inner),
      footfall_reconcile::Error::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      // Persistence details stay in the log; clients get the kind only.
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "persistence failure".to_string(),
        )
      }
      ApiError::Upstream(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("remote fetch failed: {e}"),
      ),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

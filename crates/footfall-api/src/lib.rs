//! JSON HTTP API for Footfall.
//!
//! Exposes an axum [`Router`] backed by any [`footfall_core::store::StatStore`]
//! and any [`footfall_reconcile::RemoteSource`]. CORS, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, footfall_api::api_router(state)).await?;
//! ```

pub mod error;
pub mod events;
pub mod maintenance;
pub mod status;

use std::{
  sync::{Arc, Mutex},
  time::Instant,
};

use axum::{
  Router,
  routing::{get, post},
};
use footfall_core::{
  oplog::{OpEntry, OpKind, OpLog},
  store::StatStore,
};
use footfall_reconcile::{Reconciler, RemoteSource};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, R> {
  pub store:      Arc<S>,
  pub reconciler: Arc<Reconciler<S, R>>,
  oplog:          Arc<Mutex<OpLog>>,
  pub started_at: Instant,
}

// Manual impl: `derive(Clone)` would demand `S: Clone` and `R: Clone`, which
// the Arc fields don't actually need.
impl<S, R> Clone for AppState<S, R> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      reconciler: self.reconciler.clone(),
      oplog:      self.oplog.clone(),
      started_at: self.started_at,
    }
  }
}

impl<S, R> AppState<S, R>
where
  S: StatStore,
  R: RemoteSource,
{
  pub fn new(store: Arc<S>, reconciler: Arc<Reconciler<S, R>>) -> Self {
    Self {
      store,
      reconciler,
      oplog: Arc::new(Mutex::new(OpLog::new())),
      started_at: Instant::now(),
    }
  }

  /// Append to the operation log. A poisoned log is skipped rather than
  /// taking a request down with it.
  pub fn log_op(&self, kind: OpKind, detail: impl Into<String>) {
    if let Ok(mut log) = self.oplog.lock() {
      log.record(kind, detail);
    }
  }

  /// Snapshot of the operation log, oldest first.
  pub fn op_entries(&self) -> Vec<OpEntry> {
    self.oplog.lock().map(|log| log.snapshot()).unwrap_or_default()
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, R>(state: AppState<S, R>) -> Router<()>
where
  S: StatStore + 'static,
  R: RemoteSource + 'static,
{
  Router::new()
    // Ingest + full read
    .route("/events", post(events::ingest::<S, R>).get(events::list::<S, R>))
    // Maintenance
    .route("/clear", post(maintenance::clear::<S, R>))
    .route("/reconcile", post(maintenance::reconcile::<S, R>))
    .route("/comparison", get(maintenance::comparison::<S, R>))
    // Dashboard support
    .route("/status", get(status::status::<S, R>))
    .route("/logs", get(status::logs::<S, R>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use footfall_core::record::{Purchase, VisitRecord};
  use footfall_store_json::JsonStore;
  use serde_json::{Value, json};
  use tempfile::TempDir;
  use tower::ServiceExt as _;

  // ── Fixture remote ──────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("fixture remote unavailable")]
  struct FixtureError;

  #[derive(Clone)]
  struct FixtureRemote {
    records: Vec<VisitRecord>,
    fail:    bool,
  }

  impl RemoteSource for FixtureRemote {
    type Error = FixtureError;

    async fn fetch(&self) -> Result<Vec<VisitRecord>, FixtureError> {
      if self.fail {
        Err(FixtureError)
      } else {
        Ok(self.records.clone())
      }
    }
  }

  type TestState = AppState<JsonStore, FixtureRemote>;

  async fn make_state(remote: FixtureRemote) -> (TestState, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let store = Arc::new(JsonStore::open(dir.path()).await.expect("open store"));
    let reconciler = Arc::new(Reconciler::new(store.clone(), remote));
    (AppState::new(store, reconciler), dir)
  }

  async fn empty_remote_state() -> (TestState, TempDir) {
    make_state(FixtureRemote {
      records: vec![],
      fail:    false,
    })
    .await
  }

  async fn send(state: TestState, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
    let builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    let body = match body {
      Some(v) => Body::from(v.to_string()),
      None => Body::empty(),
    };
    let req = builder.body(body).unwrap();
    api_router(state).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn visit_body(ip: &str) -> Value {
    json!({ "ip": ip, "country": "CU", "referrer_origin": "direct" })
  }

  // ── Ingest ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn post_event_stores_record_with_server_timestamp() {
    let (state, _dir) = empty_remote_state().await;

    let resp = send(state.clone(), "POST", "/events", Some(visit_body("1.2.3.4"))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["is_new"], json!(true));
    assert_eq!(body["record"]["user_type"], json!("New"));
    let ts = body["record"]["entry_timestamp"].as_str().unwrap();
    assert!(ts.ends_with("-05:00"), "server-assigned timestamp: {ts}");

    let resp = send(state, "GET", "/events", None).await;
    let records = body_json(resp).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["ip"], json!("1.2.3.4"));
  }

  #[tokio::test]
  async fn post_event_missing_ip_returns_400_without_mutation() {
    let (state, _dir) = empty_remote_state().await;

    let resp = send(
      state.clone(),
      "POST",
      "/events",
      Some(json!({ "referrer_origin": "direct" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("ip"));

    let resp = send(state, "GET", "/events", None).await;
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn post_event_missing_referrer_returns_400() {
    let (state, _dir) = empty_remote_state().await;
    let resp = send(
      state,
      "POST",
      "/events",
      Some(json!({ "ip": "1.2.3.4" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn repeat_ip_merges_and_keeps_classification() {
    let (state, _dir) = empty_remote_state().await;

    let mut body = visit_body("1.2.3.4");
    body["session_duration_seconds"] = json!(10);

    send(state.clone(), "POST", "/events", Some(body.clone())).await;
    let resp = send(state.clone(), "POST", "/events", Some(body)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let second = body_json(resp).await;
    assert_eq!(second["is_new"], json!(false));
    assert_eq!(second["record"]["session_duration_seconds"], json!(20));
    assert_eq!(second["record"]["user_type"], json!("New"));

    let resp = send(state, "GET", "/events", None).await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
  }

  // ── Clear ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn clear_empties_the_store_and_is_idempotent() {
    let (state, _dir) = empty_remote_state().await;
    send(state.clone(), "POST", "/events", Some(visit_body("1.2.3.4"))).await;

    let resp = send(state.clone(), "POST", "/clear", None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(state.clone(), "POST", "/clear", None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(state, "GET", "/events", None).await;
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
  }

  // ── Reconcile / comparison ──────────────────────────────────────────────

  fn order_body(ip: &str) -> Value {
    json!({
      "ip": ip,
      "referrer_origin": "direct",
      "purchases": [{ "product": "soap", "quantity": 1, "unit_price": 3.0 }],
      "purchase_total": 3.0,
    })
  }

  #[tokio::test]
  async fn reconcile_returns_new_orders_and_persists_snapshot() {
    let (state, _dir) = empty_remote_state().await;
    send(state.clone(), "POST", "/events", Some(order_body("1.2.3.4"))).await;
    // A visit with no purchases is not a candidate order.
    send(state.clone(), "POST", "/events", Some(visit_body("5.6.7.8"))).await;

    let resp = send(state.clone(), "POST", "/reconcile", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let orders = body_json(resp).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["ip"], json!("1.2.3.4"));

    let resp = send(state, "GET", "/comparison", None).await;
    let snapshot = body_json(resp).await;
    assert_eq!(snapshot.as_array().unwrap().len(), 1);
    assert_eq!(snapshot[0]["ip"], json!("1.2.3.4"));
  }

  #[tokio::test]
  async fn reconcile_failure_returns_500_and_preserves_snapshot() {
    let (good, _dir) = make_state(FixtureRemote {
      records: vec![],
      fail:    false,
    })
    .await;
    send(good.clone(), "POST", "/events", Some(order_body("1.2.3.4"))).await;
    send(good.clone(), "POST", "/reconcile", None).await;

    // Same store, now with a failing remote.
    let broken = AppState::new(
      good.store.clone(),
      Arc::new(Reconciler::new(
        good.store.clone(),
        FixtureRemote {
          records: vec![],
          fail:    true,
        },
      )),
    );

    let resp = send(broken.clone(), "POST", "/reconcile", None).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("remote fetch failed"));

    let resp = send(broken, "GET", "/comparison", None).await;
    let snapshot = body_json(resp).await;
    assert_eq!(snapshot.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn comparison_does_not_recompute() {
    let (state, _dir) = empty_remote_state().await;
    send(state.clone(), "POST", "/events", Some(order_body("1.2.3.4"))).await;

    // No reconcile has run, so the snapshot is still empty even though a
    // candidate order exists locally.
    let resp = send(state, "GET", "/comparison", None).await;
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn reconcile_skips_orders_the_remote_already_has() {
    let (seed, _dir) = empty_remote_state().await;
    send(seed.clone(), "POST", "/events", Some(order_body("1.2.3.4"))).await;
    let remote_copy = seed.store.read_all().await.unwrap();

    let mirrored = AppState::new(
      seed.store.clone(),
      Arc::new(Reconciler::new(
        seed.store.clone(),
        FixtureRemote {
          records: remote_copy,
          fail:    false,
        },
      )),
    );

    let resp = send(mirrored, "POST", "/reconcile", None).await;
    assert!(body_json(resp).await.as_array().unwrap().is_empty());
  }

  // ── Dashboard support ───────────────────────────────────────────────────

  #[tokio::test]
  async fn status_reflects_record_count_and_last_entry() {
    let (state, _dir) = empty_remote_state().await;
    send(state.clone(), "POST", "/events", Some(visit_body("1.2.3.4"))).await;
    send(state.clone(), "POST", "/events", Some(visit_body("5.6.7.8"))).await;

    let resp = send(state, "GET", "/status", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["record_count"], json!(2));
    assert_eq!(body["last_entry"]["ip"], json!("5.6.7.8"));
    assert_eq!(body["last_entry"]["country"], json!("CU"));
  }

  #[tokio::test]
  async fn logs_record_operations_in_order() {
    let (state, _dir) = empty_remote_state().await;
    send(state.clone(), "POST", "/events", Some(visit_body("1.2.3.4"))).await;
    send(state.clone(), "POST", "/clear", None).await;

    let resp = send(state, "GET", "/logs", None).await;
    let body = body_json(resp).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], json!("ingest"));
    assert_eq!(entries[1]["kind"], json!("clear"));
  }

  // Keeps the Purchase import honest: the wire shape must match the model.
  #[tokio::test]
  async fn stored_purchases_deserialize_to_the_model() {
    let (state, _dir) = empty_remote_state().await;
    send(state.clone(), "POST", "/events", Some(order_body("1.2.3.4"))).await;

    let records = state.store.read_all().await.unwrap();
    assert_eq!(
      records[0].purchases,
      vec![Purchase {
        product:    "soap".to_string(),
        quantity:   1,
        unit_price: 3.0,
      }]
    );
  }
}

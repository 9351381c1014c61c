//! The `StatStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `footfall-store-json`).
//! Higher layers (`footfall-api`, `footfall-reconcile`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::record::{NewVisit, VisitRecord};

/// Result of an [`StatStore::upsert`] call.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
  /// The record as stored after the call.
  pub record: VisitRecord,
  /// `true` if the call inserted a new record, `false` if it merged into an
  /// existing one.
  pub is_new: bool,
}

/// Abstraction over a Footfall record store backend.
///
/// Implementations must make each operation atomic with respect to the
/// others: no `upsert` or `read_all` may observe a half-written record set,
/// and whatever guards the resource must be released on every exit path,
/// including decode and write failures.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait StatStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the full record set. A missing resource is an empty set, not an
  /// error.
  fn read_all(
    &self,
  ) -> impl Future<Output = Result<Vec<VisitRecord>, Self::Error>> + Send + '_;

  /// Insert or merge one validated event.
  ///
  /// A first-time IP inserts a new record classified `New`; a repeat IP
  /// merges in place per [`VisitRecord::merge_from`]. The read-modify-write
  /// span is the unit of atomicity.
  fn upsert(
    &self,
    event: NewVisit,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Reset the record set to empty. Idempotent; creates the resource and its
  /// parent directory if absent.
  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The last persisted comparison snapshot (missing = empty).
  fn load_comparison(
    &self,
  ) -> impl Future<Output = Result<Vec<VisitRecord>, Self::Error>> + Send + '_;

  /// Wholesale-replace the comparison snapshot.
  fn replace_comparison(
    &self,
    records: Vec<VisitRecord>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

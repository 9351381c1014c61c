//! [`Reconciler`] — the diff pass and the periodic task driving it.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use footfall_core::{record::VisitRecord, store::StatStore};

use crate::{Error, Result, remote::RemoteSource};

// ─── Diff ────────────────────────────────────────────────────────────────────

/// Compute the local candidate orders the remote copy does not have yet.
///
/// A local record counts only if it carries purchases; it is "new" if no
/// remote record with purchases shares its `(ip, entry_timestamp)` pair.
/// Equality is exact string match — no tolerance window. Local order is
/// preserved.
pub fn diff(local: &[VisitRecord], remote: &[VisitRecord]) -> Vec<VisitRecord> {
  local
    .iter()
    .filter(|l| l.is_candidate_order())
    .filter(|l| {
      !remote.iter().any(|r| {
        r.is_candidate_order()
          && r.ip == l.ip
          && r.entry_timestamp == l.entry_timestamp
      })
    })
    .cloned()
    .collect()
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// Diffs the local store against a remote reference copy and persists the
/// result as the comparison snapshot.
pub struct Reconciler<S, R> {
  store:  Arc<S>,
  remote: R,
}

impl<S, R> Reconciler<S, R>
where
  S: StatStore,
  R: RemoteSource,
{
  pub fn new(store: Arc<S>, remote: R) -> Self {
    Self { store, remote }
  }

  /// Run one full reconciliation pass and return the new orders.
  ///
  /// The remote fetch happens first: if it fails, nothing is written and the
  /// previous snapshot survives. The local read takes the store's lock, so
  /// the diff always sees a consistent record set.
  pub async fn diff_against_remote(&self) -> Result<Vec<VisitRecord>> {
    let remote = self
      .remote
      .fetch()
      .await
      .map_err(|e| Error::Remote(Box::new(e)))?;

    let local = self
      .store
      .read_all()
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    let new_orders = diff(&local, &remote);

    self
      .store
      .replace_comparison(new_orders.clone())
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    Ok(new_orders)
  }
}

// ─── Periodic task ───────────────────────────────────────────────────────────

/// Spawn the recurring reconciliation task.
///
/// Tick failures are logged and swallowed; the next tick always runs.
pub fn spawn_periodic<S, R>(
  reconciler: Arc<Reconciler<S, R>>,
  period: Duration,
) -> JoinHandle<()>
where
  S: StatStore + 'static,
  R: RemoteSource + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      match reconciler.diff_against_remote().await {
        Ok(new_orders) => {
          tracing::debug!(count = new_orders.len(), "reconciliation pass complete");
        }
        Err(e) => {
          tracing::warn!(error = %e, "reconciliation pass failed");
        }
      }
    }
  })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

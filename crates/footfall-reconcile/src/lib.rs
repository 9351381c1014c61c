//! Reconciliation of the local record store against a remote reference copy.
//!
//! The remote copy is the published version of the same record set. A local
//! record with purchases that the remote does not know about yet is a "new
//! order"; each reconciliation pass recomputes the full set of new orders and
//! persists it wholesale as the comparison snapshot.

mod reconciler;

pub mod error;
pub mod remote;

pub use error::{Error, Result};
pub use reconciler::{Reconciler, diff, spawn_periodic};
pub use remote::{HttpRemote, RemoteError, RemoteSource};

//! Error type for `footfall-reconcile`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The remote fetch failed; the previous comparison snapshot was left
  /// untouched.
  #[error("remote fetch failed: {0}")]
  Remote(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

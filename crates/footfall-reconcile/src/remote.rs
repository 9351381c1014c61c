//! The `RemoteSource` trait and its HTTP implementation.
//!
//! The reconciler takes the remote as an injected capability so tests can
//! substitute a fixture for the network.

use std::{future::Future, time::Duration};

use reqwest::Client;
use thiserror::Error;

use footfall_core::record::VisitRecord;

/// A source for the remote reference copy of the record set.
pub trait RemoteSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the full remote record set. Any failure — network, non-success
  /// status, undecodable body — is an error; there is no partial result.
  fn fetch(
    &self,
  ) -> impl Future<Output = Result<Vec<VisitRecord>, Self::Error>> + Send + '_;
}

#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("remote returned {0}")]
  Status(reqwest::StatusCode),
}

/// Fetches the reference copy with a plain HTTP GET to a fixed URL.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpRemote {
  client: Client,
  url:    String,
}

impl HttpRemote {
  pub fn new(url: impl Into<String>) -> Result<Self, RemoteError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self {
      client,
      url: url.into(),
    })
  }
}

impl RemoteSource for HttpRemote {
  type Error = RemoteError;

  async fn fetch(&self) -> Result<Vec<VisitRecord>, RemoteError> {
    let resp = self.client.get(&self.url).send().await?;
    if !resp.status().is_success() {
      return Err(RemoteError::Status(resp.status()));
    }
    Ok(resp.json().await?)
  }
}

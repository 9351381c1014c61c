//! [`JsonStore`] — the file-backed implementation of [`StatStore`].

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::Arc,
};

use tokio::{fs, sync::Mutex};

use footfall_core::{
  codec,
  record::{NewVisit, UserType, VisitRecord},
  store::{StatStore, UpsertOutcome},
};

use crate::{Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Footfall record store backed by two JSON files under one data
/// directory: the record set and the last comparison snapshot.
///
/// Cloning is cheap — the inner state is reference-counted.
#[derive(Clone)]
pub struct JsonStore {
  inner: Arc<Inner>,
}

struct Inner {
  records_path:    PathBuf,
  comparison_path: PathBuf,
  /// Advisory lock over the record file. Waiters queue in FIFO order and the
  /// guard releases on drop, so every exit path — decode failure, write
  /// failure — unlocks exactly once.
  records_lock:    Mutex<()>,
  comparison_lock: Mutex<()>,
}

impl JsonStore {
  /// Open a store rooted at `data_dir`, creating the directory if absent.
  /// The files themselves are created lazily on first write; a missing file
  /// reads as an empty set.
  pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
    let data_dir = data_dir.as_ref();
    fs::create_dir_all(data_dir).await?;
    Ok(Self {
      inner: Arc::new(Inner {
        records_path:    data_dir.join("records.json"),
        comparison_path: data_dir.join("comparison.json"),
        records_lock:    Mutex::new(()),
        comparison_lock: Mutex::new(()),
      }),
    })
  }

  /// Decode raw file contents, degrading corruption to an empty working set.
  fn decode_lenient(&self, raw: &str) -> Vec<VisitRecord> {
    let outcome = codec::decode(raw);
    if outcome.was_corrupt() {
      tracing::warn!(
        path = %self.inner.records_path.display(),
        "record set needed recovery",
      );
    }
    outcome.into_records()
  }
}

// ─── File helpers ────────────────────────────────────────────────────────────

/// Read a file, treating "does not exist" as empty contents.
async fn read_or_empty(path: &Path) -> Result<String> {
  match fs::read_to_string(path).await {
    Ok(raw) => Ok(raw),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
    Err(e) => Err(e.into()),
  }
}

/// Write via a sibling temp file and rename, so readers never observe a
/// half-written set. Creates the parent directory if it vanished.
async fn write_whole(path: &Path, contents: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).await?;
  }
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, contents).await?;
  fs::rename(&tmp, path).await?;
  Ok(())
}

// ─── StatStore impl ──────────────────────────────────────────────────────────

impl StatStore for JsonStore {
  type Error = Error;

  async fn read_all(&self) -> Result<Vec<VisitRecord>> {
    let _guard = self.inner.records_lock.lock().await;
    let raw = read_or_empty(&self.inner.records_path).await?;
    Ok(self.decode_lenient(&raw))
  }

  async fn upsert(&self, event: NewVisit) -> Result<UpsertOutcome> {
    event.validate()?;

    let _guard = self.inner.records_lock.lock().await;

    let raw = read_or_empty(&self.inner.records_path).await?;
    let mut records = self.decode_lenient(&raw);

    let outcome = match records.iter_mut().find(|r| r.ip == event.ip) {
      Some(existing) => {
        existing.merge_from(&event);
        UpsertOutcome {
          record: existing.clone(),
          is_new: false,
        }
      }
      None => {
        let record = event.into_record(UserType::New);
        records.push(record.clone());
        UpsertOutcome {
          record,
          is_new: true,
        }
      }
    };

    let encoded = codec::encode(&records)?;
    write_whole(&self.inner.records_path, &encoded).await?;

    Ok(outcome)
  }

  async fn clear(&self) -> Result<()> {
    let _guard = self.inner.records_lock.lock().await;
    let empty = codec::encode::<VisitRecord>(&[])?;
    write_whole(&self.inner.records_path, &empty).await
  }

  async fn load_comparison(&self) -> Result<Vec<VisitRecord>> {
    let _guard = self.inner.comparison_lock.lock().await;
    let raw = read_or_empty(&self.inner.comparison_path).await?;
    Ok(codec::decode(&raw).into_records())
  }

  async fn replace_comparison(&self, records: Vec<VisitRecord>) -> Result<()> {
    let _guard = self.inner.comparison_lock.lock().await;
    let encoded = codec::encode(&records)?;
    write_whole(&self.inner.comparison_path, &encoded).await
  }
}

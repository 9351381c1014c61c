//! Record-set codec: JSON text on disk ⇄ `Vec<VisitRecord>`.
//!
//! Decoding is lenient by contract: empty input is an empty set, and
//! syntactically broken input gets one sanitise-and-retry pass before the
//! codec degrades to an empty set. Corruption never escalates to an error —
//! the store must keep serving.

use serde::Serialize;

use crate::record::VisitRecord;

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of decoding a persisted record set.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
  /// Input parsed as-is.
  Clean(Vec<VisitRecord>),
  /// Input parsed only after the sanitise pass.
  Recovered(Vec<VisitRecord>),
  /// Input is beyond repair; callers treat the set as empty.
  Unrecoverable,
}

impl DecodeOutcome {
  /// The decoded records, with corruption degraded to an empty set.
  pub fn into_records(self) -> Vec<VisitRecord> {
    match self {
      DecodeOutcome::Clean(records) | DecodeOutcome::Recovered(records) => records,
      DecodeOutcome::Unrecoverable => Vec::new(),
    }
  }

  /// Whether the input needed repair (successful or not).
  pub fn was_corrupt(&self) -> bool {
    !matches!(self, DecodeOutcome::Clean(_))
  }
}

// ─── Decode ──────────────────────────────────────────────────────────────────

/// Decode a persisted record set.
pub fn decode(raw: &str) -> DecodeOutcome {
  if raw.trim().is_empty() {
    return DecodeOutcome::Clean(Vec::new());
  }

  match serde_json::from_str(raw) {
    Ok(records) => DecodeOutcome::Clean(records),
    Err(_) => {
      let repaired = sanitize(raw);
      match serde_json::from_str(&repaired) {
        Ok(records) => DecodeOutcome::Recovered(records),
        Err(_) => DecodeOutcome::Unrecoverable,
      }
    }
  }
}

/// Strip raw control characters and collapse common over-escaping artifacts.
///
/// Runs at most once per decode, and only after a straight parse has already
/// failed, so it is free to be destructive about escape sequences.
fn sanitize(raw: &str) -> String {
  let stripped: String = raw
    .chars()
    .filter(|&c| {
      let cp = c as u32;
      !(cp <= 0x1f || (0x7f..=0x9f).contains(&cp))
    })
    .collect();

  stripped
    .replace("\\\"", "\"")
    .replace("\\n", "")
    .replace("\\t", "")
    .replace("\\r", "")
}

// ─── Encode ──────────────────────────────────────────────────────────────────

/// Encode a record set as pretty-printed JSON.
///
/// Field order inside each record is fixed by the `VisitRecord` declaration,
/// so successive encodes of equal sets are byte-identical and diff cleanly
/// against the remote copy.
pub fn encode<T: Serialize>(records: &[T]) -> Result<String, serde_json::Error> {
  serde_json::to_string_pretty(records)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

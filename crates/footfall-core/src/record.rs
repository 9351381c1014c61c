//! Visit records — the unit of the Footfall analytics store.
//!
//! A [`VisitRecord`] is one row of the persisted record set, keyed (best
//! effort, not uniquely over time) by visitor IP. Repeat visits from the same
//! IP merge into the existing record: session duration accumulates and
//! purchases are appended, never replaced.

use chrono::{FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Reference clock ─────────────────────────────────────────────────────────

/// The storefront reference timezone (UTC-05:00). Entry timestamps are
/// assigned from the server clock in this zone, never from the client's.
const STORE_TZ: FixedOffset = match FixedOffset::west_opt(5 * 3600) {
  Some(tz) => tz,
  None => panic!("invalid storefront offset"),
};

/// Current instant formatted as an ISO-8601 string in [`STORE_TZ`].
pub fn entry_timestamp_now() -> String {
  Utc::now()
    .with_timezone(&STORE_TZ)
    .to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Visitor classification, decided once at insertion time and never
/// re-evaluated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
  New,
  Returning,
}

// ─── Purchases ───────────────────────────────────────────────────────────────

/// One line item of a completed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
  pub product:    String,
  pub quantity:   u32,
  pub unit_price: f64,
}

// ─── Stored record ───────────────────────────────────────────────────────────

fn unknown() -> String {
  "Unknown".to_string()
}

fn none_marker() -> String {
  "None".to_string()
}

fn not_available() -> String {
  "N/A".to_string()
}

/// One persisted visit record.
///
/// Field declaration order is the stable encode order — the codec relies on
/// it so that pretty-printed output diffs cleanly against the remote copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
  pub ip:                       String,
  #[serde(default = "unknown")]
  pub country:                  String,
  pub entry_timestamp:          String,
  pub referrer_origin:          String,
  #[serde(default = "none_marker")]
  pub affiliate:                String,
  #[serde(default)]
  pub session_duration_seconds: u64,
  #[serde(default)]
  pub page_load_ms:             u64,
  #[serde(default)]
  pub avg_time_per_page:        u64,
  #[serde(default = "not_available")]
  pub name:                     String,
  #[serde(default = "not_available")]
  pub phone:                    String,
  #[serde(default = "not_available")]
  pub email:                    String,
  #[serde(default = "not_available")]
  pub shipping_address:         String,
  #[serde(default)]
  pub purchases:                Vec<Purchase>,
  #[serde(default)]
  pub purchase_total:           f64,
  #[serde(default = "unknown")]
  pub browser:                  String,
  #[serde(default = "unknown")]
  pub os:                       String,
  #[serde(default = "unknown")]
  pub traffic_source:           String,
  pub user_type:                UserType,
}

impl VisitRecord {
  /// Whether this record represents a completed order — i.e. it carries at
  /// least one purchase.
  pub fn is_candidate_order(&self) -> bool {
    !self.purchases.is_empty()
  }

  /// Fold a repeat visit from the same IP into this record.
  ///
  /// Merge rules: `session_duration_seconds` and `purchase_total` accumulate,
  /// `purchases` are appended. `user_type` and all identity fields keep the
  /// values set at insertion.
  pub fn merge_from(&mut self, event: &NewVisit) {
    self.session_duration_seconds += event.session_duration_seconds;
    if !event.purchases.is_empty() {
      self.purchases.extend(event.purchases.iter().cloned());
      self.purchase_total += event.purchase_total;
    }
  }
}

// ─── Incoming event ──────────────────────────────────────────────────────────

/// A client-supplied visit event, before validation and timestamp assignment.
///
/// Everything except `ip` and `referrer_origin` is optional on the wire.
/// `entry_timestamp` is overwritten server-side by the ingest path; the field
/// exists so callers that drive a store directly must still supply one.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVisit {
  #[serde(default)]
  pub ip:                       String,
  #[serde(default = "unknown")]
  pub country:                  String,
  #[serde(default)]
  pub entry_timestamp:          String,
  #[serde(default)]
  pub referrer_origin:          String,
  #[serde(default = "none_marker")]
  pub affiliate:                String,
  #[serde(default)]
  pub session_duration_seconds: u64,
  #[serde(default)]
  pub page_load_ms:             u64,
  #[serde(default)]
  pub avg_time_per_page:        u64,
  #[serde(default = "not_available")]
  pub name:                     String,
  #[serde(default = "not_available")]
  pub phone:                    String,
  #[serde(default = "not_available")]
  pub email:                    String,
  #[serde(default = "not_available")]
  pub shipping_address:         String,
  #[serde(default)]
  pub purchases:                Vec<Purchase>,
  #[serde(default)]
  pub purchase_total:           f64,
  #[serde(default = "unknown")]
  pub browser:                  String,
  #[serde(default = "unknown")]
  pub os:                       String,
  #[serde(default = "unknown")]
  pub traffic_source:           String,
}

// Hand-written so the in-memory defaults match the wire defaults — a derived
// impl would leave the marker fields as empty strings.
impl Default for NewVisit {
  fn default() -> Self {
    Self {
      ip:                       String::new(),
      country:                  unknown(),
      entry_timestamp:          String::new(),
      referrer_origin:          String::new(),
      affiliate:                none_marker(),
      session_duration_seconds: 0,
      page_load_ms:             0,
      avg_time_per_page:        0,
      name:                     not_available(),
      phone:                    not_available(),
      email:                    not_available(),
      shipping_address:         not_available(),
      purchases:                Vec::new(),
      purchase_total:           0.0,
      browser:                  unknown(),
      os:                       unknown(),
      traffic_source:           unknown(),
    }
  }
}

impl NewVisit {
  /// Check required fields. Runs before any store mutation; a failure here
  /// means nothing was written.
  pub fn validate(&self) -> Result<()> {
    if self.ip.trim().is_empty() {
      return Err(Error::MissingField("ip"));
    }
    if self.referrer_origin.trim().is_empty() {
      return Err(Error::MissingField("referrer_origin"));
    }
    if self.entry_timestamp.trim().is_empty() {
      return Err(Error::MissingField("entry_timestamp"));
    }
    Ok(())
  }

  /// Build the stored record for a first-time insertion.
  pub fn into_record(self, user_type: UserType) -> VisitRecord {
    VisitRecord {
      ip:                       self.ip,
      country:                  self.country,
      entry_timestamp:          self.entry_timestamp,
      referrer_origin:          self.referrer_origin,
      affiliate:                self.affiliate,
      session_duration_seconds: self.session_duration_seconds,
      page_load_ms:             self.page_load_ms,
      avg_time_per_page:        self.avg_time_per_page,
      name:                     self.name,
      phone:                    self.phone,
      email:                    self.email,
      shipping_address:         self.shipping_address,
      purchases:                self.purchases,
      purchase_total:           self.purchase_total,
      browser:                  self.browser,
      os:                       self.os,
      traffic_source:           self.traffic_source,
      user_type,
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn visit(ip: &str) -> NewVisit {
    NewVisit {
      ip:              ip.to_string(),
      referrer_origin: "direct".to_string(),
      entry_timestamp: entry_timestamp_now(),
      ..NewVisit::default()
    }
  }

  #[test]
  fn validate_rejects_empty_ip() {
    let mut v = visit("1.2.3.4");
    v.ip = String::new();
    assert!(matches!(v.validate(), Err(Error::MissingField("ip"))));
  }

  #[test]
  fn validate_rejects_missing_referrer() {
    let mut v = visit("1.2.3.4");
    v.referrer_origin = "  ".to_string();
    assert!(matches!(
      v.validate(),
      Err(Error::MissingField("referrer_origin"))
    ));
  }

  #[test]
  fn validate_rejects_missing_timestamp() {
    let mut v = visit("1.2.3.4");
    v.entry_timestamp = String::new();
    assert!(matches!(
      v.validate(),
      Err(Error::MissingField("entry_timestamp"))
    ));
  }

  #[test]
  fn merge_accumulates_duration_and_appends_purchases() {
    let mut record = visit("1.2.3.4").into_record(UserType::New);
    record.session_duration_seconds = 10;

    let mut repeat = visit("1.2.3.4");
    repeat.session_duration_seconds = 10;
    repeat.purchases = vec![Purchase {
      product:    "candles".to_string(),
      quantity:   2,
      unit_price: 4.5,
    }];
    repeat.purchase_total = 9.0;

    record.merge_from(&repeat);

    assert_eq!(record.session_duration_seconds, 20);
    assert_eq!(record.purchases.len(), 1);
    assert_eq!(record.purchase_total, 9.0);
    assert_eq!(record.user_type, UserType::New);
  }

  #[test]
  fn merge_keeps_existing_purchases() {
    let mut first = visit("1.2.3.4");
    first.purchases = vec![Purchase {
      product:    "soap".to_string(),
      quantity:   1,
      unit_price: 3.0,
    }];
    first.purchase_total = 3.0;
    let mut record = first.into_record(UserType::New);

    let mut repeat = visit("1.2.3.4");
    repeat.purchases = vec![Purchase {
      product:    "towel".to_string(),
      quantity:   1,
      unit_price: 7.0,
    }];
    repeat.purchase_total = 7.0;
    record.merge_from(&repeat);

    assert_eq!(record.purchases.len(), 2);
    assert_eq!(record.purchases[0].product, "soap");
    assert_eq!(record.purchase_total, 10.0);
  }

  #[test]
  fn entry_timestamp_uses_storefront_offset() {
    let ts = entry_timestamp_now();
    assert!(ts.ends_with("-05:00"), "timestamp: {ts}");
  }

  #[test]
  fn user_type_serializes_as_plain_string() {
    let json = serde_json::to_string(&UserType::Returning).unwrap();
    assert_eq!(json, "\"Returning\"");
  }
}

//! Expiry classification.
//!
//! Every screen that shows a credential badge derives it from here, so the
//! boundary arithmetic lives in exactly one place.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days before expiry during which a credential counts as expiring soon,
/// unless the caller configures otherwise.
pub const DEFAULT_WARNING_WINDOW_DAYS: u32 = 30;

/// Lifecycle status of a credential relative to a reference date.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
  Active,
  ExpiringSoon,
  Expired,
  Missing,
}

impl ExpiryStatus {
  pub const ALL: [Self; 4] =
    [Self::Active, Self::ExpiringSoon, Self::Expired, Self::Missing];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::ExpiringSoon => "expiring_soon",
      Self::Expired => "expired",
      Self::Missing => "missing",
    }
  }

  /// Whether a credential in this status belongs on a "needs attention" list.
  pub fn needs_attention(self) -> bool {
    matches!(self, Self::ExpiringSoon | Self::Expired)
  }
}

/// Derived status and day count. Never persisted.
///
/// `days_remaining` is always non-negative: days until expiry for `active`
/// and `expiring_soon`, days since expiry for `expired`, and `None` for
/// `missing`. Use [`Classification::signed_days`] for the signed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
  pub status:         ExpiryStatus,
  pub days_remaining: Option<i64>,
}

impl Classification {
  pub const MISSING: Self =
    Self { status: ExpiryStatus::Missing, days_remaining: None };

  /// Days until expiry, negative once expired.
  pub fn signed_days(&self) -> Option<i64> {
    match self.status {
      ExpiryStatus::Expired => self.days_remaining.map(|d| -d),
      _ => self.days_remaining,
    }
  }
}

/// Classify an expiry date against `reference`.
///
/// A credential that expires on `reference` is still valid through the end of
/// that day, so it is `expiring_soon` with zero days left, never `expired`.
pub fn classify(
  expires_on: Option<NaiveDate>,
  reference: NaiveDate,
  warning_window_days: u32,
) -> Classification {
  let Some(expires_on) = expires_on else {
    return Classification::MISSING;
  };

  let diff = expires_on.signed_duration_since(reference).num_days();
  let status = if diff < 0 {
    ExpiryStatus::Expired
  } else if diff <= i64::from(warning_window_days) {
    ExpiryStatus::ExpiringSoon
  } else {
    ExpiryStatus::Active
  };

  Classification { status, days_remaining: Some(diff.abs()) }
}

/// Like [`classify`], taking a timestamp whose time of day is ignored.
pub fn classify_at(
  expires_on: Option<NaiveDate>,
  now: DateTime<Utc>,
  warning_window_days: u32,
) -> Classification {
  classify(expires_on, now.date_naive(), warning_window_days)
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() }

  fn in_days(n: i64) -> Option<NaiveDate> { Some(today() + Duration::days(n)) }

  #[test]
  fn window_edge_is_expiring_soon() {
    let at_edge = classify(in_days(30), today(), 30);
    assert_eq!(at_edge.status, ExpiryStatus::ExpiringSoon);
    assert_eq!(at_edge.days_remaining, Some(30));

    let past_edge = classify(in_days(31), today(), 30);
    assert_eq!(past_edge.status, ExpiryStatus::Active);
    assert_eq!(past_edge.days_remaining, Some(31));
  }

  #[test]
  fn expiring_today_is_not_expired() {
    let c = classify(in_days(0), today(), DEFAULT_WARNING_WINDOW_DAYS);
    assert_eq!(c.status, ExpiryStatus::ExpiringSoon);
    assert_eq!(c.days_remaining, Some(0));
  }

  #[test]
  fn yesterday_is_expired_by_one_day() {
    let c = classify(in_days(-1), today(), DEFAULT_WARNING_WINDOW_DAYS);
    assert_eq!(c.status, ExpiryStatus::Expired);
    assert_eq!(c.days_remaining, Some(1));
    assert_eq!(c.signed_days(), Some(-1));
  }

  #[test]
  fn no_date_is_missing_for_any_window() {
    for window in [0, 1, 30, 365, u32::MAX] {
      assert_eq!(classify(None, today(), window), Classification::MISSING);
    }
  }

  #[test]
  fn zero_window_only_flags_today() {
    assert_eq!(classify(in_days(0), today(), 0).status, ExpiryStatus::ExpiringSoon);
    assert_eq!(classify(in_days(1), today(), 0).status, ExpiryStatus::Active);
  }

  #[test]
  fn time_of_day_is_ignored() {
    let late = Utc.with_ymd_and_hms(2024, 6, 15, 23, 59, 59).unwrap();
    let early = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 1).unwrap();
    assert_eq!(classify_at(in_days(1), late, 30), classify_at(in_days(1), early, 30));
    assert_eq!(classify_at(in_days(1), late, 30).days_remaining, Some(1));
  }

  #[test]
  fn status_serialises_in_snake_case() {
    let json = serde_json::to_string(&ExpiryStatus::ExpiringSoon).unwrap();
    assert_eq!(json, "\"expiring_soon\"");
  }
}

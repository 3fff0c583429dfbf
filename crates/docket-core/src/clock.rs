//! The source of "today". Injected everywhere a classification is computed
//! so expiry logic stays deterministic under test.

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
  /// The current calendar date.
  fn today(&self) -> NaiveDate;
}

/// Reads the system clock, in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate { Utc::now().date_naive() }
}

/// Always returns the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate { self.0 }
}

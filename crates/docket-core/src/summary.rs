//! Compliance aggregation: classify many credentials and bucket the results
//! into the summary the dashboard and document manager render.

use std::{cmp::Ordering, collections::BTreeMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  credential::{CredentialKind, ExpiryField, SubjectKind, TrackedCredential},
  status::{Classification, ExpiryStatus, classify},
};

// ─── Counts ──────────────────────────────────────────────────────────────────

/// Number of credentials in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub active:        usize,
  pub expiring_soon: usize,
  pub expired:       usize,
  pub missing:       usize,
}

impl StatusCounts {
  fn record(&mut self, status: ExpiryStatus) {
    match status {
      ExpiryStatus::Active => self.active += 1,
      ExpiryStatus::ExpiringSoon => self.expiring_soon += 1,
      ExpiryStatus::Expired => self.expired += 1,
      ExpiryStatus::Missing => self.missing += 1,
    }
  }

  pub fn get(&self, status: ExpiryStatus) -> usize {
    match status {
      ExpiryStatus::Active => self.active,
      ExpiryStatus::ExpiringSoon => self.expiring_soon,
      ExpiryStatus::Expired => self.expired,
      ExpiryStatus::Missing => self.missing,
    }
  }

  pub fn total(&self) -> usize {
    self.active + self.expiring_soon + self.expired + self.missing
  }
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// One credential on a listing, with its derived classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedCredential {
  pub credential_id:  Uuid,
  pub subject_id:     String,
  pub subject_name:   String,
  pub subject_kind:   SubjectKind,
  pub kind:           CredentialKind,
  pub expires_on:     Option<NaiveDate>,
  pub number:         Option<String>,
  #[serde(flatten)]
  pub classification: Classification,
}

impl FlaggedCredential {
  fn new(credential: &TrackedCredential, classification: Classification) -> Self {
    Self {
      credential_id: credential.credential_id,
      subject_id: credential.subject_id.clone(),
      subject_name: credential.subject_name.clone(),
      subject_kind: credential.subject_kind,
      kind: credential.kind.clone(),
      expires_on: credential.expires_on.date(),
      number: credential.number.clone(),
      classification,
    }
  }
}

/// Why a credential was classified with less information than it carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
  MalformedDate,
}

/// A per-record problem found during aggregation. Diagnostics never abort a
/// report; the record is still counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub kind:          DiagnosticKind,
  pub credential_id: Uuid,
  pub subject_id:    String,
  pub raw:           String,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// The result of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSummary {
  pub reference_date:      NaiveDate,
  pub warning_window_days: u32,
  pub total:               usize,
  pub totals:              StatusCounts,
  pub by_kind:             BTreeMap<CredentialKind, StatusCounts>,
  /// Expired first, then expiring soon; most urgent first within each.
  pub flagged:             Vec<FlaggedCredential>,
  /// Credentials without a usable expiry date, by subject name.
  pub missing:             Vec<FlaggedCredential>,
  pub diagnostics:         Vec<Diagnostic>,
}

impl ComplianceSummary {
  pub fn count(&self, kind: &CredentialKind, status: ExpiryStatus) -> usize {
    self.by_kind.get(kind).map_or(0, |counts| counts.get(status))
  }
}

/// Classify every credential against `reference` and bucket the results.
///
/// Malformed expiry dates count as `missing` and produce a
/// [`DiagnosticKind::MalformedDate`] diagnostic; they never fail the call.
pub fn aggregate<'a, I>(
  credentials: I,
  reference: NaiveDate,
  warning_window_days: u32,
) -> ComplianceSummary
where
  I: IntoIterator<Item = &'a TrackedCredential>,
{
  let mut totals = StatusCounts::default();
  let mut by_kind: BTreeMap<CredentialKind, StatusCounts> = BTreeMap::new();
  let mut flagged = Vec::new();
  let mut missing = Vec::new();
  let mut diagnostics = Vec::new();

  for credential in credentials {
    if let ExpiryField::Malformed(raw) = &credential.expires_on {
      tracing::warn!(
        credential_id = %credential.credential_id,
        subject_id = %credential.subject_id,
        raw = %raw,
        "malformed expiry date; counting credential as missing"
      );
      diagnostics.push(Diagnostic {
        kind:          DiagnosticKind::MalformedDate,
        credential_id: credential.credential_id,
        subject_id:    credential.subject_id.clone(),
        raw:           raw.clone(),
      });
    }

    let classification =
      classify(credential.expires_on.date(), reference, warning_window_days);

    totals.record(classification.status);
    by_kind
      .entry(credential.kind.clone())
      .or_default()
      .record(classification.status);

    match classification.status {
      ExpiryStatus::Expired | ExpiryStatus::ExpiringSoon => {
        flagged.push(FlaggedCredential::new(credential, classification));
      }
      ExpiryStatus::Missing => {
        missing.push(FlaggedCredential::new(credential, classification));
      }
      ExpiryStatus::Active => {}
    }
  }

  flagged.sort_by(urgency);
  missing.sort_by(|a, b| {
    a.subject_name
      .cmp(&b.subject_name)
      .then_with(|| a.credential_id.cmp(&b.credential_id))
  });

  ComplianceSummary {
    reference_date: reference,
    warning_window_days,
    total: totals.total(),
    totals,
    by_kind,
    flagged,
    missing,
    diagnostics,
  }
}

fn urgency(a: &FlaggedCredential, b: &FlaggedCredential) -> Ordering {
  fn rank(status: ExpiryStatus) -> u8 {
    match status {
      ExpiryStatus::Expired => 0,
      ExpiryStatus::ExpiringSoon => 1,
      ExpiryStatus::Active | ExpiryStatus::Missing => 2,
    }
  }

  rank(a.classification.status)
    .cmp(&rank(b.classification.status))
    .then_with(|| {
      a.classification
        .days_remaining
        .cmp(&b.classification.days_remaining)
    })
    .then_with(|| a.subject_name.cmp(&b.subject_name))
    .then_with(|| a.credential_id.cmp(&b.credential_id))
}

//! Tracked credentials — the subject-owned documents whose expiry the
//! service watches (iqama, insurance, istimara, H2S cards, ...).
//!
//! Classification is never stored on a credential. It is derived from
//! `expires_on` every time a credential is read.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Well-known credential kind names. The set is open-ended; these only exist
/// so call sites do not spell them differently.
pub mod kinds {
  pub const IQAMA: &str = "iqama";
  pub const VISA: &str = "visa";
  pub const INSURANCE: &str = "insurance";
  pub const ISTIMARA: &str = "istimara";
  pub const TUV_CARD: &str = "tuv_card";
  pub const GPS: &str = "gps";
  pub const H2S_CARD: &str = "h2s_card";
  pub const COMMERCIAL_REGISTRATION: &str = "commercial_registration";
}

// ─── Subjects ────────────────────────────────────────────────────────────────

/// The class of entity that owns a credential.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
  Employee,
  Equipment,
  Company,
}

impl SubjectKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Employee => "employee",
      Self::Equipment => "equipment",
      Self::Company => "company",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "employee" => Some(Self::Employee),
      "equipment" => Some(Self::Equipment),
      "company" => Some(Self::Company),
      _ => None,
    }
  }
}

// ─── Credential kind ─────────────────────────────────────────────────────────

/// Open-ended credential tag, normalised to trimmed lowercase.
///
/// New kinds need no code change; see [`kinds`] for the ones in use today.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialKind(String);

impl CredentialKind {
  pub fn new(raw: impl AsRef<str>) -> Result<Self> {
    let normalised = raw.as_ref().trim().to_lowercase();
    if normalised.is_empty() {
      return Err(Error::InvalidCredential(
        "credential kind must not be empty".into(),
      ));
    }
    Ok(Self(normalised))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for CredentialKind {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<CredentialKind> for String {
  fn from(kind: CredentialKind) -> Self { kind.0 }
}

impl fmt::Display for CredentialKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Expiry field ────────────────────────────────────────────────────────────

/// The expiry date as it was supplied, before classification.
///
/// Text that does not parse is kept verbatim as [`ExpiryField::Malformed`] so
/// one bad record can be reported without failing a whole report. On the wire
/// it is a nullable string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ExpiryField {
  #[default]
  Missing,
  Date(NaiveDate),
  Malformed(String),
}

impl ExpiryField {
  /// Parse `YYYY-MM-DD` or an RFC 3339 timestamp. The time of day of a
  /// timestamp is dropped; blank text counts as missing.
  pub fn parse(raw: &str) -> Self {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Self::Missing;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
      return Self::Date(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
      return Self::Date(dt.date_naive());
    }
    Self::Malformed(raw.to_owned())
  }

  /// The usable date, if any. Malformed input yields `None`.
  pub fn date(&self) -> Option<NaiveDate> {
    match self {
      Self::Date(d) => Some(*d),
      Self::Missing | Self::Malformed(_) => None,
    }
  }

  pub fn is_malformed(&self) -> bool { matches!(self, Self::Malformed(_)) }
}

impl From<Option<String>> for ExpiryField {
  fn from(raw: Option<String>) -> Self {
    raw.as_deref().map(Self::parse).unwrap_or_default()
  }
}

impl From<ExpiryField> for Option<String> {
  fn from(field: ExpiryField) -> Self {
    match field {
      ExpiryField::Missing => None,
      ExpiryField::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
      ExpiryField::Malformed(raw) => Some(raw),
    }
  }
}

impl From<NaiveDate> for ExpiryField {
  fn from(date: NaiveDate) -> Self { Self::Date(date) }
}

// ─── Credential ──────────────────────────────────────────────────────────────

/// A credential as stored, one per (subject, kind) document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedCredential {
  pub credential_id: Uuid,
  /// Opaque id of the owning employee, equipment unit or company.
  pub subject_id:    String,
  pub subject_name:  String,
  pub subject_kind:  SubjectKind,
  pub kind:          CredentialKind,
  pub expires_on:    ExpiryField,
  /// Free-text document number; may be absent even when an expiry is known.
  pub number:        Option<String>,
  /// Sequential identifier, written at most once.
  pub serial:        Option<String>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::CredentialStore::add_credential`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCredential {
  pub subject_id:   String,
  pub subject_name: String,
  pub subject_kind: SubjectKind,
  pub kind:         CredentialKind,
  #[serde(default)]
  pub expires_on:   ExpiryField,
  #[serde(default)]
  pub number:       Option<String>,
}

impl NewCredential {
  pub fn new(
    subject_id: impl Into<String>,
    subject_name: impl Into<String>,
    subject_kind: SubjectKind,
    kind: CredentialKind,
  ) -> Self {
    Self {
      subject_id: subject_id.into(),
      subject_name: subject_name.into(),
      subject_kind,
      kind,
      expires_on: ExpiryField::Missing,
      number: None,
    }
  }

  pub fn expiring(mut self, expires_on: impl Into<ExpiryField>) -> Self {
    self.expires_on = expires_on.into();
    self
  }

  pub fn with_number(mut self, number: impl Into<String>) -> Self {
    self.number = Some(number.into());
    self
  }

  /// Reject inputs the store must never persist.
  pub fn validate(&self) -> Result<()> {
    if self.subject_id.trim().is_empty() {
      return Err(Error::InvalidCredential("subject_id must not be empty".into()));
    }
    if self.subject_name.trim().is_empty() {
      return Err(Error::InvalidCredential(
        "subject_name must not be empty".into(),
      ));
    }
    Ok(())
  }
}

/// Replacement expiry details for a renewed document. The serial is never
/// part of a renewal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Renewal {
  #[serde(default)]
  pub expires_on: ExpiryField,
  #[serde(default)]
  pub number:     Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn parses_plain_dates_and_timestamps() {
    assert_eq!(ExpiryField::parse("2025-03-01"), ExpiryField::Date(date(2025, 3, 1)));
    assert_eq!(
      ExpiryField::parse("2025-03-01T23:59:00+03:00"),
      ExpiryField::Date(date(2025, 3, 1))
    );
    assert_eq!(ExpiryField::parse("   "), ExpiryField::Missing);
  }

  #[test]
  fn unparseable_text_is_kept_verbatim() {
    let field = ExpiryField::parse("31/02/2025");
    assert_eq!(field, ExpiryField::Malformed("31/02/2025".into()));
    assert!(field.is_malformed());
    assert_eq!(field.date(), None);
  }

  #[test]
  fn expiry_field_is_a_nullable_string_on_the_wire() {
    let json = serde_json::to_string(&ExpiryField::Date(date(2024, 1, 9))).unwrap();
    assert_eq!(json, "\"2024-01-09\"");

    let missing: ExpiryField = serde_json::from_str("null").unwrap();
    assert_eq!(missing, ExpiryField::Missing);

    let bad: ExpiryField = serde_json::from_str("\"soon\"").unwrap();
    assert_eq!(bad, ExpiryField::Malformed("soon".into()));
  }

  #[test]
  fn credential_kind_is_normalised() {
    let kind = CredentialKind::new("  H2S_Card ").unwrap();
    assert_eq!(kind.as_str(), kinds::H2S_CARD);
    assert!(CredentialKind::new("  ").is_err());
    assert!(serde_json::from_str::<CredentialKind>("\"\"").is_err());
  }

  #[test]
  fn new_credential_requires_a_subject() {
    let kind = CredentialKind::new(kinds::IQAMA).unwrap();
    let ok = NewCredential::new("E-17", "Ahmed Saleh", SubjectKind::Employee, kind.clone());
    assert!(ok.validate().is_ok());

    let blank = NewCredential::new(" ", "Ahmed Saleh", SubjectKind::Employee, kind);
    assert!(matches!(blank.validate(), Err(Error::InvalidCredential(_))));
  }
}

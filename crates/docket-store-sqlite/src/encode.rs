//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, expiry dates as `YYYY-MM-DD`,
//! UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use docket_core::credential::{
  CredentialKind, ExpiryField, SubjectKind, TrackedCredential,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── SubjectKind ──────────────────────────────────────────────────────────────

pub fn encode_subject_kind(k: SubjectKind) -> &'static str { k.as_str() }

pub fn decode_subject_kind(s: &str) -> Result<SubjectKind> {
  SubjectKind::parse(s).ok_or_else(|| Error::UnknownValue {
    column: "subject_kind",
    value:  s.to_owned(),
  })
}

// ─── Expiry ───────────────────────────────────────────────────────────────────

/// Malformed input is stored verbatim so it can be reported on every read.
pub fn encode_expiry(field: &ExpiryField) -> Option<String> {
  Option::<String>::from(field.clone())
}

/// Never fails: text that no longer parses comes back as
/// [`ExpiryField::Malformed`].
pub fn decode_expiry(s: Option<String>) -> ExpiryField { ExpiryField::from(s) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawCredential::from_row`].
pub const CREDENTIAL_COLUMNS: &str = "credential_id, subject_id, subject_name, \
                                      subject_kind, kind, expires_on, number, \
                                      serial, created_at";

/// Raw strings read directly from a `credentials` row.
pub struct RawCredential {
  pub credential_id: String,
  pub subject_id:    String,
  pub subject_name:  String,
  pub subject_kind:  String,
  pub kind:          String,
  pub expires_on:    Option<String>,
  pub number:        Option<String>,
  pub serial:        Option<String>,
  pub created_at:    String,
}

impl RawCredential {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      credential_id: row.get(0)?,
      subject_id:    row.get(1)?,
      subject_name:  row.get(2)?,
      subject_kind:  row.get(3)?,
      kind:          row.get(4)?,
      expires_on:    row.get(5)?,
      number:        row.get(6)?,
      serial:        row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_credential(self) -> Result<TrackedCredential> {
    Ok(TrackedCredential {
      credential_id: decode_uuid(&self.credential_id)?,
      subject_id:    self.subject_id,
      subject_name:  self.subject_name,
      subject_kind:  decode_subject_kind(&self.subject_kind)?,
      kind:          CredentialKind::new(&self.kind)?,
      expires_on:    decode_expiry(self.expires_on),
      number:        self.number,
      serial:        self.serial,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

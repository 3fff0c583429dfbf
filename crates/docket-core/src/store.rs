//! The `CredentialStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `docket-store-sqlite`).
//! Higher layers (`docket-api`, `docket-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::credential::{
  CredentialKind, NewCredential, Renewal, SubjectKind, TrackedCredential,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`CredentialStore::list_credentials`]. Empty means "all".
#[derive(Debug, Clone, Default)]
pub struct CredentialQuery {
  pub subject_kind: Option<SubjectKind>,
  pub kind:         Option<CredentialKind>,
  pub subject_id:   Option<String>,
}

impl CredentialQuery {
  pub fn matches(&self, credential: &TrackedCredential) -> bool {
    self.subject_kind.is_none_or(|k| k == credential.subject_kind)
      && self.kind.as_ref().is_none_or(|k| *k == credential.kind)
      && self
        .subject_id
        .as_deref()
        .is_none_or(|id| id == credential.subject_id)
  }
}

// ─── Serial assignment ───────────────────────────────────────────────────────

/// Outcome of [`CredentialStore::assign_serial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialAssignment {
  /// The candidate was written to the credential.
  Assigned,
  /// The credential already carried a serial; it was left untouched.
  AlreadyAssigned(String),
  /// Another credential already holds the candidate serial.
  Conflict,
  NotFound,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a credential store backend.
///
/// Serials are write-once: [`CredentialStore::assign_serial`] must only
/// succeed on a credential that has none, and must refuse a serial already
/// held by another credential.
pub trait CredentialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new credential. `credential_id` and `created_at` are assigned
  /// by the store.
  fn add_credential(
    &self,
    input: NewCredential,
  ) -> impl Future<Output = Result<TrackedCredential, Self::Error>> + Send + '_;

  /// Retrieve a credential by id. Returns `None` if not found.
  fn get_credential(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TrackedCredential>, Self::Error>> + Send + '_;

  /// List credentials matching `query`, ordered by subject name.
  fn list_credentials<'a>(
    &'a self,
    query: &'a CredentialQuery,
  ) -> impl Future<Output = Result<Vec<TrackedCredential>, Self::Error>> + Send + 'a;

  /// Replace the expiry date and number of a credential. Returns `None` if
  /// not found.
  fn renew_credential(
    &self,
    id: Uuid,
    renewal: Renewal,
  ) -> impl Future<Output = Result<Option<TrackedCredential>, Self::Error>> + Send + '_;

  /// Every issued serial that starts with `prefix`, including ones written
  /// under another family whose prefix happens to overlap.
  fn issued_serials<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Write `serial` onto a credential that has none.
  fn assign_serial<'a>(
    &'a self,
    id: Uuid,
    prefix: &'a str,
    serial: &'a str,
  ) -> impl Future<Output = Result<SerialAssignment, Self::Error>> + Send + 'a;
}

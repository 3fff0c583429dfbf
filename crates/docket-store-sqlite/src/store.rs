//! [`SqliteStore`] — the SQLite implementation of [`CredentialStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension as _};
use uuid::Uuid;

use docket_core::{
  credential::{NewCredential, Renewal, TrackedCredential},
  store::{CredentialQuery, CredentialStore, SerialAssignment},
};

use crate::{
  Result,
  encode::{
    CREDENTIAL_COLUMNS, RawCredential, encode_dt, encode_expiry,
    encode_subject_kind, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Docket credential store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for SqliteStore {
  type Error = crate::Error;

  async fn add_credential(&self, input: NewCredential) -> Result<TrackedCredential> {
    input.validate()?;

    let credential = TrackedCredential {
      credential_id: Uuid::new_v4(),
      subject_id:    input.subject_id,
      subject_name:  input.subject_name,
      subject_kind:  input.subject_kind,
      kind:          input.kind,
      expires_on:    input.expires_on,
      number:        input.number,
      serial:        None,
      created_at:    Utc::now(),
    };

    let id_str       = encode_uuid(credential.credential_id);
    let subject_id   = credential.subject_id.clone();
    let subject_name = credential.subject_name.clone();
    let subject_kind = encode_subject_kind(credential.subject_kind).to_owned();
    let kind         = credential.kind.as_str().to_owned();
    let expires_on   = encode_expiry(&credential.expires_on);
    let number       = credential.number.clone();
    let at_str       = encode_dt(credential.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO credentials (
             credential_id, subject_id, subject_name, subject_kind, kind,
             expires_on, number, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            subject_id,
            subject_name,
            subject_kind,
            kind,
            expires_on,
            number,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(credential_id = %credential.credential_id, kind = %credential.kind, "credential added");
    Ok(credential)
  }

  async fn get_credential(&self, id: Uuid) -> Result<Option<TrackedCredential>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCredential> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE credential_id = ?1"
              ),
              rusqlite::params![id_str],
              RawCredential::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCredential::into_credential).transpose()
  }

  async fn list_credentials(
    &self,
    query: &CredentialQuery,
  ) -> Result<Vec<TrackedCredential>> {
    let subject_kind = query.subject_kind.map(encode_subject_kind).map(str::to_owned);
    let kind         = query.kind.as_ref().map(|k| k.as_str().to_owned());
    let subject_id   = query.subject_id.clone();

    let raws: Vec<RawCredential> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CREDENTIAL_COLUMNS}
           FROM credentials
           WHERE (?1 IS NULL OR subject_kind = ?1)
             AND (?2 IS NULL OR kind = ?2)
             AND (?3 IS NULL OR subject_id = ?3)
           ORDER BY subject_name, credential_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![subject_kind, kind, subject_id],
            RawCredential::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCredential::into_credential).collect()
  }

  async fn renew_credential(
    &self,
    id: Uuid,
    renewal: Renewal,
  ) -> Result<Option<TrackedCredential>> {
    let id_str     = encode_uuid(id);
    let expires_on = encode_expiry(&renewal.expires_on);
    let number     = renewal.number;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE credentials SET expires_on = ?1, number = ?2 WHERE credential_id = ?3",
          rusqlite::params![expires_on, number, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_credential(id).await
  }

  async fn issued_serials(&self, prefix: &str) -> Result<Vec<String>> {
    let prefix = prefix.to_owned();

    let serials = self
      .conn
      .call(move |conn| {
        // Every serial spelled with the prefix, whichever family wrote it:
        // the unique index spans all families, so the scan must too.
        let mut stmt = conn.prepare(
          "SELECT serial FROM credentials
           WHERE serial IS NOT NULL AND substr(serial, 1, length(?1)) = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![prefix], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(serials)
  }

  async fn assign_serial(
    &self,
    id: Uuid,
    prefix: &str,
    serial: &str,
  ) -> Result<SerialAssignment> {
    let id_str = encode_uuid(id);
    let prefix = prefix.to_owned();
    let serial = serial.to_owned();

    let outcome = self
      .conn
      .call(move |conn| {
        // Compare-and-set: only a credential without a serial is touched.
        let update = conn.execute(
          "UPDATE credentials SET serial = ?1, serial_family = ?2
           WHERE credential_id = ?3 AND serial IS NULL",
          rusqlite::params![serial, prefix, id_str],
        );
        match update {
          Ok(0) => {}
          Ok(_) => return Ok(SerialAssignment::Assigned),
          Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
          {
            return Ok(SerialAssignment::Conflict);
          }
          Err(e) => return Err(e.into()),
        }

        let current: Option<Option<String>> = conn
          .query_row(
            "SELECT serial FROM credentials WHERE credential_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;

        Ok(match current {
          None => SerialAssignment::NotFound,
          Some(Some(existing)) => SerialAssignment::AlreadyAssigned(existing),
          // Unreachable while serials are write-once; treat as a lost race.
          Some(None) => SerialAssignment::Conflict,
        })
      })
      .await?;

    Ok(outcome)
  }
}

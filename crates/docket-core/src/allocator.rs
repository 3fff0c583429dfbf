//! Write-once serial assignment on top of a [`CredentialStore`].
//!
//! The scan over issued serials decides the value; the store's uniqueness
//! guarantee decides safety. Within one process, allocations in the same
//! family are additionally queued behind a per-family lock so concurrent
//! requests do not all race for the same candidate.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use thiserror::Error;
use uuid::Uuid;

use crate::{
  Error,
  identifier::IdentifierFamily,
  store::{CredentialStore, SerialAssignment},
};

/// Attempts made before a run of conflicts is reported to the caller.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum AllocationError<E> {
  #[error(transparent)]
  Core(#[from] Error),

  #[error("store error: {0}")]
  Store(#[source] E),
}

pub struct SerialAllocator {
  max_attempts: u32,
  families:     Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for SerialAllocator {
  fn default() -> Self { Self::new(DEFAULT_MAX_ATTEMPTS) }
}

impl SerialAllocator {
  pub fn new(max_attempts: u32) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      families:     Mutex::new(HashMap::new()),
    }
  }

  pub fn max_attempts(&self) -> u32 { self.max_attempts }

  fn family_lock(&self, prefix: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
    families.entry(prefix.to_owned()).or_default().clone()
  }

  /// Return the credential's serial, allocating one in `family` if it has
  /// none yet.
  ///
  /// An existing serial is returned as-is without scanning the family, even
  /// if it belongs to a different family or would no longer be "next".
  pub async fn ensure<S>(
    &self,
    store: &S,
    credential_id: Uuid,
    family: &IdentifierFamily,
  ) -> Result<String, AllocationError<S::Error>>
  where
    S: CredentialStore,
  {
    if let Some(serial) = current_serial(store, credential_id).await? {
      return Ok(serial);
    }

    let lock = self.family_lock(family.prefix());
    let _guard = lock.lock().await;

    for attempt in 1..=self.max_attempts {
      // Someone may have assigned it while we waited for the lock.
      if let Some(serial) = current_serial(store, credential_id).await? {
        return Ok(serial);
      }

      let issued = store
        .issued_serials(family.prefix())
        .await
        .map_err(AllocationError::Store)?;
      let candidate = family.next_after(&issued)?;

      tracing::debug!(
        %credential_id,
        prefix = family.prefix(),
        %candidate,
        attempt,
        "attempting serial assignment"
      );

      match store
        .assign_serial(credential_id, family.prefix(), &candidate)
        .await
        .map_err(AllocationError::Store)?
      {
        SerialAssignment::Assigned => {
          tracing::info!(%credential_id, serial = %candidate, "serial assigned");
          return Ok(candidate);
        }
        SerialAssignment::AlreadyAssigned(existing) => return Ok(existing),
        SerialAssignment::NotFound => {
          return Err(Error::CredentialNotFound(credential_id).into());
        }
        SerialAssignment::Conflict => {
          tracing::warn!(
            %credential_id,
            %candidate,
            attempt,
            "serial already taken by a concurrent writer; rescanning"
          );
        }
      }
    }

    Err(
      Error::AllocationConflict {
        prefix:   family.prefix().to_owned(),
        attempts: self.max_attempts,
      }
      .into(),
    )
  }
}

async fn current_serial<S>(
  store: &S,
  credential_id: Uuid,
) -> Result<Option<String>, AllocationError<S::Error>>
where
  S: CredentialStore,
{
  let credential = store
    .get_credential(credential_id)
    .await
    .map_err(AllocationError::Store)?
    .ok_or(Error::CredentialNotFound(credential_id))?;
  Ok(credential.serial)
}

//! Error types for `docket-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("credential not found: {0}")]
  CredentialNotFound(Uuid),

  /// The next sequence value needs more digits than the family allows.
  #[error(
    "identifier overflow: {value} does not fit {width} digit(s) after prefix \
     {prefix:?}"
  )]
  IdentifierOverflow {
    prefix: String,
    width:  usize,
    /// The value that could not be represented.
    value:  u128,
  },

  #[error("allocation for family {prefix:?} gave up after {attempts} conflicting attempt(s)")]
  AllocationConflict { prefix: String, attempts: u32 },

  #[error("invalid identifier family: {0}")]
  InvalidFamily(String),

  #[error("invalid credential: {0}")]
  InvalidCredential(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

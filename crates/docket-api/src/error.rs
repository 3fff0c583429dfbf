//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use docket_core::{Error as CoreError, allocator::AllocationError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Serial allocation could not complete. The detail is logged, never sent.
  #[error("identifier allocation failed")]
  AllocationFailed,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }

  pub fn from_allocation<E>(err: AllocationError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match err {
      AllocationError::Core(CoreError::CredentialNotFound(id)) => {
        ApiError::NotFound(format!("credential {id} not found"))
      }
      AllocationError::Core(
        e @ (CoreError::IdentifierOverflow { .. }
        | CoreError::AllocationConflict { .. }),
      ) => {
        tracing::error!(error = %e, "serial allocation failed");
        ApiError::AllocationFailed
      }
      AllocationError::Core(e) => ApiError::store(e),
      AllocationError::Store(e) => ApiError::store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::AllocationFailed => (
        StatusCode::SERVICE_UNAVAILABLE,
        "could not assign an identifier, please try again".to_owned(),
      ),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

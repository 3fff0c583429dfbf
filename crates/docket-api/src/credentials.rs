//! Handlers for `/credentials` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/credentials` | Optional `subject_kind`, `kind`, `subject_id`, `as_of`, `window_days` |
//! | `POST` | `/credentials` | Body: [`NewCredential`]; returns 201 |
//! | `GET`  | `/credentials/{id}` | Assigns a serial on first read if the kind has a family |
//! | `PUT`  | `/credentials/{id}/expiry` | Body: [`Renewal`] |
//! | `POST` | `/credentials/{id}/serial` | Returns the (possibly new) serial |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use docket_core::{
  credential::{
    CredentialKind, NewCredential, Renewal, SubjectKind, TrackedCredential,
  },
  status::{Classification, classify},
  store::{CredentialQuery, CredentialStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// A credential with its classification as of the request.
#[derive(Debug, Serialize)]
pub struct CredentialView {
  #[serde(flatten)]
  pub credential:     TrackedCredential,
  pub classification: Classification,
}

impl CredentialView {
  fn new(credential: TrackedCredential, reference: NaiveDate, window: u32) -> Self {
    let classification = classify(credential.expires_on.date(), reference, window);
    Self { credential, classification }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub subject_kind: Option<SubjectKind>,
  pub kind:         Option<CredentialKind>,
  pub subject_id:   Option<String>,
  /// Reference date for classification. Defaults to today.
  pub as_of:        Option<NaiveDate>,
  pub window_days:  Option<u32>,
}

/// `GET /credentials[?subject_kind=...][&kind=...][&subject_id=...]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CredentialView>>, ApiError>
where
  S: CredentialStore,
{
  let query = CredentialQuery {
    subject_kind: params.subject_kind,
    kind:         params.kind,
    subject_id:   params.subject_id,
  };
  let reference = params.as_of.unwrap_or_else(|| state.clock.today());
  let window = params.window_days.unwrap_or(state.policy.warning_window_days);

  let credentials = state
    .store
    .list_credentials(&query)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(
    credentials
      .into_iter()
      .map(|c| CredentialView::new(c, reference, window))
      .collect(),
  ))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /credentials` — returns 201 + the stored credential.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewCredential>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CredentialStore,
{
  body
    .validate()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let credential = state
    .store
    .add_credential(body)
    .await
    .map_err(ApiError::store)?;
  let view = CredentialView::new(
    credential,
    state.clock.today(),
    state.policy.warning_window_days,
  );
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /credentials/{id}`
///
/// The first read of a credential whose kind has an identifier family
/// assigns its serial.
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CredentialView>, ApiError>
where
  S: CredentialStore,
{
  let mut credential = state
    .store
    .get_credential(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("credential {id} not found")))?;

  if credential.serial.is_none()
    && let Some(family) = state.policy.family_for(&credential.kind)
  {
    let serial = state
      .allocator
      .ensure(state.store.as_ref(), id, family)
      .await
      .map_err(ApiError::from_allocation)?;
    credential.serial = Some(serial);
  }

  Ok(Json(CredentialView::new(
    credential,
    state.clock.today(),
    state.policy.warning_window_days,
  )))
}

// ─── Renew ────────────────────────────────────────────────────────────────────

/// `PUT /credentials/{id}/expiry` — body: `{"expires_on":"2026-01-31","number":"..."}`
pub async fn renew<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<Renewal>,
) -> Result<Json<CredentialView>, ApiError>
where
  S: CredentialStore,
{
  let credential = state
    .store
    .renew_credential(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("credential {id} not found")))?;

  Ok(Json(CredentialView::new(
    credential,
    state.clock.today(),
    state.policy.warning_window_days,
  )))
}

// ─── Serial ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SerialBody {
  pub credential_id: Uuid,
  pub serial:        String,
}

/// `POST /credentials/{id}/serial` — idempotent.
pub async fn ensure_serial<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SerialBody>, ApiError>
where
  S: CredentialStore,
{
  let credential = state
    .store
    .get_credential(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("credential {id} not found")))?;

  let serial = match credential.serial {
    Some(serial) => serial,
    None => {
      let family = state.policy.family_for(&credential.kind).ok_or_else(|| {
        ApiError::BadRequest(format!(
          "credential kind {} has no identifier family",
          credential.kind
        ))
      })?;
      state
        .allocator
        .ensure(state.store.as_ref(), id, family)
        .await
        .map_err(ApiError::from_allocation)?
    }
  };

  Ok(Json(SerialBody { credential_id: id, serial }))
}

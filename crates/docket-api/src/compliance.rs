//! Handler for `GET /compliance`.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use docket_core::{
  credential::{CredentialKind, SubjectKind},
  store::{CredentialQuery, CredentialStore},
  summary::{ComplianceSummary, aggregate},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct SummaryParams {
  /// Reference date. Defaults to today.
  pub as_of:        Option<NaiveDate>,
  /// Overrides the configured warning window.
  pub window_days:  Option<u32>,
  pub subject_kind: Option<SubjectKind>,
  pub kind:         Option<CredentialKind>,
}

/// `GET /compliance[?as_of=YYYY-MM-DD][&window_days=N][&subject_kind=...][&kind=...]`
pub async fn summary<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<ComplianceSummary>, ApiError>
where
  S: CredentialStore,
{
  let query = CredentialQuery {
    subject_kind: params.subject_kind,
    kind:         params.kind,
    subject_id:   None,
  };
  let credentials = state
    .store
    .list_credentials(&query)
    .await
    .map_err(ApiError::store)?;

  let reference = params.as_of.unwrap_or_else(|| state.clock.today());
  let window = params.window_days.unwrap_or(state.policy.warning_window_days);

  Ok(Json(aggregate(&credentials, reference, window)))
}

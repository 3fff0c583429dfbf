//! Wiring for the Docket server binary: configuration and the top-level
//! router.

use std::{collections::BTreeMap, path::PathBuf};

use axum::{Router, routing::get};
use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use docket_api::{ApiState, Policy, api_router};
use docket_core::{
  credential::CredentialKind, identifier::IdentifierFamily,
  status::DEFAULT_WARNING_WINDOW_DAYS, store::CredentialStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `docket.toml` and
/// `DOCKET_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  #[serde(default = "default_warning_window")]
  pub warning_window_days: u32,
  /// Credential kind → identifier family.
  #[serde(default)]
  pub families:            BTreeMap<String, FamilyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FamilyConfig {
  pub prefix: String,
  pub width:  usize,
}

fn default_warning_window() -> u32 { DEFAULT_WARNING_WINDOW_DAYS }

impl ServerConfig {
  /// Read `path` (optional) overlaid with `DOCKET_*` environment variables.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path.into()).required(false));
    Self::from_builder(builder)
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .add_source(config::Environment::with_prefix("DOCKET"))
      .build()?
      .try_deserialize()
  }

  /// The handler policy described by this configuration.
  pub fn policy(&self) -> docket_core::Result<Policy> {
    let mut families = BTreeMap::new();
    for (key, family) in &self.families {
      let kind = CredentialKind::new(key)?;
      let family = IdentifierFamily::new(family.prefix.clone(), family.width)?;
      // `H2S_Card` and `h2s_card` name the same kind.
      if families.insert(kind.clone(), family).is_some() {
        return Err(docket_core::Error::InvalidFamily(format!(
          "credential kind {kind} is configured more than once"
        )));
      }
    }

    Ok(Policy { warning_window_days: self.warning_window_days, families })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API nested under `/api`, plus `/healthz`, with request tracing.
pub fn app<S>(state: ApiState<S>) -> Router
where
  S: CredentialStore + 'static,
{
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

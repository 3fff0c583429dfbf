//! JSON REST API for Docket.
//!
//! Exposes an axum [`Router`] backed by any
//! [`docket_core::store::CredentialStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", docket_api::api_router(state))
//! ```

pub mod compliance;
pub mod credentials;
pub mod error;

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use docket_core::{
  allocator::SerialAllocator,
  clock::Clock,
  credential::CredentialKind,
  identifier::IdentifierFamily,
  status::DEFAULT_WARNING_WINDOW_DAYS,
  store::CredentialStore,
};

pub use error::ApiError;

// ─── Policy ───────────────────────────────────────────────────────────────────

/// Business settings the handlers apply.
#[derive(Debug, Clone)]
pub struct Policy {
  /// Default warning window; a request may override it with `window_days`.
  pub warning_window_days: u32,
  /// Credential kinds that carry a sequential identifier, and its family.
  pub families:            BTreeMap<CredentialKind, IdentifierFamily>,
}

impl Default for Policy {
  fn default() -> Self {
    Self {
      warning_window_days: DEFAULT_WARNING_WINDOW_DAYS,
      families:            BTreeMap::new(),
    }
  }
}

impl Policy {
  pub fn family_for(&self, kind: &CredentialKind) -> Option<&IdentifierFamily> {
    self.families.get(kind)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub clock:     Arc<dyn Clock>,
  pub allocator: Arc<SerialAllocator>,
  pub policy:    Arc<Policy>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      clock:     self.clock.clone(),
      allocator: self.allocator.clone(),
      policy:    self.policy.clone(),
    }
  }
}

impl<S: CredentialStore> ApiState<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, policy: Policy) -> Self {
    Self {
      store,
      clock,
      allocator: Arc::new(SerialAllocator::default()),
      policy: Arc::new(policy),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: CredentialStore + 'static,
{
  Router::new()
    .route(
      "/credentials",
      get(credentials::list::<S>).post(credentials::create::<S>),
    )
    .route("/credentials/{id}", get(credentials::get_one::<S>))
    .route("/credentials/{id}/expiry", put(credentials::renew::<S>))
    .route("/credentials/{id}/serial", post(credentials::ensure_serial::<S>))
    .route("/compliance", get(compliance::summary::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;

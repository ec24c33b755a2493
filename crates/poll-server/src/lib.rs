//! HTTP server for the housing survey.
//!
//! Wires the [`poll_api`] router to a concrete store, admin authentication
//! and request tracing.

pub mod auth;
pub mod error;
pub mod settings;

pub use error::Error;
pub use settings::ServerConfig;

use std::sync::Arc;

use axum::{Router, middleware};
use poll_api::Survey;
use poll_core::store::ResponseStore;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state behind the router.
pub struct AppState<S> {
  pub survey: Arc<Survey<S>>,
  pub auth:   Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { survey: Arc::clone(&self.survey), auth: Arc::clone(&self.auth) }
  }
}

impl<S: ResponseStore> AppState<S> {
  /// Bind `store` to the locations, export settings and admin credentials
  /// of `config`.
  pub fn new(store: S, config: &ServerConfig) -> Result<Self, Error> {
    let survey = Survey::new(
      Arc::new(store),
      config.locations(),
      config.export_options()?,
    );
    Ok(Self {
      survey: Arc::new(survey),
      auth:   Arc::new(AuthConfig {
        username:      config.admin_username.clone(),
        password_hash: config.admin_password_hash.clone(),
      }),
    })
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ResponseStore + 'static,
{
  poll_api::api_router(state.survey)
    .layer(middleware::from_fn_with_state(state.auth, auth::authorize))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ───────────────────────────────────────────────────────

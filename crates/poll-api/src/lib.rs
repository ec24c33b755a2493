//! JSON/form HTTP API for the housing survey.
//!
//! Exposes the [`Survey`] facade and an axum [`Router`] over it, backed by
//! any [`poll_core::store::ResponseStore`]. Authentication, TLS and transport
//! are the caller's responsibility: an outer layer attaches a
//! [`poll_core::moderation::Authorization`] to each request, and requests
//! without one are anonymous.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(poll_api::api_router(survey.clone()))
//! ```

pub mod admin;
pub mod error;
pub mod public;
pub mod survey;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use poll_core::store::ResponseStore;

pub use error::ApiError;
pub use survey::{AdminCounts, Survey};

/// Build a fully-materialised API router for `survey`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S>(survey: Arc<Survey<S>>) -> Router<()>
where
  S: ResponseStore + 'static,
{
  Router::new()
    // Public
    .route("/locations", get(public::locations::<S>))
    .route("/submit", post(public::submit::<S>))
    .route("/results", get(public::results::<S>))
    // Admin
    .route("/admin/responses", get(admin::list::<S>))
    .route("/admin/counts", get(admin::counts::<S>))
    .route("/admin/responses/{id}/moderate", post(admin::moderate::<S>))
    .route("/admin/export/{format}", get(admin::export::<S>))
    .with_state(survey)
}

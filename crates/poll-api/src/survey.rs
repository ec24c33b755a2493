//! [`Survey`] — the operations the survey exposes, over any [`ResponseStore`].
//!
//! Every admin-facing method takes the caller's [`Authorization`] explicitly;
//! nothing here reads ambient session state.

use std::{collections::HashMap, sync::Arc};

use poll_core::{
  aggregate::{Results, aggregate},
  intake::parse_submission,
  location::Locations,
  moderation::{self, Authorization, ModerationOutcome},
  response::Response,
  schema::Shape,
  store::{ResponseFilter, ResponseStore},
};
use poll_export::{ExportFormat, ExportOptions, export};
use serde::Serialize;

use crate::error::ApiError;

/// Response counts shown on the admin view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminCounts {
  pub total:       u64,
  pub approved:    u64,
  pub unmoderated: u64,
}

/// A survey bound to one store, one set of locations and one export setup.
pub struct Survey<S> {
  store:     Arc<S>,
  locations: Locations,
  export:    ExportOptions,
}

impl<S: ResponseStore> Survey<S> {
  pub fn new(store: Arc<S>, locations: Locations, export: ExportOptions) -> Self {
    Self { store, locations, export }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn shape(&self) -> &Shape { self.store.shape() }

  /// The configured addresses, in display order.
  pub fn locations(&self) -> &Locations { &self.locations }

  // ─── Public ────────────────────────────────────────────────────────────────

  /// Validate and persist one submission.
  ///
  /// Nothing is written when validation fails. A store failure is returned
  /// as is.
  pub async fn submit(
    &self,
    fields: &HashMap<String, String>,
  ) -> Result<Response, ApiError> {
    let candidate = parse_submission(fields, self.shape(), &self.locations)?;
    match self.store.insert(candidate).await {
      Ok(response) => {
        tracing::info!(
          id = response.id,
          address = response.address.as_deref().unwrap_or(""),
          "response submitted"
        );
        Ok(response)
      }
      Err(e) => {
        let e = ApiError::store(e);
        tracing::warn!(error = %e, "failed to store response");
        Err(e)
      }
    }
  }

  /// Results over the responses that are public: approved ones, or all of
  /// them when the shape has no moderation.
  pub async fn public_results(&self) -> Result<Results, ApiError> {
    let filter = if self.shape().has_moderation() {
      ResponseFilter::ApprovedOnly
    } else {
      ResponseFilter::All
    };
    let responses = self.store.list(filter).await.map_err(ApiError::store)?;
    Ok(aggregate(&responses, self.shape(), &self.locations))
  }

  // ─── Admin ─────────────────────────────────────────────────────────────────

  pub async fn admin_list(
    &self,
    auth: &Authorization,
    filter: ResponseFilter,
  ) -> Result<Vec<Response>, ApiError> {
    auth.require_admin()?;
    self.store.list(filter).await.map_err(ApiError::store)
  }

  pub async fn admin_counts(
    &self,
    auth: &Authorization,
  ) -> Result<AdminCounts, ApiError> {
    auth.require_admin()?;
    let count = |filter: ResponseFilter| async move {
      self.store.count(filter).await.map_err(ApiError::store)
    };
    Ok(AdminCounts {
      total:       count(ResponseFilter::All).await?,
      approved:    count(ResponseFilter::ApprovedOnly).await?,
      unmoderated: count(ResponseFilter::UnmoderatedOnly).await?,
    })
  }

  pub async fn moderate(
    &self,
    auth: &Authorization,
    id: i64,
    action: &str,
  ) -> Result<ModerationOutcome, ApiError> {
    let actor = auth.require_admin()?;
    match moderation::moderate(self.store.as_ref(), id, action, actor).await {
      Ok(outcome) => {
        tracing::info!(id, action = %outcome.action, actor, "{}", outcome.message);
        Ok(outcome)
      }
      Err(e) => {
        tracing::warn!(id, action, actor, error = %e, "moderation failed");
        Err(e.into())
      }
    }
  }

  /// Every stored response, newest first, rendered in `format`.
  pub async fn export_all(
    &self,
    auth: &Authorization,
    format: ExportFormat,
  ) -> Result<Vec<u8>, ApiError> {
    let actor = auth.require_admin()?;
    let responses = self
      .store
      .list(ResponseFilter::All)
      .await
      .map_err(ApiError::store)?;
    let bytes = export(&responses, self.shape(), format, &self.export)?;
    tracing::info!(%format, records = responses.len(), actor, "exported responses");
    Ok(bytes)
  }
}

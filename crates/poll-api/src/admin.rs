//! Handlers for the administrative endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/responses` | Optional `?filter=all\|approved\|unmoderated` |
//! | `GET`  | `/admin/counts` | `{"total","approved","unmoderated"}` |
//! | `POST` | `/admin/responses/{id}/moderate` | Body: `{"action":"approve"}` |
//! | `GET`  | `/admin/export/{format}` | `csv` or `json`, served as a download |

use std::{convert::Infallible, sync::Arc};

use axum::{
  Json,
  extract::{FromRequestParts, Path, Query, State},
  http::{header, request::Parts},
  response::IntoResponse,
};
use poll_core::{
  moderation::{Authorization, ModerationOutcome},
  response::Response,
  store::{ResponseFilter, ResponseStore},
};
use poll_export::ExportFormat;
use serde::Deserialize;

use crate::{
  error::ApiError,
  survey::{AdminCounts, Survey},
};

// ─── Caller ──────────────────────────────────────────────────────────────────

/// The [`Authorization`] an outer layer attached to the request.
///
/// Requests that carry none are treated as anonymous.
pub struct Caller(pub Authorization);

impl<St: Send + Sync> FromRequestParts<St> for Caller {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    Ok(Caller(
      parts
        .extensions
        .get::<Authorization>()
        .cloned()
        .unwrap_or_else(Authorization::anonymous),
    ))
  }
}

// ─── List / counts ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub filter: Option<ResponseFilter>,
}

/// `GET /admin/responses[?filter=<filter>]`
pub async fn list<S>(
  State(survey): State<Arc<Survey<S>>>,
  Caller(auth): Caller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Response>>, ApiError>
where
  S: ResponseStore,
{
  let filter = params.filter.unwrap_or_default();
  Ok(Json(survey.admin_list(&auth, filter).await?))
}

/// `GET /admin/counts`
pub async fn counts<S>(
  State(survey): State<Arc<Survey<S>>>,
  Caller(auth): Caller,
) -> Result<Json<AdminCounts>, ApiError>
where
  S: ResponseStore,
{
  Ok(Json(survey.admin_counts(&auth).await?))
}

// ─── Moderate ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ModerateBody {
  pub action: String,
}

/// `POST /admin/responses/{id}/moderate` — body: `{"action":"approve"}`
pub async fn moderate<S>(
  State(survey): State<Arc<Survey<S>>>,
  Caller(auth): Caller,
  Path(id): Path<i64>,
  Json(body): Json<ModerateBody>,
) -> Result<Json<ModerationOutcome>, ApiError>
where
  S: ResponseStore,
{
  Ok(Json(survey.moderate(&auth, id, &body.action).await?))
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// `GET /admin/export/{format}`
pub async fn export<S>(
  State(survey): State<Arc<Survey<S>>>,
  Caller(auth): Caller,
  Path(format): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ResponseStore,
{
  auth.require_admin()?;
  let format: ExportFormat = format
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("unknown export format {format:?}")))?;
  let bytes = survey.export_all(&auth, format).await?;
  let disposition = format!("attachment; filename=\"{}\"", format.file_name());
  Ok((
    [
      (header::CONTENT_TYPE, format.content_type().to_owned()),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    bytes,
  ))
}

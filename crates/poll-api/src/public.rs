//! Handlers for the public endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/locations` | Configured addresses, in display order |
//! | `POST` | `/submit` | Form-encoded or JSON field map; 201 + `{"ok":true,"id":..}` |
//! | `GET`  | `/results` | Aggregated public results |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Form, Json,
  extract::{FromRequest, Request, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use poll_core::{aggregate::Results, location::Locations, store::ResponseStore};
use serde_json::{Value, json};

use crate::{error::ApiError, survey::Survey};

// ─── Locations ───────────────────────────────────────────────────────────────

/// `GET /locations`
pub async fn locations<S>(State(survey): State<Arc<Survey<S>>>) -> Json<Locations>
where
  S: ResponseStore,
{
  Json(survey.locations().clone())
}

// ─── Submit ──────────────────────────────────────────────────────────────────

fn field_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s),
    other => Some(other.to_string()),
  }
}

/// Read the submitted field map from a JSON object or a urlencoded form.
async fn read_fields(req: Request) -> Result<HashMap<String, String>, ApiError> {
  let is_json = req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|ct| ct.starts_with("application/json"));

  if is_json {
    let Json(body) = Json::<HashMap<String, Value>>::from_request(req, &())
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(
      body
        .into_iter()
        .filter_map(|(k, v)| field_text(v).map(|t| (k, t)))
        .collect(),
    )
  } else {
    let Form(fields) = Form::<HashMap<String, String>>::from_request(req, &())
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(fields)
  }
}

/// `POST /submit`
pub async fn submit<S>(
  State(survey): State<Arc<Survey<S>>>,
  req: Request,
) -> Result<impl IntoResponse, ApiError>
where
  S: ResponseStore,
{
  let fields = read_fields(req).await?;
  let response = survey.submit(&fields).await?;
  Ok((StatusCode::CREATED, Json(json!({ "ok": true, "id": response.id }))))
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// `GET /results`
pub async fn results<S>(
  State(survey): State<Arc<Survey<S>>>,
) -> Result<Json<Results>, ApiError>
where
  S: ResponseStore,
{
  Ok(Json(survey.public_results().await?))
}

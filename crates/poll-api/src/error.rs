//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by the survey facade or one of its handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] poll_core::Error),

  #[error("export failed: {0}")]
  Export(#[from] poll_export::Error),

  /// The request could not be read at all (bad body, unknown path segment).
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  /// Convert any store error through the core taxonomy.
  pub(crate) fn store<E: Into<poll_core::Error>>(e: E) -> Self {
    Self::Core(e.into())
  }

  pub fn status(&self) -> StatusCode {
    use poll_core::Error as E;
    match self {
      ApiError::Core(E::Validation { .. } | E::InvalidAction(_)) => {
        StatusCode::BAD_REQUEST
      }
      ApiError::Core(E::NotFound(_)) => StatusCode::NOT_FOUND,
      ApiError::Core(E::Unauthorized) => StatusCode::UNAUTHORIZED,
      ApiError::Core(E::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Core(E::Migration { .. } | E::InvalidShape(_))
      | ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let mut res =
      (status, Json(json!({ "ok": false, "error": self.to_string() })))
        .into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"poll\""),
      );
    }
    res
  }
}

//! Error types for `poll-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed, missing or out-of-range intake data.
  #[error("invalid field {field:?}: {reason}")]
  Validation { field: String, reason: String },

  #[error("response not found: {0}")]
  NotFound(i64),

  #[error("invalid moderation action: {0}")]
  InvalidAction(String),

  /// A schema reconciliation step failed; fatal at startup.
  #[error("schema migration failed at `{action}`: {reason}")]
  Migration { action: String, reason: String },

  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("administrator authorization required")]
  Unauthorized,

  #[error("invalid schema shape: {0}")]
  InvalidShape(String),
}

impl Error {
  pub(crate) fn validation(
    field: impl Into<String>,
    reason: impl Into<String>,
  ) -> Self {
    Self::Validation { field: field.into(), reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

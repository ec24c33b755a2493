//! Error type for `poll-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] poll_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row does not decode into a valid response.
  #[error("corrupt row: {0}")]
  Decode(String),

  #[error("response not found: {0}")]
  NotFound(i64),

  /// Reconciliation could not bring the table up to the active shape.
  #[error("schema migration `{action}` failed: {source}")]
  Migration {
    action: String,
    #[source]
    source: tokio_rusqlite::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for poll_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(e) => e,
      Error::NotFound(id) => Self::NotFound(id),
      Error::Migration { action, source } => {
        Self::Migration { action, reason: source.to_string() }
      }
      other => Self::StoreUnavailable(Box::new(other)),
    }
  }
}

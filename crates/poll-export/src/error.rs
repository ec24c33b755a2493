//! Error types for the export formatter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid UTC offset: {0} hours")]
  InvalidOffset(i32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

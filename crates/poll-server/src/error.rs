//! Error types for the survey server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("export settings: {0}")]
  Export(#[from] poll_export::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

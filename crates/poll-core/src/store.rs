//! The `ResponseStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `poll-store-sqlite`).
//! Higher layers (`poll-api`, `poll-server`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  response::{Moderation, NewResponse, Response},
  schema::Shape,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which responses a listing or count covers.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResponseFilter {
  #[default]
  All,
  #[serde(rename = "approved")]
  #[strum(serialize = "approved")]
  ApprovedOnly,
  #[serde(rename = "unmoderated")]
  #[strum(serialize = "unmoderated")]
  UnmoderatedOnly,
}

impl ResponseFilter {
  pub fn matches(self, response: &Response) -> bool {
    match self {
      Self::All => true,
      Self::ApprovedOnly => response.moderation.is_approved(),
      Self::UnmoderatedOnly => !response.moderation.is_approved(),
    }
  }
}

/// A field-level change to a stored response. Identity, submission time,
/// address and ratings are immutable, so only moderation can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseUpdate {
  Moderation(Moderation),
}

impl ResponseUpdate {
  pub fn apply(self, response: &mut Response) {
    match self {
      Self::Moderation(m) => response.moderation = m,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable survey response store.
///
/// A store is bound to one [`Shape`]; any schema reconciliation happens when
/// the store is opened, before the first operation can be issued. Every
/// operation touches at most one record and is individually atomic.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ResponseStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// The shape this store was reconciled to.
  fn shape(&self) -> &Shape;

  /// Validate and persist a new response. The store assigns the identity,
  /// sets `submitted_at` to now and starts the response unmoderated.
  fn insert(
    &self,
    candidate: NewResponse,
  ) -> impl Future<Output = Result<Response, Self::Error>> + Send + '_;

  /// Retrieve a response by id; errors with not-found if absent.
  fn get(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Response, Self::Error>> + Send + '_;

  /// List responses matching `filter`, newest submission first.
  fn list(
    &self,
    filter: ResponseFilter,
  ) -> impl Future<Output = Result<Vec<Response>, Self::Error>> + Send + '_;

  /// Apply `update` to one response and return the updated record.
  fn update(
    &self,
    id: i64,
    update: ResponseUpdate,
  ) -> impl Future<Output = Result<Response, Self::Error>> + Send + '_;

  /// Permanently remove a response.
  fn delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of responses matching `filter`.
  fn count(
    &self,
    filter: ResponseFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filter_names() {
    assert_eq!("approved".parse::<ResponseFilter>().unwrap(), ResponseFilter::ApprovedOnly);
    assert_eq!("all".parse::<ResponseFilter>().unwrap(), ResponseFilter::All);
    assert_eq!(ResponseFilter::UnmoderatedOnly.to_string(), "unmoderated");
    assert!("rejected".parse::<ResponseFilter>().is_err());
  }
}

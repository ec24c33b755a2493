//! Response types — one submitted survey entry and its moderation state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, schema::Shape};

// ─── Rating ──────────────────────────────────────────────────────────────────

/// A score in the closed range `1..=5`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: i64) -> Option<Self> {
    u8::try_from(value)
      .ok()
      .filter(|v| (Self::MIN..=Self::MAX).contains(v))
      .map(Self)
  }

  pub fn get(self) -> u8 { self.0 }
}

impl TryFrom<i64> for Rating {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> {
    Self::new(value).ok_or_else(|| {
      Error::validation(
        "rating",
        format!("{value} is outside {}..={}", Self::MIN, Self::MAX),
      )
    })
  }
}

impl From<Rating> for u8 {
  fn from(r: Rating) -> Self { r.0 }
}

// ─── Moderation ──────────────────────────────────────────────────────────────

/// The stored moderation status, without its side-effect fields.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModerationStatus {
  Unmoderated,
  Approved,
}

/// Moderation state of a response. The approval stamp exists only while the
/// response is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "moderation", rename_all = "snake_case")]
pub enum Moderation {
  Unmoderated,
  Approved {
    moderated_at: DateTime<Utc>,
    moderated_by: String,
  },
}

impl Moderation {
  pub fn status(&self) -> ModerationStatus {
    match self {
      Self::Unmoderated => ModerationStatus::Unmoderated,
      Self::Approved { .. } => ModerationStatus::Approved,
    }
  }

  pub fn is_approved(&self) -> bool { matches!(self, Self::Approved { .. }) }

  pub fn moderated_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Approved { moderated_at, .. } => Some(*moderated_at),
      Self::Unmoderated => None,
    }
  }

  pub fn moderated_by(&self) -> Option<&str> {
    match self {
      Self::Approved { moderated_by, .. } => Some(moderated_by),
      Self::Unmoderated => None,
    }
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// A persisted survey response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  /// Store-assigned; increases monotonically and is never reused.
  pub id:           i64,
  pub address:      Option<String>,
  /// Only categories of the generation the response was written under are
  /// present.
  pub ratings:      BTreeMap<String, Rating>,
  pub comment:      Option<String>,
  /// Set by the store at insert; never changes.
  pub submitted_at: DateTime<Utc>,
  #[serde(flatten)]
  pub moderation:   Moderation,
}

impl Response {
  pub fn rating(&self, category: &str) -> Option<Rating> {
    self.ratings.get(category).copied()
  }
}

// ─── NewResponse ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::ResponseStore::insert`].
/// Identity, `submitted_at` and moderation are always set by the store.
#[derive(Debug, Clone, Default)]
pub struct NewResponse {
  pub address: Option<String>,
  pub ratings: BTreeMap<String, Rating>,
  pub comment: Option<String>,
}

impl NewResponse {
  /// Check the candidate against `shape`: every category rated, no foreign
  /// categories, and an address when the shape has one.
  pub fn validate(&self, shape: &Shape) -> Result<()> {
    for category in shape.categories() {
      if !self.ratings.contains_key(category) {
        return Err(Error::validation(category, "rating is missing"));
      }
    }
    if let Some(unknown) = self
      .ratings
      .keys()
      .find(|k| !shape.categories().contains(*k))
    {
      return Err(Error::validation(unknown, "unknown rating category"));
    }

    match (&self.address, shape.has_address()) {
      (Some(a), true) if !a.trim().is_empty() => {}
      (_, true) => return Err(Error::validation("address", "address is empty")),
      (Some(_), false) => {
        return Err(Error::validation("address", "addresses are not collected"));
      }
      (None, false) => {}
    }

    if self.comment.is_some() && !shape.has_comment() {
      return Err(Error::validation("comment", "comments are not collected"));
    }

    Ok(())
  }
}

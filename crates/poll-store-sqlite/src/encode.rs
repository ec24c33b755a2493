//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that lexical order matches time order. Ratings
//! are stored as integers, one column per category.

use chrono::{
  DateTime, FixedOffset, NaiveDateTime, SecondsFormat, SubsecRound as _, Utc,
};
use poll_core::{
  response::{Moderation, ModerationStatus, Rating, Response},
  schema::{Shape, field},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Decode a naive `YYYY-MM-DD HH:MM:SS[.ffffff]` timestamp written as local
/// time at `offset`.
pub fn decode_legacy_dt(
  s: &str,
  offset: FixedOffset,
) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
  let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f"))?;
  let local = naive - offset;
  Ok(local.and_utc().trunc_subsecs(6))
}

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── ModerationStatus ────────────────────────────────────────────────────────

pub fn encode_status(status: ModerationStatus) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<ModerationStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown moderation status: {s:?}")))
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Quote a column name. Names come from a validated [`Shape`], so they never
/// contain quotes themselves.
pub fn quoted(name: &str) -> String { format!("\"{name}\"") }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `responses` row.
pub struct RawResponse {
  pub id:           i64,
  pub submitted_at: String,
  pub address:      Option<String>,
  pub ratings:      Vec<(String, Option<i64>)>,
  pub comment:      Option<String>,
  pub moderation:   Option<String>,
  pub moderated_at: Option<String>,
  pub moderated_by: Option<String>,
}

impl RawResponse {
  /// Read the columns `shape` defines; absent field groups stay `None`.
  pub fn from_row(row: &rusqlite::Row<'_>, shape: &Shape) -> rusqlite::Result<Self> {
    let optional_text = |enabled: bool, name: &str| -> rusqlite::Result<Option<String>> {
      if enabled { row.get(name) } else { Ok(None) }
    };

    let ratings = shape
      .categories()
      .iter()
      .map(|c| Ok((c.clone(), row.get::<_, Option<i64>>(c.as_str())?)))
      .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Self {
      id:           row.get(field::ID)?,
      submitted_at: row.get(field::SUBMITTED_AT)?,
      address:      optional_text(shape.has_address(), field::ADDRESS)?,
      ratings,
      comment:      optional_text(shape.has_comment(), field::COMMENT)?,
      moderation:   optional_text(shape.has_moderation(), field::MODERATION)?,
      moderated_at: optional_text(shape.has_moderation(), field::MODERATED_AT)?,
      moderated_by: optional_text(shape.has_moderation(), field::MODERATED_BY)?,
    })
  }

  pub fn into_response(self) -> Result<Response> {
    let id = self.id;

    let mut ratings = std::collections::BTreeMap::new();
    for (category, value) in self.ratings {
      let Some(value) = value else { continue };
      let rating = Rating::new(value).ok_or_else(|| {
        Error::Decode(format!(
          "response {id}: {category} rating {value} is out of range"
        ))
      })?;
      ratings.insert(category, rating);
    }

    let status = self
      .moderation
      .as_deref()
      .map(decode_status)
      .transpose()?
      .unwrap_or(ModerationStatus::Unmoderated);

    let moderation = match status {
      ModerationStatus::Unmoderated => Moderation::Unmoderated,
      ModerationStatus::Approved => {
        let (Some(at), Some(by)) = (self.moderated_at, self.moderated_by) else {
          return Err(Error::Decode(format!(
            "response {id}: approved without a moderation stamp"
          )));
        };
        Moderation::Approved { moderated_at: decode_dt(&at)?, moderated_by: by }
      }
    };

    Ok(Response {
      id,
      address: self.address,
      ratings,
      comment: self.comment,
      submitted_at: decode_dt(&self.submitted_at)?,
      moderation,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let later = decode_dt("2024-03-01T09:00:00.5Z").unwrap();
    let earlier = decode_dt("2024-03-01T09:00:00.123456Z").unwrap();
    assert!(later > earlier);
    assert!(encode_dt(later) > encode_dt(earlier));
    assert_eq!(encode_dt(later), "2024-03-01T09:00:00.500000Z");
  }

  #[test]
  fn encoded_now_roundtrips_exactly() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }

  #[test]
  fn approved_requires_stamp() {
    let raw = RawResponse {
      id:           7,
      submitted_at: "2024-03-01T09:00:00.000000Z".into(),
      address:      Some("A".into()),
      ratings:      vec![("elevator".into(), Some(4)), ("heating".into(), None)],
      comment:      None,
      moderation:   Some("approved".into()),
      moderated_at: None,
      moderated_by: None,
    };
    assert!(matches!(raw.into_response(), Err(Error::Decode(_))));
  }
}

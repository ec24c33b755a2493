//! Export formatter for survey responses.
//!
//! Renders a response set into CSV (semicolon-delimited, minimal quoting) or
//! JSON (full field names, nested ratings). Pure synchronous; no HTTP or
//! database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use poll_core::schema::Shape;
//! use poll_export::{ExportFormat, ExportOptions, export};
//!
//! let bytes = export(&[], &Shape::current(), ExportFormat::Csv, &ExportOptions::default()).unwrap();
//! assert!(bytes.starts_with(b"id;submitted_at"));
//! ```

pub mod error;
mod structured;
mod tabular;

use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use poll_core::{response::Response, schema::Shape};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use error::{Error, Result};

/// Timestamp layout used in every export. Downstream spreadsheets parse this
/// exact form, so it does not follow the storage format.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
  Csv,
  Json,
}

impl ExportFormat {
  pub fn content_type(self) -> &'static str {
    match self {
      Self::Csv => "text/csv; charset=utf-8",
      Self::Json => "application/json",
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::Csv => "csv",
      Self::Json => "json",
    }
  }

  /// Download file name, e.g. `survey_responses.csv`.
  pub fn file_name(self) -> String {
    format!("survey_responses.{}", self.extension())
  }
}

/// Rendering options shared by both formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
  /// Offset applied to stored UTC timestamps before formatting.
  pub offset: FixedOffset,
}

impl Default for ExportOptions {
  fn default() -> Self { Self { offset: Utc.fix() } }
}

impl ExportOptions {
  pub fn with_offset_hours(hours: i32) -> Result<Self> {
    hours
      .checked_mul(3600)
      .and_then(FixedOffset::east_opt)
      .map(|offset| Self { offset })
      .ok_or(Error::InvalidOffset(hours))
  }

  pub fn format_timestamp(&self, dt: DateTime<Utc>) -> String {
    dt.with_timezone(&self.offset)
      .format(TIMESTAMP_FORMAT)
      .to_string()
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Render `responses` in `format`, with one column or key per field of
/// `shape`. Records keep the order they are given in.
pub fn export(
  responses: &[Response],
  shape: &Shape,
  format: ExportFormat,
  options: &ExportOptions,
) -> Result<Vec<u8>> {
  match format {
    ExportFormat::Csv => tabular::write(responses, shape, options),
    ExportFormat::Json => structured::write(responses, shape, options),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::TimeZone as _;
  use poll_core::{
    response::{Moderation, Rating},
    schema::Generation,
  };

  use super::*;

  pub(crate) fn sample(id: i64, address: &str, moderation: Moderation) -> Response {
    let ratings: BTreeMap<String, Rating> = Shape::current()
      .categories()
      .iter()
      .filter(|c| c.as_str() != "heating")
      .map(|c| (c.clone(), Rating::new(4).unwrap()))
      .collect();
    Response {
      id,
      address: Some(address.to_owned()),
      ratings,
      comment: None,
      submitted_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap(),
      moderation,
    }
  }

  #[test]
  fn format_names() {
    assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    assert!("xlsx".parse::<ExportFormat>().is_err());
    assert_eq!(ExportFormat::Json.file_name(), "survey_responses.json");
  }

  #[test]
  fn timestamps_use_fixed_layout_and_offset() {
    let dt = Utc.with_ymd_and_hms(2024, 12, 31, 22, 30, 0).unwrap();
    assert_eq!(ExportOptions::default().format_timestamp(dt), "31.12.2024 22:30");
    let msk = ExportOptions::with_offset_hours(3).unwrap();
    assert_eq!(msk.format_timestamp(dt), "01.01.2025 01:30");
  }

  #[test]
  fn out_of_range_offset_is_rejected() {
    assert!(matches!(
      ExportOptions::with_offset_hours(30),
      Err(Error::InvalidOffset(30))
    ));
  }

  #[test]
  fn empty_set_exports_header_only() {
    let csv = export(&[], &Generation::V2.shape(), ExportFormat::Csv, &ExportOptions::default())
      .unwrap();
    assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 1);

    let json =
      export(&[], &Shape::current(), ExportFormat::Json, &ExportOptions::default()).unwrap();
    assert_eq!(json, b"[]");
  }
}

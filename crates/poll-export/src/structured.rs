//! JSON writer: an array of records with full field names and ratings nested
//! under `ratings`.

use poll_core::{
  response::{ModerationStatus, Response},
  schema::Shape,
};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{ExportOptions, Result};

/// Ratings keyed by category, serialised in shape order.
struct Ratings<'a>(Vec<(&'a str, Option<u8>)>);

impl Serialize for Ratings<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (category, rating) in &self.0 {
      map.serialize_entry(category, rating)?;
    }
    map.end()
  }
}

#[derive(Serialize)]
struct Record<'a> {
  id:           i64,
  submitted_at: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  address:      Option<&'a str>,
  /// Every active category; `null` where the response has no rating.
  ratings:      Ratings<'a>,
  #[serde(skip_serializing_if = "Option::is_none")]
  comment:      Option<Option<&'a str>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  moderation:   Option<ModerationStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  moderated_at: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  moderated_by: Option<Option<&'a str>>,
}

impl<'a> Record<'a> {
  /// Outer `Option`s mark field groups the shape does not carry; they are
  /// omitted. Inner `None`s are written as `null`.
  fn new(response: &'a Response, shape: &'a Shape, options: &ExportOptions) -> Self {
    let moderation = &response.moderation;
    let moderated = shape.has_moderation();
    Self {
      id:           response.id,
      submitted_at: options.format_timestamp(response.submitted_at),
      address:      response.address.as_deref().filter(|_| shape.has_address()),
      ratings:      Ratings(
        shape
          .categories()
          .iter()
          .map(|c| (c.as_str(), response.rating(c).map(|r| r.get())))
          .collect(),
      ),
      comment:      shape.has_comment().then(|| response.comment.as_deref()),
      moderation:   moderated.then(|| moderation.status()),
      moderated_at: moderated
        .then(|| moderation.moderated_at().map(|at| options.format_timestamp(at))),
      moderated_by: moderated.then(|| moderation.moderated_by()),
    }
  }
}

pub(crate) fn write(
  responses: &[Response],
  shape: &Shape,
  options: &ExportOptions,
) -> Result<Vec<u8>> {
  let records: Vec<Record<'_>> = responses
    .iter()
    .map(|r| Record::new(r, shape, options))
    .collect();
  Ok(serde_json::to_vec(&records)?)
}

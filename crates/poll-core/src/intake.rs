//! Intake — turning submitted form fields into a [`NewResponse`].
//!
//! Form values arrive as strings keyed by field name. Ratings are keyed by
//! category name, the address by `address`, the comment by `comment`.

use std::collections::{BTreeMap, HashMap};

use crate::{
  Error, Result,
  location::Locations,
  response::{NewResponse, Rating},
  schema::{Shape, field},
};

/// Parse and validate a submission against the active shape and the
/// configured locations.
pub fn parse_submission(
  fields: &HashMap<String, String>,
  shape: &Shape,
  locations: &Locations,
) -> Result<NewResponse> {
  let address = if shape.has_address() {
    let address = fields
      .get(field::ADDRESS)
      .map(|a| a.trim())
      .filter(|a| !a.is_empty())
      .ok_or_else(|| Error::validation(field::ADDRESS, "address is empty"))?;
    if !locations.contains(address) {
      return Err(Error::validation(
        field::ADDRESS,
        format!("{address:?} is not a surveyed location"),
      ));
    }
    Some(address.to_owned())
  } else {
    None
  };

  let mut ratings = BTreeMap::new();
  for category in shape.categories() {
    let raw = fields
      .get(category)
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
      .ok_or_else(|| Error::validation(category, "rating is missing"))?;
    let value: i64 = raw.parse().map_err(|_| {
      Error::validation(category, format!("{raw:?} is not a whole number"))
    })?;
    let rating = Rating::new(value).ok_or_else(|| {
      Error::validation(
        category,
        format!("{value} is outside {}..={}", Rating::MIN, Rating::MAX),
      )
    })?;
    ratings.insert(category.clone(), rating);
  }

  let comment = if shape.has_comment() {
    fields
      .get(field::COMMENT)
      .map(|c| c.trim())
      .filter(|c| !c.is_empty())
      .map(str::to_owned)
  } else {
    None
  };

  Ok(NewResponse { address, ratings, comment })
}

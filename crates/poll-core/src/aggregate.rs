//! Aggregation engine — the public results rollup.
//!
//! A pure, single-pass function of its input: the same responses always
//! produce the same [`Results`], independent of order or wall-clock time.

use serde::{
  Serialize, Serializer,
  ser::{SerializeMap, SerializeStruct},
};

use crate::{
  location::Locations,
  response::{Rating, Response},
  schema::Shape,
};

// ─── Distribution ────────────────────────────────────────────────────────────

/// Counts of each rating value for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Distribution([u64; Rating::MAX as usize]);

impl Distribution {
  fn record(&mut self, rating: Rating) {
    self.0[usize::from(rating.get() - Rating::MIN)] += 1;
  }

  /// Number of responses that gave `value`; zero outside `1..=5`.
  pub fn count(&self, value: u8) -> u64 {
    value
      .checked_sub(Rating::MIN)
      .and_then(|i| self.0.get(usize::from(i)))
      .copied()
      .unwrap_or(0)
  }

  /// Number of ratings recorded.
  pub fn total(&self) -> u64 { self.0.iter().sum() }

  /// Sum of all recorded ratings.
  pub fn sum(&self) -> u64 {
    (Rating::MIN..=Rating::MAX)
      .map(|k| u64::from(k) * self.count(k))
      .sum()
  }

  /// Weighted mean over `responses`, rounded to one decimal place; `0.0`
  /// when there are no responses.
  ///
  /// Responses without a rating for this category still count in the
  /// divisor. The quotient is rounded as a float with ties to even.
  pub fn average(&self, responses: u64) -> f64 {
    if responses == 0 {
      return 0.0;
    }
    let mean = self.sum() as f64 / responses as f64;
    format!("{mean:.1}").parse().unwrap_or(mean)
  }
}

impl Serialize for Distribution {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for k in Rating::MIN..=Rating::MAX {
      map.serialize_entry(&k.to_string(), &self.count(k))?;
    }
    map.end()
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
  pub category:     String,
  pub distribution: Distribution,
  pub average:      f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCount {
  pub location: String,
  pub votes:    u64,
}

/// Rollup over a set of responses.
///
/// Serialises as `{"total", "distribution", "averages", "address_counts"}`,
/// with map keys in category and location display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Results {
  pub total:          u64,
  /// One entry per active category, in shape order.
  pub categories:     Vec<CategoryStats>,
  /// One entry per configured location, in configuration order.
  pub address_counts: Vec<LocationCount>,
}

impl Results {
  pub fn category(&self, name: &str) -> Option<&CategoryStats> {
    self.categories.iter().find(|c| c.category == name)
  }

  pub fn votes(&self, location: &str) -> Option<u64> {
    self
      .address_counts
      .iter()
      .find(|l| l.location == location)
      .map(|l| l.votes)
  }
}

struct OrderedMap<'a, K, V>(&'a [(K, V)]);

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<'_, K, V> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (k, v) in self.0 {
      map.serialize_entry(k, v)?;
    }
    map.end()
  }
}

impl Serialize for Results {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let distribution: Vec<(&str, Distribution)> = self
      .categories
      .iter()
      .map(|c| (c.category.as_str(), c.distribution))
      .collect();
    let averages: Vec<(&str, f64)> = self
      .categories
      .iter()
      .map(|c| (c.category.as_str(), c.average))
      .collect();
    let address_counts: Vec<(&str, u64)> = self
      .address_counts
      .iter()
      .map(|l| (l.location.as_str(), l.votes))
      .collect();

    let mut s = serializer.serialize_struct("Results", 4)?;
    s.serialize_field("total", &self.total)?;
    s.serialize_field("distribution", &OrderedMap(&distribution))?;
    s.serialize_field("averages", &OrderedMap(&averages))?;
    s.serialize_field("address_counts", &OrderedMap(&address_counts))?;
    s.end()
  }
}

// ─── Rollup ──────────────────────────────────────────────────────────────────

/// Aggregate `responses` over the categories of `shape` and the configured
/// `locations`.
///
/// Callers pass only the responses that should be public. A response whose
/// address is not a configured location still counts toward `total` and the
/// histograms. A response written under an older generation simply has no
/// rating for newer categories.
pub fn aggregate<'a, I>(
  responses: I,
  shape: &Shape,
  locations: &Locations,
) -> Results
where
  I: IntoIterator<Item = &'a Response>,
{
  let categories = shape.categories();
  let mut histograms = vec![Distribution::default(); categories.len()];
  let mut votes = vec![0_u64; locations.len()];
  let mut total = 0_u64;

  for response in responses {
    total += 1;
    for (histogram, category) in histograms.iter_mut().zip(categories) {
      if let Some(rating) = response.rating(category) {
        histogram.record(rating);
      }
    }
    if let Some(i) = response
      .address
      .as_deref()
      .and_then(|a| locations.position(a))
    {
      votes[i] += 1;
    }
  }

  Results {
    total,
    categories: categories
      .iter()
      .zip(histograms)
      .map(|(category, distribution)| CategoryStats {
        category: category.clone(),
        distribution,
        average: distribution.average(total),
      })
      .collect(),
    address_counts: locations
      .iter()
      .zip(votes)
      .map(|(location, votes)| LocationCount {
        location: location.to_owned(),
        votes,
      })
      .collect(),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::Utc;

  use super::*;
  use crate::response::Moderation;

  const A: &str = "Udarnikov 36";
  const B: &str = "Korolevka 20";

  fn locations() -> Locations { Locations::new([A, B]) }

  fn response(id: i64, address: &str, elevator: i64, garbage: i64) -> Response {
    let mut ratings = BTreeMap::new();
    ratings.insert("elevator".to_owned(), Rating::new(elevator).unwrap());
    ratings.insert("garbage".to_owned(), Rating::new(garbage).unwrap());
    Response {
      id,
      address: Some(address.to_owned()),
      ratings,
      comment: None,
      submitted_at: Utc::now(),
      moderation: Moderation::Approved {
        moderated_at: Utc::now(),
        moderated_by: "admin".into(),
      },
    }
  }

  fn shape() -> Shape { Shape::new(["elevator", "garbage"]).unwrap() }

  #[test]
  fn elevator_example() {
    let responses = vec![response(1, A, 3, 1), response(2, A, 5, 1), response(3, B, 5, 2)];
    let results = aggregate(&responses, &shape(), &locations());

    let elevator = results.category("elevator").unwrap();
    assert_eq!(
      (1..=5).map(|k| elevator.distribution.count(k)).collect::<Vec<_>>(),
      [0, 0, 1, 0, 2]
    );
    assert_eq!(elevator.average, 4.3);
    assert_eq!(results.total, 3);
  }

  #[test]
  fn histograms_sum_to_total() {
    let responses: Vec<_> = (1..=20)
      .map(|i| response(i, A, i % 5 + 1, (i * 3) % 5 + 1))
      .collect();
    let results = aggregate(&responses, &shape(), &locations());
    for stats in &results.categories {
      assert_eq!(stats.distribution.total(), 20);
    }
  }

  #[test]
  fn empty_input_averages_zero() {
    let results = aggregate(&[], &shape(), &locations());
    assert_eq!(results.total, 0);
    assert!(results.categories.iter().all(|c| c.average == 0.0));
    assert_eq!(results.votes(A), Some(0));
    assert_eq!(results.votes(B), Some(0));
  }

  #[test]
  fn unknown_location_counts_everywhere_but_votes() {
    let responses = vec![response(1, A, 4, 4), response(2, "Demolished 1", 2, 2)];
    let results = aggregate(&responses, &shape(), &locations());
    assert_eq!(results.total, 2);
    assert_eq!(results.category("elevator").unwrap().distribution.total(), 2);
    assert_eq!(results.votes(A), Some(1));
    assert_eq!(results.votes(B), Some(0));
    assert_eq!(results.votes("Demolished 1"), None);
  }

  #[test]
  fn order_does_not_matter() {
    let mut responses = vec![response(1, A, 1, 5), response(2, B, 2, 4), response(3, B, 5, 5)];
    let forward = aggregate(&responses, &shape(), &locations());
    responses.reverse();
    let backward = aggregate(&responses, &shape(), &locations());
    assert_eq!(forward, backward);
    assert_eq!(
      serde_json::to_string(&forward).unwrap(),
      serde_json::to_string(&backward).unwrap()
    );
  }

  #[test]
  fn tie_rounds_to_even() {
    // 17 / 4 = 4.25
    let responses = vec![
      response(1, A, 4, 1),
      response(2, A, 4, 1),
      response(3, A, 4, 1),
      response(4, A, 5, 1),
    ];
    let results = aggregate(&responses, &shape(), &locations());
    assert_eq!(results.category("elevator").unwrap().average, 4.2);
    assert_eq!(results.category("garbage").unwrap().average, 1.0);
  }

  #[test]
  fn near_tie_rounds_the_float_quotient() {
    // 81 / 20 = 4.05, stored as 4.0499999…
    let responses: Vec<_> = (1..=20)
      .map(|i| response(i, A, if i == 1 { 5 } else { 4 }, 3))
      .collect();
    let results = aggregate(&responses, &shape(), &locations());
    assert_eq!(results.category("elevator").unwrap().distribution.sum(), 81);
    assert_eq!(results.category("elevator").unwrap().average, 4.0);
  }

  #[test]
  fn missing_ratings_still_count_in_divisor() {
    let mut legacy = response(2, B, 1, 1);
    legacy.ratings.remove("garbage");
    let responses = vec![response(1, A, 3, 5), legacy];
    let results = aggregate(&responses, &shape(), &locations());

    let garbage = results.category("garbage").unwrap();
    assert_eq!(results.total, 2);
    assert_eq!(garbage.distribution.total(), 1);
    assert_eq!(garbage.average, 2.5);
    assert_eq!(results.category("elevator").unwrap().average, 2.0);
  }

  #[test]
  fn serialises_in_display_order() {
    let responses = vec![response(1, B, 3, 3)];
    let json = serde_json::to_string(&aggregate(&responses, &shape(), &locations())).unwrap();
    assert_eq!(
      json,
      concat!(
        r#"{"total":1,"#,
        r#""distribution":{"elevator":{"1":0,"2":0,"3":1,"4":0,"5":0},"garbage":{"1":0,"2":0,"3":1,"4":0,"5":0}},"#,
        r#""averages":{"elevator":3.0,"garbage":3.0},"#,
        r#""address_counts":{"Udarnikov 36":0,"Korolevka 20":1}}"#,
      )
    );
  }
}

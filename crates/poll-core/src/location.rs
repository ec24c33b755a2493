//! The configured set of surveyed locations.

use serde::{Deserialize, Serialize};

/// Addresses a respondent may choose from, in display order.
///
/// Membership is exact string equality. The set is configuration: stored
/// responses may name a location that has since been removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locations(Vec<String>);

impl Locations {
  pub fn new<I, S>(locations: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut out: Vec<String> = Vec::new();
    for location in locations.into_iter().map(Into::into) {
      if !out.contains(&location) {
        out.push(location);
      }
    }
    Self(out)
  }

  pub fn contains(&self, address: &str) -> bool {
    self.0.iter().any(|l| l == address)
  }

  /// Position of `address` in display order.
  pub fn position(&self, address: &str) -> Option<usize> {
    self.0.iter().position(|l| l == address)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duplicates_collapse_keeping_first_position() {
    let locations = Locations::new(["B", "A", "B"]);
    assert_eq!(locations.iter().collect::<Vec<_>>(), ["B", "A"]);
    assert_eq!(locations.position("A"), Some(1));
  }

  #[test]
  fn membership_is_exact() {
    let locations = Locations::new(["Aviatorov 5B"]);
    assert!(locations.contains("Aviatorov 5B"));
    assert!(!locations.contains("aviatorov 5b"));
    assert!(!locations.contains("Aviatorov 5B "));
  }
}

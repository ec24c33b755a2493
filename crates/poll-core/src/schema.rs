//! Schema registry — the versioned shape of a survey response.
//!
//! A [`Shape`] names the rating categories and the optional field groups of
//! one schema generation. It is the single source of truth for intake
//! validation, aggregation and export. Persisted stores carry no version
//! number: [`Shape::reconcile`] compares the shape against the columns that
//! actually exist and yields the [`MigrationAction`]s needed to catch up.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, response::ModerationStatus};

/// Persisted field names shared by every generation.
pub mod field {
  pub const ID: &str = "id";
  pub const SUBMITTED_AT: &str = "submitted_at";
  pub const ADDRESS: &str = "address";
  pub const COMMENT: &str = "comment";
  pub const MODERATION: &str = "moderation";
  pub const MODERATED_AT: &str = "moderated_at";
  pub const MODERATED_BY: &str = "moderated_by";

  pub(crate) const RESERVED: &[&str] = &[
    ID,
    SUBMITTED_AT,
    ADDRESS,
    COMMENT,
    MODERATION,
    MODERATED_AT,
    MODERATED_BY,
  ];
}

// ─── Generations ─────────────────────────────────────────────────────────────

const CATEGORIES_V1: &[&str] =
  &["cleaning_inside", "lighting_inside", "elevator", "garbage"];

const CATEGORIES_V2: &[&str] = &[
  "cleaning_inside",
  "lighting_inside",
  "elevator",
  "snow_removal",
  "lighting_outside",
  "garbage",
];

const CATEGORIES_V4: &[&str] = &[
  "cleaning_inside",
  "lighting_inside",
  "elevator",
  "snow_removal",
  "lighting_outside",
  "garbage",
  "heating",
];

/// A released response shape.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Generation {
  /// Four building categories and a free-text comment.
  V1,
  /// Six categories (outdoor upkeep added) and a comment.
  V2,
  /// Six categories, a comment, and moderation.
  V3,
  /// Seven categories and moderation; the comment is gone.
  #[default]
  V4,
}

impl Generation {
  pub fn shape(self) -> Shape {
    let (categories, comment, moderation) = match self {
      Self::V1 => (CATEGORIES_V1, true, false),
      Self::V2 => (CATEGORIES_V2, true, false),
      Self::V3 => (CATEGORIES_V2, true, true),
      Self::V4 => (CATEGORIES_V4, false, true),
    };
    Shape {
      categories: categories.iter().map(|c| (*c).to_owned()).collect(),
      address: true,
      comment,
      moderation,
    }
  }
}

// ─── Shape ───────────────────────────────────────────────────────────────────

/// The categories and optional field groups a response carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shape {
  categories: Vec<String>,
  address:    bool,
  comment:    bool,
  moderation: bool,
}

impl Shape {
  /// The shape the running code expects by default.
  pub fn current() -> Self { Generation::default().shape() }

  /// A custom shape with the given categories, an address, and no comment or
  /// moderation fields.
  ///
  /// Category names become column names, so they must be lowercase
  /// identifiers, unique, and distinct from the fixed field names.
  pub fn new<I, C>(categories: I) -> Result<Self>
  where
    I: IntoIterator<Item = C>,
    C: Into<String>,
  {
    let categories: Vec<String> =
      categories.into_iter().map(Into::into).collect();
    if categories.is_empty() {
      return Err(Error::InvalidShape("no rating categories".into()));
    }

    let mut seen = BTreeSet::new();
    for category in &categories {
      if !is_identifier(category) {
        return Err(Error::InvalidShape(format!(
          "category {category:?} is not a lowercase identifier"
        )));
      }
      if field::RESERVED.contains(&category.as_str()) {
        return Err(Error::InvalidShape(format!(
          "category {category:?} collides with a fixed field"
        )));
      }
      if !seen.insert(category.as_str()) {
        return Err(Error::InvalidShape(format!(
          "category {category:?} is listed twice"
        )));
      }
    }

    Ok(Self { categories, address: true, comment: false, moderation: false })
  }

  pub fn with_address(mut self, enabled: bool) -> Self {
    self.address = enabled;
    self
  }

  pub fn with_comment(mut self, enabled: bool) -> Self {
    self.comment = enabled;
    self
  }

  pub fn with_moderation(mut self, enabled: bool) -> Self {
    self.moderation = enabled;
    self
  }

  /// Rating categories in display order.
  pub fn categories(&self) -> &[String] { &self.categories }

  pub fn has_address(&self) -> bool { self.address }

  pub fn has_comment(&self) -> bool { self.comment }

  pub fn has_moderation(&self) -> bool { self.moderation }

  /// Every persisted field of this shape, in column order.
  pub fn fields(&self) -> Vec<FieldSpec> {
    let mut fields = vec![
      FieldSpec::required(field::ID, FieldType::Integer),
      FieldSpec::required(field::SUBMITTED_AT, FieldType::Timestamp),
    ];
    if self.address {
      fields.push(FieldSpec::optional(field::ADDRESS, FieldType::Text));
    }
    // Ratings stay nullable in storage: rows written under an older
    // generation have no value for categories added later.
    fields.extend(
      self
        .categories
        .iter()
        .map(|c| FieldSpec::optional(c.clone(), FieldType::Integer)),
    );
    if self.comment {
      fields.push(FieldSpec::optional(field::COMMENT, FieldType::Text));
    }
    if self.moderation {
      fields.push(FieldSpec {
        name:     field::MODERATION.to_owned(),
        ty:       FieldType::Text,
        required: true,
        default:  Some(FieldDefault::Text(
          ModerationStatus::Unmoderated.to_string(),
        )),
      });
      fields
        .push(FieldSpec::optional(field::MODERATED_AT, FieldType::Timestamp));
      fields.push(FieldSpec::optional(field::MODERATED_BY, FieldType::Text));
    }
    fields
  }

  /// Derive the actions that bring a store with `existing` columns up to
  /// this shape.
  ///
  /// Additions come before removals and each group is sorted by name, so the
  /// result is deterministic. Once the actions are applied, reconciling again
  /// yields an empty list.
  pub fn reconcile(&self, existing: &BTreeSet<String>) -> Vec<MigrationAction> {
    let fields = self.fields();

    let mut additions: Vec<FieldSpec> = fields
      .iter()
      .filter(|f| !existing.contains(&f.name))
      .cloned()
      .collect();
    additions.sort_by(|a, b| a.name.cmp(&b.name));

    let wanted: BTreeSet<&str> =
      fields.iter().map(|f| f.name.as_str()).collect();
    let removals = existing
      .iter()
      .filter(|c| !wanted.contains(c.as_str()))
      .cloned()
      .map(MigrationAction::RemoveField);

    additions
      .into_iter()
      .map(MigrationAction::AddField)
      .chain(removals)
      .collect()
  }
}

fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
    && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// ─── Fields and actions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  Integer,
  Text,
  /// Stored as text; the encoding is the backend's concern.
  Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldDefault {
  Integer(i64),
  Text(String),
}

impl fmt::Display for FieldDefault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Integer(n) => write!(f, "{n}"),
      Self::Text(s) => write!(f, "{s:?}"),
    }
  }
}

/// One persisted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
  pub name:     String,
  pub ty:       FieldType,
  /// Whether the storage backend must reject a missing value.
  pub required: bool,
  /// Value given to existing rows when the field is added.
  pub default:  Option<FieldDefault>,
}

impl FieldSpec {
  fn required(name: impl Into<String>, ty: FieldType) -> Self {
    Self { name: name.into(), ty, required: true, default: None }
  }

  fn optional(name: impl Into<String>, ty: FieldType) -> Self {
    Self { name: name.into(), ty, required: false, default: None }
  }
}

/// A structural change to the persisted response collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationAction {
  AddField(FieldSpec),
  RemoveField(String),
}

impl MigrationAction {
  /// The field this action touches.
  pub fn field_name(&self) -> &str {
    match self {
      Self::AddField(spec) => &spec.name,
      Self::RemoveField(name) => name,
    }
  }
}

impl fmt::Display for MigrationAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::AddField(spec) => {
        write!(f, "add field {} ({:?}", spec.name, spec.ty)?;
        if spec.required {
          write!(f, ", required")?;
        }
        if let Some(default) = &spec.default {
          write!(f, ", default {default}")?;
        }
        write!(f, ")")
      }
      Self::RemoveField(name) => write!(f, "remove field {name}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn columns(shape: &Shape) -> BTreeSet<String> {
    shape.fields().into_iter().map(|f| f.name).collect()
  }

  fn apply(existing: &mut BTreeSet<String>, actions: &[MigrationAction]) {
    for action in actions {
      match action {
        MigrationAction::AddField(spec) => {
          existing.insert(spec.name.clone());
        }
        MigrationAction::RemoveField(name) => {
          existing.remove(name);
        }
      }
    }
  }

  #[test]
  fn category_counts_per_generation() {
    assert_eq!(Generation::V1.shape().categories().len(), 4);
    assert_eq!(Generation::V2.shape().categories().len(), 6);
    assert_eq!(Generation::V3.shape().categories().len(), 6);
    assert_eq!(Generation::V4.shape().categories().len(), 7);
    assert_eq!(Shape::current(), Generation::V4.shape());
  }

  #[test]
  fn reconcile_matching_store_is_empty() {
    let shape = Shape::current();
    assert!(shape.reconcile(&columns(&shape)).is_empty());
  }

  #[test]
  fn reconcile_orders_additions_before_removals() {
    let old = columns(&Generation::V2.shape());
    let actions = Shape::current().reconcile(&old);

    let names: Vec<String> = actions.iter().map(ToString::to_string).collect();
    assert_eq!(names, vec![
      "add field heating (Integer)",
      "add field moderated_at (Timestamp)",
      "add field moderated_by (Text)",
      "add field moderation (Text, required, default \"unmoderated\")",
      "remove field comment",
    ]);
  }

  #[test]
  fn reconcile_is_idempotent() {
    let mut existing = columns(&Generation::V1.shape());
    let shape = Shape::current();

    let first = shape.reconcile(&existing);
    assert!(!first.is_empty());
    apply(&mut existing, &first);

    assert!(shape.reconcile(&existing).is_empty());
    assert_eq!(existing, columns(&shape));
  }

  #[test]
  fn removals_are_alphabetical() {
    let mut existing = columns(&Shape::current());
    existing.insert("zeta".into());
    existing.insert("alpha".into());

    let actions = Shape::current().reconcile(&existing);
    assert_eq!(actions, vec![
      MigrationAction::RemoveField("alpha".into()),
      MigrationAction::RemoveField("zeta".into()),
    ]);
  }

  #[test]
  fn custom_shape_rejects_bad_categories() {
    assert!(Shape::new(Vec::<String>::new()).is_err());
    assert!(Shape::new(["Elevator"]).is_err());
    assert!(Shape::new(["elevator", "elevator"]).is_err());
    assert!(Shape::new(["comment"]).is_err());
    assert!(Shape::new(["drop table; --"]).is_err());

    let shape = Shape::new(["elevator", "roof_2"]).unwrap();
    assert_eq!(shape.categories(), &["elevator", "roof_2"]);
    assert!(shape.has_address());
    assert!(!shape.has_moderation());
  }

  #[test]
  fn generation_parses_from_config_string() {
    assert_eq!("v2".parse::<Generation>().unwrap(), Generation::V2);
    assert_eq!(Generation::V3.to_string(), "v3");
  }
}

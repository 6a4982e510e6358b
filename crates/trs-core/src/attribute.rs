//! Identifying attributes and the per-attribute comparison rules.
//!
//! There is no similarity scoring: after normalisation an attribute either
//! matches exactly or it does not.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use uuid::Uuid;

/// One attribute that may identify a person.
///
/// The declaration order is the rendering order used in review descriptions
/// (first, middle, last, date of birth, ...), so `Ord` is derived from it.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum IdentifyingAttribute {
  FirstName,
  MiddleName,
  LastName,
  DateOfBirth,
  NationalInsuranceNumber,
  Trn,
  IttProviderId,
}

impl IdentifyingAttribute {
  /// The attributes counted by the name/date-of-birth triad rule.
  pub const NAME_DOB: [Self; 4] = [
    Self::FirstName,
    Self::MiddleName,
    Self::LastName,
    Self::DateOfBirth,
  ];

  /// Identifiers specific enough to outrank a name/date-of-birth match.
  pub const STRONG: [Self; 2] = [Self::NationalInsuranceNumber, Self::Trn];

  /// Human-readable label, as used in review descriptions.
  pub fn label(self) -> &'static str {
    match self {
      Self::FirstName => "First name",
      Self::MiddleName => "Middle name",
      Self::LastName => "Last name",
      Self::DateOfBirth => "Date of birth",
      Self::NationalInsuranceNumber => "National Insurance number",
      Self::Trn => "TRN",
      Self::IttProviderId => "ITT provider",
    }
  }

  pub fn is_name(self) -> bool {
    matches!(self, Self::FirstName | Self::MiddleName | Self::LastName)
  }

  pub fn is_strong(self) -> bool { Self::STRONG.contains(&self) }
}

/// A borrowed, populated attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue<'a> {
  Text(&'a str),
  Date(NaiveDate),
  Id(Uuid),
}

impl fmt::Display for AttributeValue<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Text(s) => f.write_str(s.trim()),
      Self::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
      Self::Id(id) => id.fmt(f),
    }
  }
}

/// Normalise a textual value for comparison under `attribute`'s rule.
pub fn normalize(attribute: IdentifyingAttribute, value: &str) -> String {
  match attribute {
    IdentifyingAttribute::FirstName
    | IdentifyingAttribute::MiddleName
    | IdentifyingAttribute::LastName => value.trim().to_lowercase(),
    IdentifyingAttribute::NationalInsuranceNumber => value
      .chars()
      .filter(|c| !c.is_whitespace())
      .collect::<String>()
      .to_uppercase(),
    IdentifyingAttribute::DateOfBirth
    | IdentifyingAttribute::Trn
    | IdentifyingAttribute::IttProviderId => value.to_owned(),
  }
}

/// Whether a query value matches a candidate value for `attribute`.
///
/// Values of different shapes never match.
pub fn compare(
  attribute: IdentifyingAttribute,
  query: AttributeValue<'_>,
  candidate: AttributeValue<'_>,
) -> bool {
  match (query, candidate) {
    (AttributeValue::Text(q), AttributeValue::Text(c)) => {
      normalize(attribute, q) == normalize(attribute, c)
    }
    (AttributeValue::Date(q), AttributeValue::Date(c)) => q == c,
    (AttributeValue::Id(q), AttributeValue::Id(c)) => q == c,
    _ => false,
  }
}

//! Person records as seen by the matching engine.
//!
//! Both sides of a comparison share [`PersonAttributes`]: the caller's query
//! ([`MatchQuery`]) and every stored [`CandidateRecord`].

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::attribute::{AttributeValue, IdentifyingAttribute};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Stable identifier of a stored person record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

impl PersonId {
  pub fn random() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// The user or system process performing an action; recorded on audit fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

fn text(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|s| !s.trim().is_empty())
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Every identifying attribute the engine knows about. Absent values are never
/// compared; blank strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttributes {
  pub first_name:                Option<String>,
  pub middle_name:               Option<String>,
  pub last_name:                 Option<String>,
  pub date_of_birth:             Option<NaiveDate>,
  pub national_insurance_number: Option<String>,
  pub trn:                       Option<String>,
  pub itt_provider_id:           Option<Uuid>,
}

/// The query side of a match: whatever the caller knows about the subject.
pub type MatchQuery = PersonAttributes;

impl PersonAttributes {
  /// The populated value of `attribute`, or `None` when absent or blank.
  pub fn value(&self, attribute: IdentifyingAttribute) -> Option<AttributeValue<'_>> {
    match attribute {
      IdentifyingAttribute::FirstName => text(&self.first_name).map(AttributeValue::Text),
      IdentifyingAttribute::MiddleName => text(&self.middle_name).map(AttributeValue::Text),
      IdentifyingAttribute::LastName => text(&self.last_name).map(AttributeValue::Text),
      IdentifyingAttribute::DateOfBirth => self.date_of_birth.map(AttributeValue::Date),
      IdentifyingAttribute::NationalInsuranceNumber => {
        text(&self.national_insurance_number).map(AttributeValue::Text)
      }
      IdentifyingAttribute::Trn => text(&self.trn).map(AttributeValue::Text),
      IdentifyingAttribute::IttProviderId => self.itt_provider_id.map(AttributeValue::Id),
    }
  }

  /// Number of attributes carrying a value.
  pub fn populated_count(&self) -> usize {
    IdentifyingAttribute::iter()
      .filter(|a| self.value(*a).is_some())
      .count()
  }

  /// A copy of these attributes with the name fields replaced by `name`.
  pub fn with_name(&self, name: &NameSet) -> Self {
    Self {
      first_name: name.first_name.clone(),
      middle_name: name.middle_name.clone(),
      last_name: name.last_name.clone(),
      ..self.clone()
    }
  }
}

/// A first/middle/last name triple, used for previous names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSet {
  pub first_name:  Option<String>,
  pub middle_name: Option<String>,
  pub last_name:   Option<String>,
}

// ─── External keys ───────────────────────────────────────────────────────────

/// Correlation keys supplied by upstream training-data systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalKeys {
  pub hus_id:      Option<String>,
  pub slug_id:     Option<String>,
  pub itt_slug_id: Option<String>,
}

impl ExternalKeys {
  /// The populated keys, always in HusId, SlugId, ITT SlugId order.
  pub fn keys(&self) -> Vec<ExternalKey> {
    let populated = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
    [
      populated(&self.hus_id).map(ExternalKey::HusId),
      populated(&self.slug_id).map(ExternalKey::SlugId),
      populated(&self.itt_slug_id).map(ExternalKey::IttSlugId),
    ]
    .into_iter()
    .flatten()
    .collect()
  }
}

/// A single external key with its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExternalKey {
  HusId(String),
  SlugId(String),
  IttSlugId(String),
}

impl ExternalKey {
  /// Label used in review descriptions.
  pub fn label(&self) -> &'static str {
    match self {
      Self::HusId(_) => "HusId",
      Self::SlugId(_) => "SlugId",
      Self::IttSlugId(_) => "ITT SlugId",
    }
  }

  pub fn value(&self) -> &str {
    match self {
      Self::HusId(v) | Self::SlugId(v) | Self::IttSlugId(v) => v,
    }
  }
}

// ─── Candidate ───────────────────────────────────────────────────────────────

/// Risk signals carried by a stored record and surfaced on escalation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlags {
  pub has_active_sanctions: bool,
  pub has_qts_date:         bool,
  pub has_eyts_date:        bool,
}

impl RiskFlags {
  pub fn any(&self) -> bool {
    self.has_active_sanctions || self.has_qts_date || self.has_eyts_date
  }
}

/// A stored person's current values, as returned by a candidate store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
  pub person_id:      PersonId,
  /// Current values. `attributes.trn` is the allocated TRN, if any.
  pub attributes:     PersonAttributes,
  #[serde(default)]
  pub previous_names: Vec<NameSet>,
  #[serde(default)]
  pub external_keys:  ExternalKeys,
  #[serde(default)]
  pub risk_flags:     RiskFlags,
  pub created_at:     DateTime<Utc>,
}

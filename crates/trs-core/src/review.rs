//! Review artifacts (the human work items raised by escalations) and the
//! deterministic text that explains them to a case worker.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  attribute::IdentifyingAttribute,
  clock::Clock,
  person::{MatchQuery, PersonId, RiskFlags},
  resolution::{Decision, DigitInName, KeyCollision},
};

// ─── Category & priority ─────────────────────────────────────────────────────

/// Workflow that raised the task. Supplied by the caller, never computed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
pub enum TaskCategory {
  /// Trainee-teacher intake from the data management system.
  #[serde(rename = "DMSImportTrn")]
  #[strum(serialize = "DMSImportTrn")]
  DmsImportTrn,
  /// Overseas-qualified intake.
  #[serde(rename = "ApplyForQts")]
  #[strum(serialize = "ApplyForQts")]
  ApplyForQts,
}

impl TaskCategory {
  pub fn code(self) -> &'static str { self.into() }

  /// Parse a category code, rejecting unknown codes.
  pub fn from_code(code: &str) -> Result<Self> {
    Self::from_str(code).map_err(|_| Error::UnknownTaskCategory(code.to_owned()))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  #[default]
  Normal,
  High,
}

// ─── Artifact ────────────────────────────────────────────────────────────────

/// An immutable record of one escalation or flagged inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewArtifact {
  pub artifact_id: Uuid,
  /// The newly-processed subject.
  pub regarding:   PersonId,
  /// The matched candidate, when there is one.
  pub duplicate:   Option<PersonId>,
  pub category:    TaskCategory,
  pub priority:    TaskPriority,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

/// Build the review artifact a decision calls for, if any.
///
/// `Allocated` without an inconsistency needs no human attention.
pub fn compose(
  decision: &Decision,
  regarding: PersonId,
  category: TaskCategory,
  clock: &dyn Clock,
) -> Option<ReviewArtifact> {
  let (duplicate, priority, description) = match decision {
    Decision::Allocated { inconsistency: None } => return None,
    Decision::Allocated {
      inconsistency: Some(digits),
    } => (None, TaskPriority::Normal, digits.describe()),
    Decision::Escalated(escalation) => (
      escalation.candidate,
      escalation.priority,
      escalation.description.clone(),
    ),
  };

  Some(ReviewArtifact {
    artifact_id: Uuid::new_v4(),
    regarding,
    duplicate,
    category,
    priority,
    description,
    created_at: clock.now(),
  })
}

// ─── Description text ────────────────────────────────────────────────────────

/// The "Potential duplicate" clause: one line per matched attribute, in
/// first, middle, last, date of birth order, then one per colliding key.
///
/// Empty when nothing matched and nothing collided.
pub fn describe_matches(
  query: &MatchQuery,
  matched: &BTreeSet<IdentifyingAttribute>,
  collisions: &[KeyCollision],
) -> String {
  let mut lines = Vec::new();

  for attribute in matched {
    if *attribute == IdentifyingAttribute::IttProviderId {
      continue;
    }
    if let Some(value) = query.value(*attribute) {
      lines.push(format!("  - {}: '{value}'\n", attribute.label()));
    }
  }
  for collision in collisions {
    lines.push(format!(
      "  - {}: '{}'\n",
      collision.key.label(),
      collision.key.value()
    ));
  }

  if lines.is_empty() {
    return String::new();
  }
  format!("Potential duplicate\nMatched on\n{}", lines.concat())
}

/// The risk clause, e.g. `"Matched record has active sanctions & QTS date\n"`.
///
/// Flags always appear in sanctions, QTS, EYTS order.
pub fn describe_risk_flags(flags: &RiskFlags) -> Option<String> {
  let clauses: Vec<&str> = [
    (flags.has_active_sanctions, "active sanctions"),
    (flags.has_qts_date, "QTS date"),
    (flags.has_eyts_date, "EYTS date"),
  ]
  .into_iter()
  .filter_map(|(set, clause)| set.then_some(clause))
  .collect();

  (!clauses.is_empty()).then(|| format!("Matched record has {}\n", clauses.join(" & ")))
}

/// Full escalation description: matches, then risk flags, then digit check.
pub fn render_description(
  query: &MatchQuery,
  matched: &BTreeSet<IdentifyingAttribute>,
  collisions: &[KeyCollision],
  risk_flags: &RiskFlags,
  digit_in_name: Option<&DigitInName>,
) -> String {
  let mut description = describe_matches(query, matched, collisions);
  if let Some(risk) = describe_risk_flags(risk_flags) {
    description.push_str(&risk);
  }
  if let Some(digits) = digit_in_name {
    description.push_str(&digits.describe());
  }
  description
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone};
  use strum::IntoEnumIterator as _;

  use super::*;
  use crate::{
    clock::FixedClock,
    person::{ExternalKey, PersonAttributes},
    resolution::Escalation,
  };

  fn joe() -> MatchQuery {
    PersonAttributes {
      first_name: Some("Joe".into()),
      middle_name: Some("X".into()),
      last_name: Some("Bloggs".into()),
      date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 23),
      ..Default::default()
    }
  }

  #[test]
  fn matched_lines_follow_attribute_order() {
    let matched: BTreeSet<_> = [
      IdentifyingAttribute::DateOfBirth,
      IdentifyingAttribute::FirstName,
      IdentifyingAttribute::LastName,
      IdentifyingAttribute::MiddleName,
    ]
    .into_iter()
    .collect();
    assert_eq!(
      describe_matches(&joe(), &matched, &[]),
      "Potential duplicate\nMatched on\n  - First name: 'Joe'\n  - Middle name: 'X'\n  - Last name: 'Bloggs'\n  - Date of birth: '23/05/1990'\n"
    );
  }

  #[test]
  fn only_matched_attributes_get_lines() {
    let matched: BTreeSet<_> = [
      IdentifyingAttribute::FirstName,
      IdentifyingAttribute::DateOfBirth,
    ]
    .into_iter()
    .collect();
    assert_eq!(
      describe_matches(&joe(), &matched, &[]),
      "Potential duplicate\nMatched on\n  - First name: 'Joe'\n  - Date of birth: '23/05/1990'\n"
    );
  }

  #[test]
  fn collisions_are_listed_after_attributes() {
    let collisions = vec![
      KeyCollision {
        key:        ExternalKey::HusId("H1".into()),
        person_id:  PersonId::random(),
        risk_flags: RiskFlags::default(),
      },
      KeyCollision {
        key:        ExternalKey::IttSlugId("S9".into()),
        person_id:  PersonId::random(),
        risk_flags: RiskFlags::default(),
      },
    ];
    assert_eq!(
      describe_matches(&joe(), &BTreeSet::new(), &collisions),
      "Potential duplicate\nMatched on\n  - HusId: 'H1'\n  - ITT SlugId: 'S9'\n"
    );
  }

  #[test]
  fn risk_flags_join_in_fixed_order() {
    let all = RiskFlags {
      has_active_sanctions: true,
      has_qts_date:         true,
      has_eyts_date:        true,
    };
    assert_eq!(
      describe_risk_flags(&all).unwrap(),
      "Matched record has active sanctions & QTS date & EYTS date\n"
    );
    let qts_eyts = RiskFlags {
      has_active_sanctions: false,
      ..all
    };
    assert_eq!(
      describe_risk_flags(&qts_eyts).unwrap(),
      "Matched record has QTS date & EYTS date\n"
    );
    assert_eq!(describe_risk_flags(&RiskFlags::default()), None);
  }

  #[test]
  fn allocated_without_inconsistency_needs_no_artifact() {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    let decision = Decision::Allocated {
      inconsistency: None,
    };
    assert!(
      compose(&decision, PersonId::random(), TaskCategory::DmsImportTrn, &clock).is_none()
    );
  }

  #[test]
  fn escalation_artifact_carries_clock_time_and_references() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let clock = FixedClock(at);
    let regarding = PersonId::random();
    let duplicate = PersonId::random();
    let decision = Decision::Escalated(Escalation {
      candidate:          Some(duplicate),
      matched_attributes: BTreeSet::new(),
      collisions:         vec![],
      risk_flags:         RiskFlags::default(),
      digit_in_name:      None,
      priority:           TaskPriority::High,
      description:        "Potential duplicate\n".into(),
    });

    let artifact = compose(&decision, regarding, TaskCategory::ApplyForQts, &clock).unwrap();
    assert_eq!(artifact.regarding, regarding);
    assert_eq!(artifact.duplicate, Some(duplicate));
    assert_eq!(artifact.created_at, at);
    assert_eq!(artifact.priority, TaskPriority::High);
    assert_eq!(artifact.category.code(), "ApplyForQts");
  }

  #[test]
  fn category_codes_round_trip_and_unknown_is_rejected() {
    for category in TaskCategory::iter() {
      assert_eq!(TaskCategory::from_code(category.code()).unwrap(), category);
      assert_eq!(serde_json::to_value(category).unwrap(), category.code());
    }
    assert!(matches!(
      TaskCategory::from_code("Nope"),
      Err(Error::UnknownTaskCategory(_))
    ));
  }
}

//! The duplicate-resolution decision.
//!
//! Any qualifying candidate or colliding external key suspends allocation;
//! there is no automatic merge. Names containing digits never block
//! allocation on their own, but are always flagged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
  attribute::IdentifyingAttribute,
  person::{CandidateRecord, ExternalKey, MatchQuery, PersonId, RiskFlags},
  ranking::RankedMatch,
  review::{TaskPriority, render_description},
};

// ─── Orthogonal checks ───────────────────────────────────────────────────────

/// A supplied external key already held by a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCollision {
  pub key:        ExternalKey,
  pub person_id:  PersonId,
  pub risk_flags: RiskFlags,
}

impl KeyCollision {
  pub fn new(key: ExternalKey, holder: &CandidateRecord) -> Self {
    Self {
      key,
      person_id: holder.person_id,
      risk_flags: holder.risk_flags,
    }
  }
}

/// Which supplied name fields contain a digit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitInName {
  pub first_name:  bool,
  pub middle_name: bool,
  pub last_name:   bool,
}

impl DigitInName {
  /// `Some` when at least one supplied name contains a digit.
  pub fn check(query: &MatchQuery) -> Option<Self> {
    let has_digit =
      |v: &Option<String>| v.as_deref().is_some_and(|s| s.chars().any(|c| c.is_ascii_digit()));
    let flags = Self {
      first_name:  has_digit(&query.first_name),
      middle_name: has_digit(&query.middle_name),
      last_name:   has_digit(&query.last_name),
    };
    (flags.first_name || flags.middle_name || flags.last_name).then_some(flags)
  }

  /// e.g. `"First name and middle name contain a digit\n"`.
  pub fn describe(&self) -> String {
    let fields: Vec<&str> = [
      (self.first_name, "first name"),
      (self.middle_name, "middle name"),
      (self.last_name, "last name"),
    ]
    .into_iter()
    .filter_map(|(set, field)| set.then_some(field))
    .collect();

    let (subject, verb) = match fields.as_slice() {
      [] => return String::new(),
      [one] => ((*one).to_owned(), "contains"),
      [init @ .., last] => (format!("{} and {last}", init.join(", ")), "contain"),
    };
    format!("{} {verb} a digit\n", capitalize(&subject))
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// Everything a case worker needs to adjudicate a suspended allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
  /// The top-ranked candidate, or the holder of the first colliding key.
  pub candidate:          Option<PersonId>,
  pub matched_attributes: BTreeSet<IdentifyingAttribute>,
  pub collisions:         Vec<KeyCollision>,
  pub risk_flags:         RiskFlags,
  pub digit_in_name:      Option<DigitInName>,
  pub priority:           TaskPriority,
  pub description:        String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
  /// Nothing strong enough matched; a new identifier may be allocated.
  Allocated {
    /// Raised for review even though allocation proceeds.
    inconsistency: Option<DigitInName>,
  },
  /// Allocation is suspended pending human review.
  Escalated(Escalation),
}

impl Decision {
  pub fn is_escalated(&self) -> bool { matches!(self, Self::Escalated(_)) }
}

/// Turn ranked matches and collision checks into a single decision.
pub fn decide(
  query: &MatchQuery,
  matches: &[RankedMatch],
  collisions: Vec<KeyCollision>,
) -> Decision {
  let digit_in_name = DigitInName::check(query);

  let (candidate, matched_attributes, risk_flags) = match (matches.first(), collisions.first()) {
    (Some(top), _) => (
      Some(top.candidate.person_id),
      top.result.matched_attributes.clone(),
      top.candidate.risk_flags,
    ),
    (None, Some(collision)) => (
      Some(collision.person_id),
      BTreeSet::new(),
      collision.risk_flags,
    ),
    (None, None) => {
      return Decision::Allocated {
        inconsistency: digit_in_name,
      };
    }
  };

  let priority = if risk_flags.has_active_sanctions {
    TaskPriority::High
  } else {
    TaskPriority::Normal
  };
  let description = render_description(
    query,
    &matched_attributes,
    &collisions,
    &risk_flags,
    digit_in_name.as_ref(),
  );

  Decision::Escalated(Escalation {
    candidate,
    matched_attributes,
    collisions,
    risk_flags,
    digit_in_name,
    priority,
    description,
  })
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone, Utc};

  use super::*;
  use crate::{
    person::PersonAttributes,
    ranking::find_matches,
    threshold::ThresholdPolicy,
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

  fn stored(attributes: PersonAttributes, risk_flags: RiskFlags) -> CandidateRecord {
    CandidateRecord {
      person_id: PersonId::random(),
      attributes,
      previous_names: vec![],
      external_keys: Default::default(),
      risk_flags,
      created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn names(first: Option<&str>, middle: Option<&str>, last: Option<&str>) -> MatchQuery {
    PersonAttributes {
      first_name: first.map(Into::into),
      middle_name: middle.map(Into::into),
      last_name: last.map(Into::into),
      ..Default::default()
    }
  }

  #[test]
  fn no_matches_allocates() {
    assert_eq!(
      decide(&joe(), &[], vec![]),
      Decision::Allocated {
        inconsistency: None
      }
    );
  }

  #[test]
  fn identical_candidate_escalates_with_full_description() {
    let candidate = stored(joe(), RiskFlags::default());
    let matches = find_matches(&joe(), &[candidate.clone()], ThresholdPolicy::TrnRequest);

    let Decision::Escalated(escalation) = decide(&joe(), &matches, vec![]) else {
      panic!("expected escalation");
    };
    assert_eq!(escalation.candidate, Some(candidate.person_id));
    assert_eq!(
      escalation.matched_attributes.iter().copied().collect::<Vec<_>>(),
      IdentifyingAttribute::NAME_DOB
    );
    assert_eq!(escalation.priority, TaskPriority::Normal);
    assert_eq!(
      escalation.description,
      "Potential duplicate\nMatched on\n  - First name: 'Joe'\n  - Middle name: 'X'\n  - Last name: 'Bloggs'\n  - Date of birth: '23/05/1990'\n"
    );
  }

  #[test]
  fn sanctions_and_qts_are_appended_and_raise_priority() {
    let candidate = stored(
      joe(),
      RiskFlags {
        has_active_sanctions: true,
        has_qts_date:         true,
        has_eyts_date:        false,
      },
    );
    let matches = find_matches(&joe(), &[candidate], ThresholdPolicy::TrnRequest);

    let Decision::Escalated(escalation) = decide(&joe(), &matches, vec![]) else {
      panic!("expected escalation");
    };
    assert_eq!(escalation.priority, TaskPriority::High);
    assert!(
      escalation
        .description
        .ends_with("  - Date of birth: '23/05/1990'\nMatched record has active sanctions & QTS date\n")
    );
  }

  #[test]
  fn hus_id_collision_escalates_without_attribute_matches() {
    let holder = stored(names(Some("Someone"), None, Some("Else")), RiskFlags::default());
    let collision = KeyCollision::new(ExternalKey::HusId("1234567890".into()), &holder);

    let Decision::Escalated(escalation) = decide(&joe(), &[], vec![collision]) else {
      panic!("expected escalation");
    };
    assert_eq!(escalation.candidate, Some(holder.person_id));
    assert!(escalation.matched_attributes.is_empty());
    assert!(escalation.description.contains("- HusId: '1234567890'"));
  }

  #[test]
  fn digit_in_name_alone_allocates_with_inconsistency() {
    let query = names(Some("J0e"), None, Some("Bloggs"));
    let decision = decide(&query, &[], vec![]);
    assert_eq!(
      decision,
      Decision::Allocated {
        inconsistency: Some(DigitInName {
          first_name:  true,
          middle_name: false,
          last_name:   false,
        })
      }
    );
  }

  #[test]
  fn digit_in_name_is_appended_to_escalations() {
    let mut query = joe();
    query.middle_name = Some("X2".into());
    let candidate = stored(joe(), RiskFlags::default());
    let matches = find_matches(&query, &[candidate], ThresholdPolicy::TrnRequest);

    let Decision::Escalated(escalation) = decide(&query, &matches, vec![]) else {
      panic!("expected escalation");
    };
    assert!(escalation.description.ends_with("Middle name contains a digit\n"));
  }

  #[test]
  fn digit_phrasing_scales_with_field_count() {
    let describe = |first, middle, last| {
      DigitInName::check(&names(first, middle, last))
        .map(|d| d.describe())
        .unwrap_or_default()
    };
    assert_eq!(describe(Some("A1"), None, None), "First name contains a digit\n");
    assert_eq!(describe(None, None, Some("B2")), "Last name contains a digit\n");
    assert_eq!(
      describe(Some("A1"), Some("M1"), None),
      "First name and middle name contain a digit\n"
    );
    assert_eq!(
      describe(None, Some("M1"), Some("L1")),
      "Middle name and last name contain a digit\n"
    );
    assert_eq!(
      describe(Some("A1"), Some("M1"), Some("L1")),
      "First name, middle name and last name contain a digit\n"
    );
    assert_eq!(describe(Some("Ann"), Some("Marie"), Some("Lee")), "");
  }
}

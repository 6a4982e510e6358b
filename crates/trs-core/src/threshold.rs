//! Sufficiency rules deciding whether a match result counts as "found".
//!
//! The rules are attribute-count based, never weighted: which attributes
//! matched does not matter beyond the groups they fall into.

use serde::{Deserialize, Serialize};

use crate::{attribute::IdentifyingAttribute, scoring::MatchResult};

/// Minimum matching attributes out of first, middle, last name and DOB.
pub const MIN_NAME_DOB_MATCHES: usize = 3;

/// Minimum matching groups out of name pair, DOB, NINO and ITT provider.
pub const MIN_IDENTIFIER_GROUPS: usize = 3;

/// Which set of sufficiency rules applies to a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
  /// TRN allocation: the name/DOB triad rule, or a strong identifier backed by
  /// at least one other matching attribute.
  #[default]
  TrnRequest,
  /// Trainee onboarding: at least three of the four identifier groups.
  FindTeachers,
}

/// The rule that made a result qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Qualification {
  NameDobTriad { matched: usize },
  StrongIdentifier { attribute: IdentifyingAttribute },
  IdentifierGroups { matched: usize },
}

impl ThresholdPolicy {
  /// `Some` when `result` is strong enough to count as a found match.
  pub fn evaluate(self, result: &MatchResult) -> Option<Qualification> {
    match self {
      Self::TrnRequest => {
        let matched = result.name_dob_count();
        if matched >= MIN_NAME_DOB_MATCHES {
          return Some(Qualification::NameDobTriad { matched });
        }
        result
          .strong_identifier()
          .filter(|_| result.matched_attributes.len() >= 2)
          .map(|attribute| Qualification::StrongIdentifier { attribute })
      }
      Self::FindTeachers => {
        let matched = identifier_groups(result);
        (matched >= MIN_IDENTIFIER_GROUPS)
          .then_some(Qualification::IdentifierGroups { matched })
      }
    }
  }
}

/// Count of independent identifier groups matched: the name pair (first and
/// last together), date of birth, NINO and ITT provider.
pub fn identifier_groups(result: &MatchResult) -> usize {
  use crate::attribute::IdentifyingAttribute::*;
  [
    result.has(FirstName) && result.has(LastName),
    result.has(DateOfBirth),
    result.has(NationalInsuranceNumber),
    result.has(IttProviderId),
  ]
  .into_iter()
  .filter(|g| *g)
  .count()
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use super::*;
  use crate::person::PersonId;

  fn result(attrs: &[IdentifyingAttribute]) -> MatchResult {
    MatchResult {
      candidate_id: PersonId::random(),
      matched_attributes: attrs.iter().copied().collect::<BTreeSet<_>>(),
      matched_previous_name: false,
    }
  }

  use crate::attribute::IdentifyingAttribute::*;

  #[test]
  fn two_name_dob_matches_never_qualify() {
    for pair in [
      [FirstName, LastName],
      [FirstName, DateOfBirth],
      [MiddleName, LastName],
      [LastName, DateOfBirth],
    ] {
      assert_eq!(ThresholdPolicy::TrnRequest.evaluate(&result(&pair)), None);
    }
  }

  #[test]
  fn three_or_four_name_dob_matches_qualify() {
    assert_eq!(
      ThresholdPolicy::TrnRequest.evaluate(&result(&[FirstName, LastName, DateOfBirth])),
      Some(Qualification::NameDobTriad { matched: 3 })
    );
    assert_eq!(
      ThresholdPolicy::TrnRequest.evaluate(&result(&[
        FirstName,
        MiddleName,
        LastName,
        DateOfBirth
      ])),
      Some(Qualification::NameDobTriad { matched: 4 })
    );
  }

  #[test]
  fn nino_alone_does_not_qualify() {
    assert_eq!(
      ThresholdPolicy::TrnRequest.evaluate(&result(&[NationalInsuranceNumber])),
      None
    );
  }

  #[test]
  fn nino_with_another_attribute_qualifies() {
    assert_eq!(
      ThresholdPolicy::TrnRequest.evaluate(&result(&[LastName, NationalInsuranceNumber])),
      Some(Qualification::StrongIdentifier {
        attribute: NationalInsuranceNumber
      })
    );
  }

  #[test]
  fn itt_provider_alone_is_not_strong() {
    assert_eq!(
      ThresholdPolicy::TrnRequest.evaluate(&result(&[FirstName, IttProviderId])),
      None
    );
  }

  #[test]
  fn find_teachers_needs_three_groups() {
    let policy = ThresholdPolicy::FindTeachers;
    // Name pair + DOB only: two groups.
    assert_eq!(policy.evaluate(&result(&[FirstName, LastName, DateOfBirth])), None);
    // First name alone does not complete the name pair.
    assert_eq!(
      policy.evaluate(&result(&[FirstName, DateOfBirth, NationalInsuranceNumber])),
      None
    );
    assert_eq!(
      policy.evaluate(&result(&[DateOfBirth, NationalInsuranceNumber, IttProviderId])),
      Some(Qualification::IdentifierGroups { matched: 3 })
    );
    assert_eq!(
      policy.evaluate(&result(&[
        FirstName,
        LastName,
        DateOfBirth,
        NationalInsuranceNumber,
        IttProviderId
      ])),
      Some(Qualification::IdentifierGroups { matched: 4 })
    );
  }
}

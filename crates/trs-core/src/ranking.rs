//! Ordering of qualifying candidates by match strength.
//!
//! Ranking only affects presentation order: every qualifying candidate is
//! returned.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
  person::{CandidateRecord, MatchQuery},
  scoring::{MatchResult, score},
  threshold::{Qualification, ThresholdPolicy},
};

/// A qualifying candidate with its 1-based position in the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMatch {
  pub rank:          usize,
  pub candidate:     CandidateRecord,
  pub result:        MatchResult,
  pub qualification: Qualification,
}

/// Strongest first:
///
/// 1. a matched NINO or TRN;
/// 2. more matched attributes;
/// 3. current-name matches before previous-name matches;
/// 4. earlier-created records first.
///
/// Remaining ties keep their input order (the sort is stable).
pub fn compare_strength(
  a: (&CandidateRecord, &MatchResult),
  b: (&CandidateRecord, &MatchResult),
) -> Ordering {
  let (a_record, a_result) = a;
  let (b_record, b_result) = b;
  b_result
    .strong_identifier()
    .is_some()
    .cmp(&a_result.strong_identifier().is_some())
    .then_with(|| {
      b_result
        .matched_attributes
        .len()
        .cmp(&a_result.matched_attributes.len())
    })
    .then_with(|| {
      a_result
        .matched_previous_name
        .cmp(&b_result.matched_previous_name)
    })
    .then_with(|| a_record.created_at.cmp(&b_record.created_at))
}

/// Sort qualifying candidates and number them from 1.
pub fn rank(
  mut qualifying: Vec<(CandidateRecord, MatchResult, Qualification)>,
) -> Vec<RankedMatch> {
  qualifying.sort_by(|(ra, a, _), (rb, b, _)| compare_strength((ra, a), (rb, b)));
  qualifying
    .into_iter()
    .enumerate()
    .map(|(i, (candidate, result, qualification))| RankedMatch {
      rank: i + 1,
      candidate,
      result,
      qualification,
    })
    .collect()
}

/// Score, filter by `policy` and rank `candidates` against `query`.
pub fn find_matches(
  query: &MatchQuery,
  candidates: &[CandidateRecord],
  policy: ThresholdPolicy,
) -> Vec<RankedMatch> {
  let qualifying = candidates
    .iter()
    .filter_map(|candidate| {
      let result = score(query, candidate)?;
      let qualification = policy.evaluate(&result)?;
      Some((candidate.clone(), result, qualification))
    })
    .collect();
  rank(qualifying)
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone, Utc};

  use super::*;
  use crate::person::{NameSet, PersonAttributes, PersonId};

  fn record(attributes: PersonAttributes, day: u32) -> CandidateRecord {
    CandidateRecord {
      person_id: PersonId::random(),
      attributes,
      previous_names: vec![],
      external_keys: Default::default(),
      risk_flags: Default::default(),
      created_at: Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
    }
  }

  fn query() -> MatchQuery {
    PersonAttributes {
      first_name: Some("Joe".into()),
      middle_name: Some("X".into()),
      last_name: Some("Bloggs".into()),
      date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 23),
      national_insurance_number: Some("QQ123456C".into()),
      ..Default::default()
    }
  }

  fn name_dob_only() -> PersonAttributes {
    PersonAttributes {
      national_insurance_number: None,
      ..query()
    }
  }

  #[test]
  fn strong_identifier_outranks_name_dob_match() {
    let name_only = record(name_dob_only(), 1);
    let with_nino = record(
      PersonAttributes {
        first_name: None,
        middle_name: None,
        ..query()
      },
      2,
    );
    let ranked = find_matches(
      &query(),
      &[name_only.clone(), with_nino.clone()],
      ThresholdPolicy::TrnRequest,
    );
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].candidate.person_id, with_nino.person_id);
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[1].candidate.person_id, name_only.person_id);
    assert_eq!(ranked[1].rank, 2);
  }

  #[test]
  fn previous_name_ranks_below_current_name() {
    let mut previous = record(
      PersonAttributes {
        last_name: Some("Smith".into()),
        ..name_dob_only()
      },
      1,
    );
    previous.previous_names.push(NameSet {
      first_name: Some("Joe".into()),
      middle_name: Some("X".into()),
      last_name: Some("Bloggs".into()),
    });
    let current = record(name_dob_only(), 2);

    let ranked = find_matches(
      &query(),
      &[previous.clone(), current.clone()],
      ThresholdPolicy::TrnRequest,
    );
    assert_eq!(ranked[0].candidate.person_id, current.person_id);
    assert!(ranked[1].result.matched_previous_name);
  }

  #[test]
  fn ties_break_by_creation_order() {
    let later = record(name_dob_only(), 9);
    let earlier = record(name_dob_only(), 3);
    let ranked = find_matches(
      &query(),
      &[later.clone(), earlier.clone()],
      ThresholdPolicy::TrnRequest,
    );
    assert_eq!(ranked[0].candidate.person_id, earlier.person_id);
    assert_eq!(ranked[1].candidate.person_id, later.person_id);
  }

  #[test]
  fn non_qualifying_candidates_are_excluded() {
    let weak = record(
      PersonAttributes {
        first_name: Some("Joe".into()),
        last_name: Some("Bloggs".into()),
        ..Default::default()
      },
      1,
    );
    assert!(find_matches(&query(), &[weak], ThresholdPolicy::TrnRequest).is_empty());
  }
}

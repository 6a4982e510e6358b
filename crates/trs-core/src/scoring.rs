//! Per-candidate scoring: which attributes of the query a candidate matches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::{
  attribute::{IdentifyingAttribute, compare},
  person::{CandidateRecord, MatchQuery, PersonAttributes, PersonId},
};

/// The attributes on which one candidate matched a query.
///
/// `matched_attributes` only ever contains attributes populated on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
  pub candidate_id:          PersonId,
  pub matched_attributes:    BTreeSet<IdentifyingAttribute>,
  /// The name attributes matched one of the candidate's previous names rather
  /// than the current one.
  pub matched_previous_name: bool,
}

impl MatchResult {
  pub fn has(&self, attribute: IdentifyingAttribute) -> bool {
    self.matched_attributes.contains(&attribute)
  }

  /// How many of first, middle, last name and date of birth matched.
  pub fn name_dob_count(&self) -> usize {
    IdentifyingAttribute::NAME_DOB
      .iter()
      .filter(|a| self.has(**a))
      .count()
  }

  /// The first strong identifier that matched, NINO before TRN.
  pub fn strong_identifier(&self) -> Option<IdentifyingAttribute> {
    IdentifyingAttribute::STRONG
      .into_iter()
      .find(|a| self.has(*a))
  }
}

/// Compare every attribute populated on both sides.
pub fn matched_attributes(
  query: &MatchQuery,
  candidate: &PersonAttributes,
) -> BTreeSet<IdentifyingAttribute> {
  IdentifyingAttribute::iter()
    .filter(|a| match (query.value(*a), candidate.value(*a)) {
      (Some(q), Some(c)) => compare(*a, q, c),
      _ => false,
    })
    .collect()
}

fn name_count(set: &BTreeSet<IdentifyingAttribute>) -> usize {
  set.iter().filter(|a| a.is_name()).count()
}

/// Score one candidate. Returns `None` when nothing matched at all.
///
/// Names are compared against the current name and every previous name; the
/// name set with the most matches is kept, and the current name wins ties.
pub fn score(query: &MatchQuery, candidate: &CandidateRecord) -> Option<MatchResult> {
  let mut matched = matched_attributes(query, &candidate.attributes);
  let mut matched_previous_name = false;

  for previous in &candidate.previous_names {
    let alternate = matched_attributes(query, &candidate.attributes.with_name(previous));
    if name_count(&alternate) > name_count(&matched) {
      matched = alternate;
      matched_previous_name = true;
    }
  }

  tracing::debug!(
    candidate = %candidate.person_id,
    matched = ?matched,
    matched_previous_name,
    "scored candidate"
  );

  (!matched.is_empty()).then(|| MatchResult {
    candidate_id: candidate.person_id,
    matched_attributes: matched,
    matched_previous_name,
  })
}

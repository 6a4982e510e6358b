//! Connecting One Login users to person records.
//!
//! Matching uses the same pipeline as TRN requests, but the outcome is never
//! automatic: each candidate's attributes are highlighted as matched or not,
//! and a case worker either connects the user to one candidate or records why
//! they are not connecting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  attribute::IdentifyingAttribute,
  person::{ActorId, MatchQuery, PersonAttributes, PersonId},
  ranking::RankedMatch,
};

// ─── Identity & highlighting ─────────────────────────────────────────────────

/// Identity details established by One Login verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
  pub first_name:                String,
  pub middle_name:               Option<String>,
  pub last_name:                 String,
  pub date_of_birth:             NaiveDate,
  pub national_insurance_number: Option<String>,
  pub stated_trn:                Option<String>,
}

impl VerifiedIdentity {
  pub fn to_query(&self) -> MatchQuery {
    PersonAttributes {
      first_name: Some(self.first_name.clone()),
      middle_name: self.middle_name.clone(),
      last_name: Some(self.last_name.clone()),
      date_of_birth: Some(self.date_of_birth),
      national_insurance_number: self.national_insurance_number.clone(),
      trn: self.stated_trn.clone(),
      itt_provider_id: None,
    }
  }
}

/// One attribute of one candidate, flagged for UI highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeHighlight {
  pub attribute: IdentifyingAttribute,
  /// The verified identity's value.
  pub expected:  Option<String>,
  /// The stored record's current value.
  pub actual:    Option<String>,
  pub matched:   bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightedCandidate {
  pub rank:                  usize,
  pub person_id:             PersonId,
  pub trn:                   Option<String>,
  pub matched_previous_name: bool,
  pub highlights:            Vec<AttributeHighlight>,
}

/// Flag every attribute populated on either side as matched or unmatched.
pub fn highlight(query: &MatchQuery, matches: &[RankedMatch]) -> Vec<HighlightedCandidate> {
  matches
    .iter()
    .map(|m| {
      let highlights = IdentifyingAttribute::iter()
        .filter_map(|attribute| {
          let expected = query.value(attribute).map(|v| v.to_string());
          let actual = m.candidate.attributes.value(attribute).map(|v| v.to_string());
          if expected.is_none() && actual.is_none() {
            return None;
          }
          Some(AttributeHighlight {
            attribute,
            expected,
            actual,
            matched: m.result.has(attribute),
          })
        })
        .collect();

      HighlightedCandidate {
        rank: m.rank,
        person_id: m.candidate.person_id,
        trn: m.candidate.attributes.trn.clone(),
        matched_previous_name: m.result.matched_previous_name,
        highlights,
      }
    })
    .collect()
}

// ─── Support task ────────────────────────────────────────────────────────────

/// Why a case worker chose not to connect a user to any record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotConnectingReason {
  NoMatchingRecord,
  MultipleMatchingRecords,
  NotEnoughInformation,
  /// Requires a free-text detail.
  AnotherReason,
}

impl NotConnectingReason {
  pub fn requires_detail(self) -> bool { matches!(self, Self::AnotherReason) }

  fn name(self) -> &'static str {
    match self {
      Self::NoMatchingRecord => "NoMatchingRecord",
      Self::MultipleMatchingRecords => "MultipleMatchingRecords",
      Self::NotEnoughInformation => "NotEnoughInformation",
      Self::AnotherReason => "AnotherReason",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SupportTaskOutcome {
  VerificationRejected {
    reason: String,
  },
  Connected {
    person_id: PersonId,
  },
  NotConnecting {
    reason: NotConnectingReason,
    detail: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SupportTaskState {
  Unverified,
  Verified {
    identity:    VerifiedIdentity,
    candidates:  Vec<HighlightedCandidate>,
    verified_by: ActorId,
    verified_at: DateTime<Utc>,
  },
  Closed {
    outcome:   SupportTaskOutcome,
    closed_by: ActorId,
    closed_at: DateTime<Utc>,
  },
}

impl SupportTaskState {
  fn name(&self) -> &'static str {
    match self {
      Self::Unverified => "unverified",
      Self::Verified { .. } => "verified",
      Self::Closed { .. } => "closed",
    }
  }
}

/// A support task for one One Login user. Serialisable between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneLoginSupportTask {
  pub task_id:           Uuid,
  pub one_login_subject: String,
  pub email:             String,
  pub created_at:        DateTime<Utc>,
  pub state:             SupportTaskState,
}

impl OneLoginSupportTask {
  pub fn new(one_login_subject: String, email: String, created_at: DateTime<Utc>) -> Self {
    Self {
      task_id: Uuid::new_v4(),
      one_login_subject,
      email,
      created_at,
      state: SupportTaskState::Unverified,
    }
  }

  pub fn is_closed(&self) -> bool { matches!(self.state, SupportTaskState::Closed { .. }) }

  fn invalid(&self, action: &'static str) -> Error {
    Error::InvalidTransition {
      action,
      state: self.state.name(),
    }
  }

  /// Record the verified identity and the candidates found for it.
  pub fn verify(
    &mut self,
    identity: VerifiedIdentity,
    candidates: Vec<HighlightedCandidate>,
    actor: ActorId,
    at: DateTime<Utc>,
  ) -> Result<()> {
    if !matches!(self.state, SupportTaskState::Unverified) {
      return Err(self.invalid("verify"));
    }
    self.state = SupportTaskState::Verified {
      identity,
      candidates,
      verified_by: actor,
      verified_at: at,
    };
    Ok(())
  }

  /// Close the task without verifying the user's identity.
  pub fn reject_verification(
    &mut self,
    reason: String,
    actor: ActorId,
    at: DateTime<Utc>,
  ) -> Result<()> {
    if !matches!(self.state, SupportTaskState::Unverified) {
      return Err(self.invalid("reject verification of"));
    }
    self.close(SupportTaskOutcome::VerificationRejected { reason }, actor, at);
    Ok(())
  }

  /// Connect the user to one of the candidates found at verification.
  pub fn connect(&mut self, person_id: PersonId, actor: ActorId, at: DateTime<Utc>) -> Result<()> {
    let SupportTaskState::Verified { candidates, .. } = &self.state else {
      return Err(self.invalid("connect"));
    };
    if !candidates.iter().any(|c| c.person_id == person_id) {
      return Err(Error::NotACandidate(person_id));
    }
    self.close(SupportTaskOutcome::Connected { person_id }, actor, at);
    Ok(())
  }

  /// Decline to connect. [`NotConnectingReason::AnotherReason`] needs a
  /// non-blank detail.
  pub fn decline(
    &mut self,
    reason: NotConnectingReason,
    detail: Option<String>,
    actor: ActorId,
    at: DateTime<Utc>,
  ) -> Result<()> {
    if !matches!(self.state, SupportTaskState::Verified { .. }) {
      return Err(self.invalid("decline"));
    }
    let detail = detail.filter(|d| !d.trim().is_empty());
    if reason.requires_detail() && detail.is_none() {
      return Err(Error::DetailRequired(reason.name()));
    }
    self.close(SupportTaskOutcome::NotConnecting { reason, detail }, actor, at);
    Ok(())
  }

  fn close(&mut self, outcome: SupportTaskOutcome, actor: ActorId, at: DateTime<Utc>) {
    self.state = SupportTaskState::Closed {
      outcome,
      closed_by: actor,
      closed_at: at,
    };
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::{
    person::CandidateRecord,
    ranking::find_matches,
    threshold::ThresholdPolicy,
  };

  fn identity() -> VerifiedIdentity {
    VerifiedIdentity {
      first_name:                "Joe".into(),
      middle_name:               None,
      last_name:                 "Bloggs".into(),
      date_of_birth:             NaiveDate::from_ymd_opt(1990, 5, 23).unwrap(),
      national_insurance_number: Some("QQ123456C".into()),
      stated_trn:                None,
    }
  }

  fn record() -> CandidateRecord {
    CandidateRecord {
      person_id:      PersonId::random(),
      attributes:     PersonAttributes {
        first_name: Some("Joe".into()),
        middle_name: Some("Xavier".into()),
        last_name: Some("Bloggs".into()),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 23),
        national_insurance_number: Some("QQ999999C".into()),
        trn: Some("1234567".into()),
        itt_provider_id: None,
      },
      previous_names: vec![],
      external_keys:  Default::default(),
      risk_flags:     Default::default(),
      created_at:     Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap() }

  fn actor() -> ActorId { ActorId("case.worker".into()) }

  fn verified_task() -> (OneLoginSupportTask, PersonId) {
    let record = record();
    let query = identity().to_query();
    let candidates = highlight(
      &query,
      &find_matches(&query, &[record.clone()], ThresholdPolicy::TrnRequest),
    );
    let mut task = OneLoginSupportTask::new("urn:sub".into(), "joe@example.com".into(), now());
    task.verify(identity(), candidates, actor(), now()).unwrap();
    (task, record.person_id)
  }

  #[test]
  fn highlights_flag_matched_and_unmatched_attributes() {
    let query = identity().to_query();
    let matches = find_matches(&query, &[record()], ThresholdPolicy::TrnRequest);
    let highlighted = highlight(&query, &matches);
    assert_eq!(highlighted.len(), 1);

    let by_attribute = |a: IdentifyingAttribute| {
      highlighted[0]
        .highlights
        .iter()
        .find(|h| h.attribute == a)
        .cloned()
    };
    assert!(by_attribute(IdentifyingAttribute::FirstName).unwrap().matched);
    assert!(by_attribute(IdentifyingAttribute::DateOfBirth).unwrap().matched);

    let middle = by_attribute(IdentifyingAttribute::MiddleName).unwrap();
    assert!(!middle.matched);
    assert_eq!(middle.expected, None);
    assert_eq!(middle.actual.as_deref(), Some("Xavier"));

    let nino = by_attribute(IdentifyingAttribute::NationalInsuranceNumber).unwrap();
    assert!(!nino.matched);

    assert!(by_attribute(IdentifyingAttribute::IttProviderId).is_none());
    assert_eq!(highlighted[0].trn.as_deref(), Some("1234567"));
  }

  #[test]
  fn connect_closes_the_task() {
    let (mut task, person_id) = verified_task();
    task.connect(person_id, actor(), now()).unwrap();
    assert!(task.is_closed());
    assert!(matches!(
      task.state,
      SupportTaskState::Closed {
        outcome: SupportTaskOutcome::Connected { person_id: p },
        ..
      } if p == person_id
    ));
  }

  #[test]
  fn connect_rejects_non_candidates() {
    let (mut task, _) = verified_task();
    let stranger = PersonId::random();
    assert!(matches!(
      task.connect(stranger, actor(), now()),
      Err(Error::NotACandidate(p)) if p == stranger
    ));
    assert!(!task.is_closed());
  }

  #[test]
  fn another_reason_requires_detail() {
    let (mut task, _) = verified_task();
    assert!(matches!(
      task.decline(NotConnectingReason::AnotherReason, Some("  ".into()), actor(), now()),
      Err(Error::DetailRequired("AnotherReason"))
    ));
    task
      .decline(
        NotConnectingReason::AnotherReason,
        Some("Spoke to the user".into()),
        actor(),
        now(),
      )
      .unwrap();
    assert!(task.is_closed());
  }

  #[test]
  fn other_reasons_do_not_require_detail() {
    let (mut task, _) = verified_task();
    task
      .decline(NotConnectingReason::NoMatchingRecord, None, actor(), now())
      .unwrap();
    assert!(task.is_closed());
  }

  #[test]
  fn no_candidates_can_only_decline() {
    let mut task = OneLoginSupportTask::new("urn:sub".into(), "joe@example.com".into(), now());
    task.verify(identity(), vec![], actor(), now()).unwrap();
    assert!(task.connect(PersonId::random(), actor(), now()).is_err());
    task
      .decline(NotConnectingReason::NoMatchingRecord, None, actor(), now())
      .unwrap();
    assert!(task.is_closed());
  }

  #[test]
  fn transitions_out_of_order_are_rejected() {
    let mut task = OneLoginSupportTask::new("urn:sub".into(), "joe@example.com".into(), now());
    assert!(matches!(
      task.connect(PersonId::random(), actor(), now()),
      Err(Error::InvalidTransition { action: "connect", state: "unverified" })
    ));
    assert!(
      task
        .decline(NotConnectingReason::NoMatchingRecord, None, actor(), now())
        .is_err()
    );

    task
      .reject_verification("Documents did not match".into(), actor(), now())
      .unwrap();
    assert!(matches!(
      task.verify(identity(), vec![], actor(), now()),
      Err(Error::InvalidTransition { state: "closed", .. })
    ));
  }

  #[test]
  fn state_survives_serialization() {
    let (task, _) = verified_task();
    let json = serde_json::to_string(&task).unwrap();
    let back: OneLoginSupportTask = serde_json::from_str(&json).unwrap();
    assert_eq!(back, task);
  }
}

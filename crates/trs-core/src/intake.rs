//! Intake requests and their validation.
//!
//! A request must resolve every reference-data key it supplies before it is
//! allowed anywhere near the matching pipeline. Failures accumulate in a
//! [`FailedReasons`] bitmask rather than stopping at the first problem.

use std::{fmt, ops::BitOr, ops::BitOrAssign};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  person::{ExternalKeys, MatchQuery, PersonAttributes},
  reference::{ReferenceData, TeacherStatus},
};

// ─── FailedReasons ───────────────────────────────────────────────────────────

/// Bitmask of validation failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailedReasons(u32);

impl FailedReasons {
  pub const NONE: Self = Self(0);
  pub const ITT_PROVIDER_NOT_FOUND: Self = Self(1 << 0);
  pub const TEACHER_STATUS_NOT_FOUND: Self = Self(1 << 1);
  pub const QUALIFICATION_SUBJECT1_NOT_FOUND: Self = Self(1 << 2);
  pub const QUALIFICATION_SUBJECT2_NOT_FOUND: Self = Self(1 << 3);
  pub const QUALIFICATION_SUBJECT3_NOT_FOUND: Self = Self(1 << 4);
  pub const MISSING_REQUIRED_NAME: Self = Self(1 << 5);
  pub const MISSING_DATE_OF_BIRTH: Self = Self(1 << 6);
  pub const TOO_MANY_QUALIFICATION_SUBJECTS: Self = Self(1 << 7);

  const NAMES: [(Self, &'static str); 8] = [
    (Self::ITT_PROVIDER_NOT_FOUND, "IttProviderNotFound"),
    (Self::TEACHER_STATUS_NOT_FOUND, "TeacherStatusNotFound"),
    (Self::QUALIFICATION_SUBJECT1_NOT_FOUND, "QualificationSubject1NotFound"),
    (Self::QUALIFICATION_SUBJECT2_NOT_FOUND, "QualificationSubject2NotFound"),
    (Self::QUALIFICATION_SUBJECT3_NOT_FOUND, "QualificationSubject3NotFound"),
    (Self::MISSING_REQUIRED_NAME, "MissingRequiredName"),
    (Self::MISSING_DATE_OF_BIRTH, "MissingDateOfBirth"),
    (Self::TOO_MANY_QUALIFICATION_SUBJECTS, "TooManyQualificationSubjects"),
  ];

  const SUBJECTS: [Self; 3] = [
    Self::QUALIFICATION_SUBJECT1_NOT_FOUND,
    Self::QUALIFICATION_SUBJECT2_NOT_FOUND,
    Self::QUALIFICATION_SUBJECT3_NOT_FOUND,
  ];

  pub fn bits(self) -> u32 { self.0 }

  pub fn is_empty(self) -> bool { self.0 == 0 }

  pub fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }

  /// Names of the set flags, in bit order.
  pub fn names(self) -> Vec<&'static str> {
    Self::NAMES
      .iter()
      .filter(|(flag, _)| self.contains(*flag))
      .map(|(_, name)| *name)
      .collect()
  }
}

impl BitOr for FailedReasons {
  type Output = Self;
  fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for FailedReasons {
  fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0 }
}

impl fmt::Display for FailedReasons {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.names().join(", "))
  }
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// A request to allocate a TRN, as received from an upstream workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRequest {
  pub first_name:                Option<String>,
  pub middle_name:               Option<String>,
  pub last_name:                 Option<String>,
  pub date_of_birth:             Option<NaiveDate>,
  pub national_insurance_number: Option<String>,
  /// A TRN the subject claims to already hold.
  pub stated_trn:                Option<String>,
  pub itt_provider_ukprn:        Option<String>,
  pub teacher_status:            Option<String>,
  /// Up to three qualification subject codes.
  #[serde(default)]
  pub qualification_subjects:    Vec<String>,
  #[serde(default)]
  pub external_keys:             ExternalKeys,
}

/// An intake request whose reference-data keys all resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedIntake {
  pub query:         MatchQuery,
  pub external_keys: ExternalKeys,
}

fn is_blank(value: &Option<String>) -> bool {
  value.as_deref().is_none_or(|s| s.trim().is_empty())
}

impl IntakeRequest {
  /// Resolve reference data and check required fields.
  pub fn validate(&self, reference: &ReferenceData) -> Result<ValidatedIntake, FailedReasons> {
    let mut failed = FailedReasons::NONE;

    if is_blank(&self.first_name) || is_blank(&self.last_name) {
      failed |= FailedReasons::MISSING_REQUIRED_NAME;
    }
    if self.date_of_birth.is_none() {
      failed |= FailedReasons::MISSING_DATE_OF_BIRTH;
    }

    let itt_provider_id = match self.itt_provider_ukprn.as_deref() {
      Some(ukprn) if !ukprn.trim().is_empty() => {
        let id = reference.itt_provider(ukprn);
        if id.is_none() {
          failed |= FailedReasons::ITT_PROVIDER_NOT_FOUND;
        }
        id
      }
      _ => None,
    };

    if let Some(code) = self.teacher_status.as_deref()
      && !code.trim().is_empty()
      && TeacherStatus::from_code(code).is_err()
    {
      failed |= FailedReasons::TEACHER_STATUS_NOT_FOUND;
    }

    if self.qualification_subjects.len() > FailedReasons::SUBJECTS.len() {
      failed |= FailedReasons::TOO_MANY_QUALIFICATION_SUBJECTS;
    }
    for (code, flag) in self.qualification_subjects.iter().zip(FailedReasons::SUBJECTS) {
      if !code.trim().is_empty() && !reference.has_subject(code) {
        failed |= flag;
      }
    }

    if !failed.is_empty() {
      tracing::warn!(failed_reasons = %failed, "intake request failed validation");
      return Err(failed);
    }

    Ok(ValidatedIntake {
      query: PersonAttributes {
        first_name: self.first_name.clone(),
        middle_name: self.middle_name.clone(),
        last_name: self.last_name.clone(),
        date_of_birth: self.date_of_birth,
        national_insurance_number: self.national_insurance_number.clone(),
        trn: self.stated_trn.clone(),
        itt_provider_id,
      },
      external_keys: self.external_keys.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn reference() -> ReferenceData {
    ReferenceData {
      itt_providers: [("10000001".to_owned(), Uuid::from_u128(7))].into_iter().collect(),
      subject_codes: ["100425", "100366"].into_iter().map(String::from).collect(),
    }
  }

  fn request() -> IntakeRequest {
    IntakeRequest {
      first_name: Some("Joe".into()),
      last_name: Some("Bloggs".into()),
      date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 23),
      ..Default::default()
    }
  }

  #[test]
  fn minimal_request_validates() {
    let validated = request().validate(&reference()).unwrap();
    assert_eq!(validated.query.first_name.as_deref(), Some("Joe"));
    assert_eq!(validated.query.itt_provider_id, None);
  }

  #[test]
  fn known_reference_data_resolves() {
    let validated = IntakeRequest {
      itt_provider_ukprn: Some("10000001".into()),
      teacher_status: Some("211".into()),
      qualification_subjects: vec!["100425".into(), "100366".into()],
      stated_trn: Some("1234567".into()),
      ..request()
    }
    .validate(&reference())
    .unwrap();
    assert_eq!(validated.query.itt_provider_id, Some(Uuid::from_u128(7)));
    assert_eq!(validated.query.trn.as_deref(), Some("1234567"));
  }

  #[test]
  fn failures_accumulate_into_one_mask() {
    let failed = IntakeRequest {
      first_name: None,
      itt_provider_ukprn: Some("99999999".into()),
      teacher_status: Some("999".into()),
      qualification_subjects: vec!["100425".into(), "nope".into()],
      ..request()
    }
    .validate(&reference())
    .unwrap_err();

    assert!(failed.contains(FailedReasons::MISSING_REQUIRED_NAME));
    assert!(failed.contains(FailedReasons::ITT_PROVIDER_NOT_FOUND));
    assert!(failed.contains(FailedReasons::TEACHER_STATUS_NOT_FOUND));
    assert!(failed.contains(FailedReasons::QUALIFICATION_SUBJECT2_NOT_FOUND));
    assert!(!failed.contains(FailedReasons::QUALIFICATION_SUBJECT1_NOT_FOUND));
    assert!(!failed.contains(FailedReasons::MISSING_DATE_OF_BIRTH));
    assert_eq!(
      failed.to_string(),
      "IttProviderNotFound, TeacherStatusNotFound, QualificationSubject2NotFound, MissingRequiredName"
    );
  }

  #[test]
  fn more_than_three_subjects_fail() {
    let failed = IntakeRequest {
      qualification_subjects: ["100425", "100425", "100425", "BOGUS"]
        .into_iter()
        .map(String::from)
        .collect(),
      ..request()
    }
    .validate(&reference())
    .unwrap_err();
    assert_eq!(failed, FailedReasons::TOO_MANY_QUALIFICATION_SUBJECTS);
    assert_eq!(failed.names(), ["TooManyQualificationSubjects"]);
  }

  #[test]
  fn missing_date_of_birth_fails() {
    let failed = IntakeRequest {
      date_of_birth: None,
      ..request()
    }
    .validate(&reference())
    .unwrap_err();
    assert_eq!(failed, FailedReasons::MISSING_DATE_OF_BIRTH);
  }
}

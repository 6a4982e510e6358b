//! Reference data used to validate intake requests.
//!
//! Codes from upstream systems are mapped to closed enumerations through
//! explicit tables. Unknown codes are errors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// A teacher's status as reported by the data management system, keyed by
/// its upstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
pub enum TeacherStatus {
  #[strum(serialize = "100")]
  QualifiedTeacherTrained,
  #[strum(serialize = "211")]
  TraineeTeacher,
  #[strum(serialize = "212")]
  AssessmentOnlyRouteCandidate,
  #[strum(serialize = "213")]
  QualifiedTeacherOverseas,
  #[strum(serialize = "220")]
  EarlyYearsTrainee,
  #[strum(serialize = "221")]
  EarlyYearsTeacherStatus,
}

impl TeacherStatus {
  pub fn from_code(code: &str) -> Result<Self> {
    let code = code.trim();
    code
      .parse()
      .map_err(|_| Error::UnknownTeacherStatus(code.to_owned()))
  }

  pub fn code(self) -> &'static str { self.into() }
}

/// Known ITT providers and qualification subjects.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReferenceData {
  /// UKPRN → ITT provider id.
  #[serde(default)]
  pub itt_providers: BTreeMap<String, Uuid>,
  /// Known qualification subject codes.
  #[serde(default)]
  pub subject_codes: BTreeSet<String>,
}

impl ReferenceData {
  pub fn itt_provider(&self, ukprn: &str) -> Option<Uuid> {
    self.itt_providers.get(ukprn.trim()).copied()
  }

  pub fn has_subject(&self, code: &str) -> bool { self.subject_codes.contains(code.trim()) }
}

//! Error types for `trs-core`.

use thiserror::Error;

use crate::person::PersonId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown teacher status code: {0:?}")]
  UnknownTeacherStatus(String),

  #[error("unknown recognition route: {0:?}")]
  UnknownRecognitionRoute(String),

  #[error("unknown task category: {0:?}")]
  UnknownTaskCategory(String),

  #[error("unknown outbox message name: {0:?}")]
  UnknownMessageName(String),

  #[error("cannot {action} a support task that is {state}")]
  InvalidTransition {
    action: &'static str,
    state:  &'static str,
  },

  #[error("person {0} is not a candidate for this support task")]
  NotACandidate(PersonId),

  #[error("a detail is required when the reason is {0:?}")]
  DetailRequired(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

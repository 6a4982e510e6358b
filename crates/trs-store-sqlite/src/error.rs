//! Error type for `trs-store-sqlite`.

use thiserror::Error;
use trs_core::{person::PersonId, store::StoreError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] trs_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown task priority: {0:?}")]
  UnknownPriority(String),

  #[error("person not found: {0}")]
  PersonNotFound(PersonId),

  #[error("person {person_id} already holds TRN {trn}")]
  TrnAlreadyAllocated { person_id: PersonId, trn: String },

  #[error("TRN range exhausted")]
  TrnRangeExhausted,

  #[error("TRN range start {0} is outside 1..=9999999")]
  InvalidTrnRangeStart(u32),

  /// A unique column (TRN or an external key) already holds the value.
  #[error("conflict: {0}")]
  Conflict(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Lift a database error, surfacing unique-constraint violations as
  /// [`Error::Conflict`].
  pub(crate) fn from_write(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, message))
        if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Self::Conflict(message.unwrap_or_else(|| failure.to_string()))
      }
      other => Self::Database(other),
    }
  }
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

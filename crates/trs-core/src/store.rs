//! The `CandidateStore` and `RecordStore` traits.
//!
//! The traits are implemented by storage backends (e.g. `trs-store-sqlite`).
//! The engine only ever reads through [`CandidateStore`]; persisting the
//! engine's outputs is the caller's job, done through [`RecordStore`].

use std::{convert::Infallible, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
  outbox::OutboxMessage,
  person::{
    CandidateRecord, ExternalKey, ExternalKeys, MatchQuery, NameSet, PersonAttributes,
    PersonId, RiskFlags,
  },
  review::ReviewArtifact,
};

// ─── Input types ─────────────────────────────────────────────────────────────

/// Input to [`RecordStore::add_person`]. `created_at` is set by the store.
///
/// A populated `attributes.trn` is stored as-is (e.g. an imported record that
/// already holds a TRN); otherwise the person is pending until
/// [`RecordStore::allocate_trn`] is called.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
  pub attributes:     PersonAttributes,
  #[serde(default)]
  pub previous_names: Vec<NameSet>,
  #[serde(default)]
  pub external_keys:  ExternalKeys,
  #[serde(default)]
  pub risk_flags:     RiskFlags,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Error type of a store backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The write was refused because a unique value (a TRN or an external key)
  /// is already held by another record.
  fn is_conflict(&self) -> bool;
}

impl StoreError for Infallible {
  fn is_conflict(&self) -> bool { match *self {} }
}

/// Coarse retrieval of stored person records.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CandidateStore: Send + Sync {
  type Error: StoreError;

  /// Every record sharing at least one populated attribute with `query`.
  ///
  /// Must return a superset of the true matches; false positives are filtered
  /// out by the scorer. Records are returned in creation order.
  fn find_by_any_attribute<'a>(
    &'a self,
    query: &'a MatchQuery,
  ) -> impl Future<Output = Result<Vec<CandidateRecord>, Self::Error>> + Send + 'a;

  /// The record already holding `key`, if any.
  fn find_by_external_key<'a>(
    &'a self,
    key: &'a ExternalKey,
  ) -> impl Future<Output = Result<Option<CandidateRecord>, Self::Error>> + Send + 'a;
}

/// Persistence for person records and the engine's durable outputs.
pub trait RecordStore: CandidateStore {
  /// Create and persist a new person.
  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<CandidateRecord, Self::Error>> + Send + '_;

  /// Assign the next TRN in sequence to a person that has none, returning it.
  fn allocate_trn(
    &self,
    person_id: PersonId,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Record a name the person was previously known by.
  fn add_previous_name(
    &self,
    person_id: PersonId,
    name: NameSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a person by id. Returns `None` if not found.
  fn get_person(
    &self,
    person_id: PersonId,
  ) -> impl Future<Output = Result<Option<CandidateRecord>, Self::Error>> + Send + '_;

  fn save_review_artifact(
    &self,
    artifact: ReviewArtifact,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All review artifacts, oldest first.
  fn list_review_artifacts(
    &self,
  ) -> impl Future<Output = Result<Vec<ReviewArtifact>, Self::Error>> + Send + '_;

  fn enqueue_outbox_message(
    &self,
    message: OutboxMessage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All outbox messages, oldest first.
  fn list_outbox_messages(
    &self,
  ) -> impl Future<Output = Result<Vec<OutboxMessage>, Self::Error>> + Send + '_;
}

//! `POST /trn-requests`: the full intake flow.
//!
//! Validate the request against reference data, run it through the matching
//! pipeline, persist the applicant, then either allocate a TRN or raise a
//! review task. A request that allocates but trips the digit-in-name check
//! gets both a TRN and a task.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use trs_core::{
  intake::IntakeRequest,
  person::{ExternalKey, ExternalKeys, PersonId},
  pipeline::resolve_intake,
  ranking::RankedMatch,
  resolution::{Decision, KeyCollision},
  review::{self, ReviewArtifact, TaskCategory},
  store::{NewPerson, RecordStore, StoreError as _},
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TrnRequestBody {
  #[serde(flatten)]
  pub request:  IntakeRequest,
  /// Task category code for any review task raised; `DMSImportTrn` when
  /// omitted.
  #[serde(default)]
  pub category: Option<String>,
}

/// What happened to a TRN request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrnRequestOutcome {
  /// The applicant's newly stored record.
  pub person_id: PersonId,
  /// `None` while the request awaits review.
  pub trn:       Option<String>,
  pub decision:  Decision,
  pub matches:   Vec<RankedMatch>,
  pub task:      Option<ReviewArtifact>,
}

/// `POST /trn-requests`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<TrnRequestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
{
  let category = match body.category.as_deref() {
    Some(code) => TaskCategory::from_code(code)?,
    None => TaskCategory::DmsImportTrn,
  };
  let intake = body
    .request
    .validate(&state.reference)
    .map_err(ApiError::Validation)?;

  // A concurrent request can take one of the applicant's external keys
  // between resolution and insert. Resolve again once: the key now shows up
  // as a collision and the request escalates.
  let mut retried = false;
  let (resolution, person) = loop {
    let resolution = resolve_intake(state.store.as_ref(), &intake)
      .await
      .map_err(ApiError::store)?;

    // A stated TRN is a claim to match on, not a TRN to store.
    let mut attributes = intake.query.clone();
    attributes.trn = None;
    let external_keys = match &resolution.decision {
      Decision::Escalated(escalation) => {
        without_collisions(&intake.external_keys, &escalation.collisions)
      }
      Decision::Allocated { .. } => intake.external_keys.clone(),
    };

    let added = state
      .store
      .add_person(NewPerson {
        attributes,
        external_keys,
        ..Default::default()
      })
      .await;
    match added {
      Ok(person) => break (resolution, person),
      Err(e) if e.is_conflict() && !retried => {
        tracing::info!(error = %e, "external key taken during intake, resolving again");
        retried = true;
      }
      Err(e) => return Err(ApiError::store(e)),
    }
  };

  let trn = match resolution.decision {
    Decision::Allocated { .. } => Some(
      state
        .store
        .allocate_trn(person.person_id)
        .await
        .map_err(ApiError::store)?,
    ),
    Decision::Escalated(_) => None,
  };

  let task = review::compose(
    &resolution.decision,
    person.person_id,
    category,
    state.clock.as_ref(),
  );
  if let Some(task) = &task {
    state
      .store
      .save_review_artifact(task.clone())
      .await
      .map_err(ApiError::store)?;
    tracing::info!(
      person_id = %person.person_id,
      task = %task.artifact_id,
      category = task.category.code(),
      "review task raised"
    );
  }

  let outcome = TrnRequestOutcome {
    person_id: person.person_id,
    trn,
    decision: resolution.decision,
    matches: resolution.matches,
    task,
  };
  Ok((StatusCode::CREATED, Json(outcome)))
}

/// The applicant's keys minus those already held by another record.
fn without_collisions(keys: &ExternalKeys, collisions: &[KeyCollision]) -> ExternalKeys {
  let mut kept = ExternalKeys::default();
  for key in keys.keys() {
    if collisions.iter().any(|c| c.key == key) {
      continue;
    }
    match key {
      ExternalKey::HusId(v) => kept.hus_id = Some(v),
      ExternalKey::SlugId(v) => kept.slug_id = Some(v),
      ExternalKey::IttSlugId(v) => kept.itt_slug_id = Some(v),
    }
  }
  kept
}

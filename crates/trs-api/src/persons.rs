//! Handlers for `/persons` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/persons` | Seed a record (administrative import). 409 if a TRN or external key is already held |
//! | `GET`  | `/persons/{id}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use trs_core::{
  attribute::{AttributeValue, IdentifyingAttribute},
  person::{CandidateRecord, PersonAttributes, PersonId},
  store::{NewPerson, RecordStore},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /persons`, body: a [`NewPerson`].
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewPerson>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
{
  for key in body.external_keys.keys() {
    let holder = state
      .store
      .find_by_external_key(&key)
      .await
      .map_err(ApiError::store)?;
    if let Some(holder) = holder {
      return Err(ApiError::Conflict(format!(
        "{} '{}' is already held by {}",
        key.label(),
        key.value(),
        holder.person_id
      )));
    }
  }

  if let Some(AttributeValue::Text(trn)) = body.attributes.value(IdentifyingAttribute::Trn) {
    let query = PersonAttributes {
      trn: Some(trn.to_owned()),
      ..Default::default()
    };
    let holders = state
      .store
      .find_by_any_attribute(&query)
      .await
      .map_err(ApiError::store)?;
    if let Some(holder) = holders.iter().find(|r| r.attributes.trn.as_deref() == Some(trn)) {
      return Err(ApiError::Conflict(format!(
        "TRN {trn} is already held by {}",
        holder.person_id
      )));
    }
  }

  let person = state.store.add_person(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(person)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /persons/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CandidateRecord>, ApiError>
where
  S: RecordStore,
{
  let person = state
    .store
    .get_person(PersonId(id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  Ok(Json(person))
}

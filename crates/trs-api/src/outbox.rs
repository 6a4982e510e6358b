//! Induction outbox endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/induction` | 201 with the queued message, 204 when the fact is unresolved |
//! | `GET`  | `/outbox` | Oldest first |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use trs_core::{
  outbox::{self, OutboxMessage, RecognitionRoute},
  person::PersonId,
  store::RecordStore,
};

use crate::{AppState, error::ApiError};

// ─── Induction ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InductionBody {
  pub person_id:          PersonId,
  /// Recognition route code, e.g. `"scotland"`.
  pub route:              String,
  /// `None` while the induction requirement is unresolved.
  pub induction_required: Option<bool>,
}

/// `POST /induction`
pub async fn induction<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<InductionBody>,
) -> Result<Response, ApiError>
where
  S: RecordStore,
{
  let route = RecognitionRoute::from_code(&body.route)?;

  state
    .store
    .get_person(body.person_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {} not found", body.person_id)))?;

  let Some(message) = outbox::compose(
    body.person_id,
    route,
    body.induction_required,
    state.clock.as_ref(),
  )?
  else {
    return Ok(StatusCode::NO_CONTENT.into_response());
  };

  state
    .store
    .enqueue_outbox_message(message.clone())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    person_id = %message.target_person_id,
    message = %message.message_name,
    "outbox message queued"
  );
  Ok((StatusCode::CREATED, Json(message)).into_response())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /outbox`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<OutboxMessage>>, ApiError>
where
  S: RecordStore,
{
  let messages = state
    .store
    .list_outbox_messages()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}

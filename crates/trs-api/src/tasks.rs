//! `GET /tasks`: every review artifact raised so far, oldest first.

use axum::{Json, extract::State};
use trs_core::{review::ReviewArtifact, store::RecordStore};

use crate::{AppState, error::ApiError};

/// `GET /tasks`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<ReviewArtifact>>, ApiError>
where
  S: RecordStore,
{
  let tasks = state
    .store
    .list_review_artifacts()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(tasks))
}

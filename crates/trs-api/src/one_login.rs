//! `POST /one-login/candidates`: candidate records for a verified One Login
//! identity, with per-attribute highlighting for the support UI.

use axum::{Json, extract::State};
use trs_core::{
  one_login::{HighlightedCandidate, VerifiedIdentity},
  pipeline::one_login_candidates,
  store::RecordStore,
};

use crate::{AppState, error::ApiError};

/// `POST /one-login/candidates`
pub async fn candidates<S>(
  State(state): State<AppState<S>>,
  Json(identity): Json<VerifiedIdentity>,
) -> Result<Json<Vec<HighlightedCandidate>>, ApiError>
where
  S: RecordStore,
{
  let candidates = one_login_candidates(state.store.as_ref(), &identity)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(candidates))
}

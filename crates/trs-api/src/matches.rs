//! `POST /matches`: dry-run match of a query against stored records.
//!
//! Body: the query attributes plus an optional `"policy"`
//! (`"trn_request"` by default, or `"find_teachers"`). Nothing is written.

use axum::{
  Json,
  extract::State,
};
use serde::Deserialize;
use trs_core::{
  person::MatchQuery,
  pipeline::find_candidates,
  ranking::RankedMatch,
  store::RecordStore,
  threshold::ThresholdPolicy,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct MatchBody {
  #[serde(flatten)]
  pub query:  MatchQuery,
  #[serde(default)]
  pub policy: ThresholdPolicy,
}

/// `POST /matches`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<MatchBody>,
) -> Result<Json<Vec<RankedMatch>>, ApiError>
where
  S: RecordStore,
{
  if body.query.populated_count() == 0 {
    return Err(ApiError::BadRequest("query has no populated attributes".into()));
  }
  let matches = find_candidates(state.store.as_ref(), &body.query, body.policy)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(matches))
}

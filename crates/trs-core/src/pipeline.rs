//! The end-to-end matching pipeline over a [`CandidateStore`].
//!
//! Coarse retrieval, external-key collision checks, scoring, threshold,
//! ranking and the final decision. Nothing here writes to the store.

use serde::{Deserialize, Serialize};

use crate::{
  intake::ValidatedIntake,
  one_login::{HighlightedCandidate, VerifiedIdentity, highlight},
  person::MatchQuery,
  ranking::{RankedMatch, find_matches},
  resolution::{Decision, KeyCollision, decide},
  store::CandidateStore,
  threshold::ThresholdPolicy,
};

/// The outcome of running an intake through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
  pub decision: Decision,
  /// Every qualifying candidate, strongest first.
  pub matches:  Vec<RankedMatch>,
}

/// Run a validated intake request through the full pipeline.
pub async fn resolve_intake<S>(store: &S, intake: &ValidatedIntake) -> Result<Resolution, S::Error>
where
  S: CandidateStore,
{
  let candidates = store.find_by_any_attribute(&intake.query).await?;
  let matches = find_matches(&intake.query, &candidates, ThresholdPolicy::TrnRequest);

  let mut collisions = Vec::new();
  for key in intake.external_keys.keys() {
    if let Some(holder) = store.find_by_external_key(&key).await? {
      collisions.push(KeyCollision::new(key, &holder));
    }
  }

  let decision = decide(&intake.query, &matches, collisions);
  match &decision {
    Decision::Allocated { inconsistency } => tracing::info!(
      candidates = candidates.len(),
      flagged = inconsistency.is_some(),
      "no qualifying match, allocating"
    ),
    Decision::Escalated(escalation) => tracing::info!(
      candidates = candidates.len(),
      qualifying = matches.len(),
      collisions = escalation.collisions.len(),
      duplicate = ?escalation.candidate,
      "escalating for review"
    ),
  }

  Ok(Resolution { decision, matches })
}

/// Find existing records for a query under an explicit threshold policy.
pub async fn find_candidates<S>(
  store: &S,
  query: &MatchQuery,
  policy: ThresholdPolicy,
) -> Result<Vec<RankedMatch>, S::Error>
where
  S: CandidateStore,
{
  let candidates = store.find_by_any_attribute(query).await?;
  Ok(find_matches(query, &candidates, policy))
}

/// Ranked, per-attribute highlighted candidates for a One Login identity.
pub async fn one_login_candidates<S>(
  store: &S,
  identity: &VerifiedIdentity,
) -> Result<Vec<HighlightedCandidate>, S::Error>
where
  S: CandidateStore,
{
  let query = identity.to_query();
  let matches = find_candidates(store, &query, ThresholdPolicy::TrnRequest).await?;
  Ok(highlight(&query, &matches))
}

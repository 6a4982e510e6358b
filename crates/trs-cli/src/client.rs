//! Async HTTP client wrapping the TRS JSON API.

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use trs_core::{
  intake::IntakeRequest,
  outbox::OutboxMessage,
  person::{MatchQuery, PersonId},
  ranking::RankedMatch,
  resolution::Decision,
  review::ReviewArtifact,
  threshold::ThresholdPolicy,
};

/// Connection settings for the TRS API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// The parts of a `POST /trn-requests` response the CLI reports.
#[derive(Debug, Deserialize)]
pub struct TrnRequestOutcome {
  pub person_id: PersonId,
  pub trn:       Option<String>,
  pub decision:  Decision,
  pub matches:   Vec<RankedMatch>,
  pub task:      Option<ReviewArtifact>,
}

#[derive(Serialize)]
struct MatchBody<'a> {
  #[serde(flatten)]
  query:  &'a MatchQuery,
  policy: ThresholdPolicy,
}

#[derive(Serialize)]
struct TrnRequestBody<'a> {
  #[serde(flatten)]
  request:  &'a IntakeRequest,
  #[serde(skip_serializing_if = "Option::is_none")]
  category: Option<&'a str>,
}

#[derive(Serialize)]
struct InductionBody<'a> {
  person_id:          PersonId,
  route:              &'a str,
  induction_required: Option<bool>,
}

#[derive(Deserialize)]
struct ErrorBody {
  error:          String,
  #[serde(default)]
  failed_reasons: Vec<String>,
}

/// Async HTTP client for the TRS JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    tracing::debug!(path, "GET");
    let resp = self
      .client
      .get(self.url(path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    let resp = check(resp, "GET", path).await?;
    resp.json().await.with_context(|| format!("deserialising GET {path}"))
  }

  async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
    tracing::debug!(path, "POST");
    let resp = self
      .client
      .post(self.url(path))
      .json(body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    check(resp, "POST", path).await
  }

  // ── Matching ──────────────────────────────────────────────────────────────

  /// `POST /matches`
  pub async fn find_matches(
    &self,
    query: &MatchQuery,
    policy: ThresholdPolicy,
  ) -> Result<Vec<RankedMatch>> {
    let resp = self.post("/matches", &MatchBody { query, policy }).await?;
    resp.json().await.context("deserialising matches")
  }

  /// `POST /trn-requests`
  pub async fn request_trn(
    &self,
    request: &IntakeRequest,
    category: Option<&str>,
  ) -> Result<TrnRequestOutcome> {
    let resp = self
      .post("/trn-requests", &TrnRequestBody { request, category })
      .await?;
    resp.json().await.context("deserialising TRN request outcome")
  }

  // ── Durable outputs ───────────────────────────────────────────────────────

  /// `GET /tasks`
  pub async fn list_tasks(&self) -> Result<Vec<ReviewArtifact>> { self.get("/tasks").await }

  /// `GET /outbox`
  pub async fn list_outbox(&self) -> Result<Vec<OutboxMessage>> { self.get("/outbox").await }

  /// `POST /induction`; `None` when the fact produced no message.
  pub async fn record_induction(
    &self,
    person_id: PersonId,
    route: &str,
    induction_required: Option<bool>,
  ) -> Result<Option<OutboxMessage>> {
    let body = InductionBody {
      person_id,
      route,
      induction_required,
    };
    let resp = self.post("/induction", &body).await?;
    if resp.status() == reqwest::StatusCode::NO_CONTENT {
      return Ok(None);
    }
    resp.json().await.map(Some).context("deserialising outbox message")
  }
}

/// Turn a non-success response into an error carrying the server's message.
async fn check(resp: Response, method: &str, path: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let text = resp.text().await.unwrap_or_default();
  match serde_json::from_str::<ErrorBody>(&text) {
    Ok(body) if body.failed_reasons.is_empty() => {
      Err(anyhow!("{method} {path} → {status}: {}", body.error))
    }
    Ok(body) => Err(anyhow!(
      "{method} {path} → {status}: {} [{}]",
      body.error,
      body.failed_reasons.join(", ")
    )),
    Err(_) => Err(anyhow!("{method} {path} → {status}")),
  }
}

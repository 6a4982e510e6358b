//! JSON REST API for the TRS identity-matching engine.
//!
//! Exposes an axum [`Router`] backed by any [`trs_core::store::RecordStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", trs_api::api_router(state))
//! ```

pub mod config;
pub mod error;
pub mod matches;
pub mod one_login;
pub mod outbox;
pub mod persons;
pub mod tasks;
pub mod trn_requests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use trs_core::{clock::Clock, reference::ReferenceData, store::RecordStore};

pub use config::ServerConfig;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:     Arc<S>,
  /// Stamps review artifacts and outbox messages.
  pub clock:     Arc<dyn Clock>,
  pub reference: Arc<ReferenceData>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      clock:     Arc::clone(&self.clock),
      reference: Arc::clone(&self.reference),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    // Matching
    .route("/matches", post(matches::handler::<S>))
    .route("/trn-requests", post(trn_requests::create::<S>))
    .route("/one-login/candidates", post(one_login::candidates::<S>))
    // Persons
    .route("/persons", post(persons::create::<S>))
    .route("/persons/{id}", get(persons::get_one::<S>))
    // Durable outputs
    .route("/tasks", get(tasks::list::<S>))
    .route("/induction", post(outbox::induction::<S>))
    .route("/outbox", get(outbox::list::<S>))
    .with_state(state)
}

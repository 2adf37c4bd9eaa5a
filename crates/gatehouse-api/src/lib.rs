//! JSON REST API for the Gatehouse visitor log.
//!
//! Exposes an axum [`Router`] backed by any storage backend implementing the
//! `gatehouse-core` traits. Authentication is the caller's responsibility:
//! every state-changing handler expects a [`CurrentUser`] request extension,
//! inserted by the server's auth middleware (or by a plain
//! [`axum::Extension`] layer in tests).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gatehouse_api::api_router(service))
//! ```

pub mod analytics;
pub mod audit;
pub mod chat;
pub mod error;
pub mod visitors;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRequestParts,
  http::request::Parts,
  routing::{get, post, put},
};

use gatehouse_chatbot::Chatbot;
use gatehouse_core::{
  VisitorService,
  audit::AuditSink,
  store::{UserDirectory, VisitorStore},
};

pub use error::ApiError;

/// The composed storage bound the API needs: one backend serving as record
/// store, user directory, and audit sink (the SQLite store implements all
/// three).
pub trait ServiceBackend:
  VisitorStore + UserDirectory + AuditSink + Send + Sync + 'static
{
}

impl<T> ServiceBackend for T where
  T: VisitorStore + UserDirectory + AuditSink + Send + Sync + 'static
{
}

/// Shared state threaded through all handlers.
pub struct ApiState<S: ServiceBackend> {
  pub service: Arc<VisitorService<S, S, S>>,
  pub chatbot: Chatbot<S, S, S>,
}

// ─── Current user ────────────────────────────────────────────────────────────

/// The authenticated staff identity, inserted into request extensions by the
/// authentication middleware. Handlers that record lifecycle events extract
/// it; its absence is a 401, not a panic.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<CurrentUser>()
      .cloned()
      .ok_or(ApiError::Unauthorized)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<VisitorService<S, S, S>>) -> Router<()>
where
  S: ServiceBackend,
{
  let state = Arc::new(ApiState {
    chatbot: Chatbot::new(Arc::clone(&service)),
    service,
  });

  Router::new()
    // Visitors
    .route(
      "/visitors",
      get(visitors::list::<S>).post(visitors::create::<S>),
    )
    .route("/visitors/types", get(visitors::types))
    .route("/visitors/filters", get(visitors::filters))
    .route(
      "/visitors/{id}",
      get(visitors::get_one::<S>)
        .put(visitors::update::<S>)
        .delete(visitors::delete::<S>),
    )
    .route("/visitors/{id}/exit", put(visitors::mark_exit::<S>))
    // Analytics
    .route("/analytics/entry-times", get(analytics::entry_times::<S>))
    .route("/analytics/visit-durations", get(analytics::visit_durations::<S>))
    .route("/analytics/visitor-types", get(analytics::visitor_types::<S>))
    .route("/analytics/daily-peak-hours", get(analytics::daily_peak_hours::<S>))
    .route("/analytics/average-durations", get(analytics::average_durations::<S>))
    // Chat assistant
    .route("/chat", post(chat::respond::<S>))
    // Audit trail
    .route("/audit", get(audit::recent::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

//! Handler for the `/chat` endpoint.
//!
//! The assistant re-runs the same service operations as the REST surface
//! and formats a textual reply; it never fails a request over a bad
//! question.

use std::sync::Arc;

use axum::{Json, extract::State};
use gatehouse_chatbot::{ChatReply, ChatRequest};

use crate::ApiState;

/// `POST /chat` — body: [`ChatRequest`].
pub async fn respond<S>(
  State(state): State<Arc<ApiState<S>>>,
  Json(request): Json<ChatRequest>,
) -> Json<ChatReply>
where
  S: crate::ServiceBackend,
{
  Json(state.chatbot.respond(&request).await)
}

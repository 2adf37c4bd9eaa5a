//! Handler for the read-only `/audit` endpoint.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;

use gatehouse_core::audit::{AuditEntity, AuditRecord};

use crate::{ApiState, error::ApiError};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct AuditParams {
  /// `visitor` or `user`; omitted = both.
  pub entity: Option<AuditEntity>,
  pub limit:  Option<usize>,
}

/// `GET /audit[?entity=<entity>&limit=<n>]` — recent events, newest first.
pub async fn recent<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditRecord>>, ApiError>
where
  S: crate::ServiceBackend,
{
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
  Ok(Json(state.service.recent_audit(params.entity, limit).await?))
}

//! Handlers for `/visitors` endpoints.
//!
//! | Method   | Path                  | Notes |
//! |----------|-----------------------|-------|
//! | `GET`    | `/visitors`           | `?filter=` + optional date bounds |
//! | `POST`   | `/visitors`           | Body: [`NewVisitor`]; 201 on success |
//! | `GET`    | `/visitors/{id}`      | 404 if not found |
//! | `PUT`    | `/visitors/{id}`      | Body: [`VisitorUpdate`] |
//! | `PUT`    | `/visitors/{id}/exit` | 409 if already exited |
//! | `DELETE` | `/visitors/{id}`      | 204 on success |
//! | `GET`    | `/visitors/types`     | Valid visitor types |
//! | `GET`    | `/visitors/filters`   | Valid filter selectors |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use gatehouse_core::{
  filter::VisitFilter,
  visitor::{NewVisitor, Visitor, VisitorType, VisitorUpdate},
};

use crate::{ApiState, CurrentUser, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub filter:    VisitFilter,
  pub date_from: Option<NaiveDate>,
  pub date_to:   Option<NaiveDate>,
}

/// `GET /visitors[?filter=<filter>&date_from=<d>&date_to=<d>]`
pub async fn list<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Visitor>>, ApiError>
where
  S: crate::ServiceBackend,
{
  let visitors = state
    .service
    .find_filtered(params.filter, params.date_from, params.date_to)
    .await?;
  Ok(Json(visitors))
}

// ─── Create (entry) ──────────────────────────────────────────────────────────

/// `POST /visitors` — registers an entry for the authenticated staff member.
pub async fn create<S>(
  State(state): State<Arc<ApiState<S>>>,
  CurrentUser(acting_user): CurrentUser,
  Json(body): Json<NewVisitor>,
) -> Result<impl IntoResponse, ApiError>
where
  S: crate::ServiceBackend,
{
  let visitor = state.service.record_entry(body, &acting_user).await?;
  Ok((StatusCode::CREATED, Json(visitor)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /visitors/{id}`
pub async fn get_one<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Visitor>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(state.service.find_one(id).await?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /visitors/{id}` — overwrite descriptive fields.
pub async fn update<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<VisitorUpdate>,
) -> Result<Json<Visitor>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(state.service.update(id, body).await?))
}

// ─── Exit ────────────────────────────────────────────────────────────────────

/// `PUT /visitors/{id}/exit` — close the visit on behalf of the
/// authenticated staff member.
pub async fn mark_exit<S>(
  State(state): State<Arc<ApiState<S>>>,
  CurrentUser(acting_user): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Visitor>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(state.service.record_exit(id, &acting_user).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /visitors/{id}`
pub async fn delete<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: crate::ServiceBackend,
{
  state.service.delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// `GET /visitors/types`
pub async fn types() -> Json<Vec<&'static str>> {
  Json(VisitorType::ALL.iter().map(|t| t.as_str()).collect())
}

/// `GET /visitors/filters`
pub async fn filters() -> Json<Vec<&'static str>> {
  Json(VisitFilter::ALL.iter().map(|f| f.as_str()).collect())
}

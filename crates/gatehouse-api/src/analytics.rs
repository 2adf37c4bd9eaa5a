//! Handlers for `/analytics` endpoints.
//!
//! All five take optional `date_from`/`date_to` query parameters and default
//! to the last 7 days through today. Empty periods return zero-filled data,
//! never errors.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;

use gatehouse_core::analytics::{
  DailyAverageDuration, DailyPeakHour, DurationBucket, EntryTimeBucket,
  TypeSlice,
};

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub date_from: Option<NaiveDate>,
  pub date_to:   Option<NaiveDate>,
}

/// `GET /analytics/entry-times`
pub async fn entry_times<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<EntryTimeBucket>>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(
    state
      .service
      .entry_time_analysis(params.date_from, params.date_to)
      .await?,
  ))
}

/// `GET /analytics/visit-durations`
pub async fn visit_durations<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DurationBucket>>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(
    state
      .service
      .visit_duration_analysis(params.date_from, params.date_to)
      .await?,
  ))
}

/// `GET /analytics/visitor-types`
pub async fn visitor_types<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<TypeSlice>>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(
    state
      .service
      .visitor_type_analysis(params.date_from, params.date_to)
      .await?,
  ))
}

/// `GET /analytics/daily-peak-hours`
pub async fn daily_peak_hours<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DailyPeakHour>>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(
    state
      .service
      .daily_peak_hours(params.date_from, params.date_to)
      .await?,
  ))
}

/// `GET /analytics/average-durations`
pub async fn average_durations<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DailyAverageDuration>>, ApiError>
where
  S: crate::ServiceBackend,
{
  Ok(Json(
    state
      .service
      .average_visit_duration_analysis(params.date_from, params.date_to)
      .await?,
  ))
}

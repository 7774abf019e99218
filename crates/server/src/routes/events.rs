//! Family calendar routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use db::models::family_event::{CreateFamilyEvent, FamilyEvent, UpdateFamilyEvent};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct EventRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(family_id): Path<Uuid>,
    Query(query): Query<EventRangeQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<FamilyEvent>>>, ApiError> {
    let events = state
        .calendar
        .list_for_family(family_id, query.from, query.to)
        .await?;
    Ok(ResponseJson(ApiResponse::success(events)))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(payload): Json<CreateFamilyEvent>,
) -> Result<ResponseJson<ApiResponse<FamilyEvent>>, ApiError> {
    let event = state.calendar.create(family_id, user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<UpdateFamilyEvent>,
) -> Result<ResponseJson<ApiResponse<FamilyEvent>>, ApiError> {
    let event = state.calendar.update(event_id, user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(event)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.calendar.delete(event_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/families/{id}/events", get(list_events).post(create_event))
        .route("/events/{id}", put(update_event).delete(delete_event))
}

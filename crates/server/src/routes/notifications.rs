use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::notification::Notification;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> Result<ResponseJson<ApiResponse<NotificationList>>, ApiError> {
    let notifications = state
        .notifications
        .list(user_id, query.unread_only, query.limit)
        .await?;
    let unread_count = state.notifications.unread_count(user_id).await?;
    Ok(ResponseJson(ApiResponse::success(NotificationList {
        notifications,
        unread_count,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Notification>>, ApiError> {
    let notification = state.notifications.mark_read(notification_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<ResponseJson<ApiResponse<MarkAllReadResponse>>, ApiError> {
    let updated = state.notifications.mark_all_read(user_id).await?;
    Ok(ResponseJson(ApiResponse::success(MarkAllReadResponse {
        updated,
    })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.notifications.delete(notification_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/notifications",
        Router::new()
            .route("/", get(list_notifications))
            .route("/read-all", post(mark_all_read))
            .route("/{id}", delete(delete_notification))
            .route("/{id}/read", post(mark_read)),
    )
}

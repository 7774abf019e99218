use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::user::{CreateUser, UpdateUser, User};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReplacePreferences {
    pub tags: Vec<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = state.membership.create_profile(&payload).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = state.membership.profile(user_id).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    require_self(caller, user_id)?;
    let user = state.membership.update_profile(user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn replace_preferences(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ReplacePreferences>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    require_self(caller, user_id)?;
    let tags = state
        .membership
        .replace_preferences(user_id, &payload.tags)
        .await?;
    Ok(ResponseJson(ApiResponse::success(tags)))
}

fn require_self(caller: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    if caller != user_id {
        return Err(ApiError::Forbidden(
            "Profiles can only be edited by their owner".to_string(),
        ));
    }
    Ok(())
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/users",
        Router::new()
            .route("/", post(create_user))
            .route("/{id}", get(get_user).put(update_user))
            .route("/{id}/preferences", put(replace_preferences)),
    )
}

//! Routes for Nests: creation, membership and co-nest links.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::models::{
    family::{CoNest, CreateFamily, Family},
    user::User,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateFamilyPreferences {
    pub preferences: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LinkFamily {
    pub family_id: Uuid,
}

pub async fn create_family(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CreateFamily>,
) -> Result<ResponseJson<ApiResponse<Family>>, ApiError> {
    let family = state.membership.create_family(user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(family)))
}

pub async fn get_family(
    State(state): State<AppState>,
    Path(family_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Family>>, ApiError> {
    let family = state.membership.family(family_id).await?;
    Ok(ResponseJson(ApiResponse::success(family)))
}

pub async fn get_members(
    State(state): State<AppState>,
    Path(family_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let members = state.membership.members(family_id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn leave_family(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.membership.leave_family(user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(payload): Json<UpdateFamilyPreferences>,
) -> Result<ResponseJson<ApiResponse<Family>>, ApiError> {
    let family = state
        .membership
        .update_preferences(family_id, user_id, payload.preferences.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(family)))
}

pub async fn list_co_nests(
    State(state): State<AppState>,
    Path(family_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Family>>>, ApiError> {
    let families = state.membership.linked_families(family_id).await?;
    Ok(ResponseJson(ApiResponse::success(families)))
}

pub async fn link_co_nest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(family_id): Path<Uuid>,
    Json(payload): Json<LinkFamily>,
) -> Result<ResponseJson<ApiResponse<CoNest>>, ApiError> {
    let link = state
        .membership
        .link(family_id, payload.family_id, user_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(link)))
}

pub async fn unlink_co_nest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((family_id, other_family_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state
        .membership
        .unlink(family_id, other_family_id, user_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/families",
        Router::new()
            .route("/", post(create_family))
            .route("/leave", post(leave_family))
            .route("/{id}", get(get_family))
            .route("/{id}/members", get(get_members))
            .route("/{id}/preferences", put(update_preferences))
            .route("/{id}/co-nests", get(list_co_nests).post(link_co_nest))
            .route("/{id}/co-nests/{other}", delete(unlink_co_nest)),
    )
}

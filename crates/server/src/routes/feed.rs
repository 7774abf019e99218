use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::post::{Comment, CreateComment, CreatePost, Post, Share};
use serde::{Deserialize, Serialize};
use services::services::toggle::ToggleResult;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct SharePost {
    pub target_family_id: Option<Uuid>,
}

pub async fn get_feed(
    State(state): State<AppState>,
    Path(family_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Post>>>, ApiError> {
    let posts = state.feed.feed(family_id, query.limit).await?;
    Ok(ResponseJson(ApiResponse::success(posts)))
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CreatePost>,
) -> Result<ResponseJson<ApiResponse<Post>>, ApiError> {
    let post = state.feed.create_post(user_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.feed.delete_post(post_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ToggleResult>>, ApiError> {
    let result = state.feed.toggle_like(post_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Comment>>>, ApiError> {
    let comments = state.feed.list_comments(post_id).await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateComment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    let comment = state
        .feed
        .create_comment(post_id, user_id, &payload.content)
        .await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(comment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.feed.delete_comment(comment_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn share_post(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<Uuid>,
    payload: Option<Json<SharePost>>,
) -> Result<ResponseJson<ApiResponse<Share>>, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let share = state
        .feed
        .share(post_id, user_id, payload.target_family_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(share)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/families/{id}/feed", get(get_feed))
        .route("/posts", post(create_post))
        .route("/posts/{id}", delete(delete_post))
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/comments", get(list_comments).post(create_comment))
        .route("/posts/{id}/share", post(share_post))
        .route("/comments/{id}", delete(delete_comment))
}

//! Activity catalog, favorites, scored recommendations and suggestions.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    activity::{Activity, CreateActivity},
    suggestion::{Suggestion, SuggestionStatus},
};
use serde::{Deserialize, Serialize};
use services::services::{recommendation::ScoredActivity, toggle::ToggleResult};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

const DEFAULT_RECOMMENDATION_LIMIT: usize = 20;
const MAX_RECOMMENDATION_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT)
            .clamp(1, MAX_RECOMMENDATION_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub status: Option<SuggestionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateSuggestion {
    pub status: SuggestionStatus,
}

pub async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Activity>>>, ApiError> {
    let activities = state.catalog.list(query.category.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(activities)))
}

pub async fn create_activity(
    State(state): State<AppState>,
    Json(payload): Json<CreateActivity>,
) -> Result<ResponseJson<ApiResponse<Activity>>, ApiError> {
    let activity = state.catalog.create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success(activity)))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(activity_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ToggleResult>>, ApiError> {
    let result = state.catalog.toggle_favorite(activity_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<LimitQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ScoredActivity>>>, ApiError> {
    let ranked = state
        .recommendations
        .recommend_for_user(user_id, query.limit())
        .await?;
    Ok(ResponseJson(ApiResponse::success(ranked)))
}

pub async fn get_family_recommendations(
    State(state): State<AppState>,
    Path(family_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ScoredActivity>>>, ApiError> {
    let ranked = state.recommendations.recommend_for_family(family_id).await?;
    Ok(ResponseJson(ApiResponse::success(ranked)))
}

pub async fn create_suggestions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<LimitQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Suggestion>>>, ApiError> {
    let suggestions = state
        .recommendations
        .suggest_for_user(user_id, query.limit())
        .await?;
    Ok(ResponseJson(ApiResponse::success(suggestions)))
}

pub async fn list_suggestions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<SuggestionQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Suggestion>>>, ApiError> {
    let suggestions = state
        .recommendations
        .list_suggestions(user_id, query.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(suggestions)))
}

pub async fn update_suggestion(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(suggestion_id): Path<Uuid>,
    Json(payload): Json<UpdateSuggestion>,
) -> Result<ResponseJson<ApiResponse<Suggestion>>, ApiError> {
    let suggestion = state
        .recommendations
        .update_suggestion_status(suggestion_id, user_id, payload.status)
        .await?;
    Ok(ResponseJson(ApiResponse::success(suggestion)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route("/activities/{id}/favorite", post(toggle_favorite))
        .route("/recommendations", get(get_recommendations))
        .route(
            "/families/{id}/recommendations",
            get(get_family_recommendations),
        )
        .route("/suggestions", get(list_suggestions).post(create_suggestions))
        .route("/suggestions/{id}", put(update_suggestion))
}

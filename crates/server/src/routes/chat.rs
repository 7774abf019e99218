use axum::{
    Json, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::chat_message::ChatMessage;
use serde::{Deserialize, Serialize};
use services::services::chat_assistant::ChatReply;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EndSessionResponse {
    pub ended: bool,
}

pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<ChatRequest>,
) -> Result<ResponseJson<ApiResponse<ChatReply>>, ApiError> {
    let reply = state.chat.reply(user_id, &payload.message).await?;
    Ok(ResponseJson(ApiResponse::success(reply)))
}

pub async fn get_history(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ChatMessage>>>, ApiError> {
    let history = state.chat.history(user_id, query.limit).await?;
    Ok(ResponseJson(ApiResponse::success(history)))
}

/// Forget the caller's rate-limit session, as on logout.
pub async fn end_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ResponseJson<ApiResponse<EndSessionResponse>> {
    let ended = state.chat_sessions.end(user_id);
    ResponseJson(ApiResponse::success(EndSessionResponse { ended }))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/chat",
        Router::new()
            .route("/", post(send_message))
            .route("/history", get(get_history))
            .route("/session", delete(end_session)),
    )
}

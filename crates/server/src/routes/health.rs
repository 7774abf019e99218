use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use utils::response::ApiResponse;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub active_chat_sessions: usize,
    pub realtime_subscribers: usize,
}

pub async fn health(State(state): State<AppState>) -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok",
        active_chat_sessions: state.chat_sessions.active_sessions(),
        realtime_subscribers: state.realtime.subscriber_count(),
    }))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/health", get(health))
}

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{family::Family, invitation::Invitation};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateInvitation {
    pub family_id: Uuid,
    #[serde(default = "default_max_uses")]
    pub max_uses: i32,
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
}

fn default_max_uses() -> i32 {
    10
}

fn default_expiry_days() -> i64 {
    7
}

pub async fn create_invitation(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<CreateInvitation>,
) -> Result<ResponseJson<ApiResponse<Invitation>>, ApiError> {
    let invitation = state
        .invitations
        .create(
            payload.family_id,
            user_id,
            payload.max_uses,
            payload.expiry_days,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(invitation)))
}

pub async fn validate_invitation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<ResponseJson<ApiResponse<Family>>, ApiError> {
    let family = state.invitations.validate(&code).await?;
    Ok(ResponseJson(ApiResponse::success(family)))
}

pub async fn redeem_invitation(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<ResponseJson<ApiResponse<Family>>, ApiError> {
    let family = state.invitations.redeem(&code, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(family)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/invitations",
        Router::new()
            .route("/", post(create_invitation))
            .route("/{code}", get(validate_invitation))
            .route("/{code}/redeem", post(redeem_invitation)),
    )
}

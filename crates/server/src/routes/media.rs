use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    response::Json as ResponseJson,
    routing::put,
};
use serde::{Deserialize, Serialize};
use services::services::storage::MAX_UPLOAD_BYTES;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UploadResponse {
    pub url: String,
}

pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(_user_id): CurrentUser,
    Path((bucket, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<ResponseJson<ApiResponse<UploadResponse>>, ApiError> {
    let url = state.storage.upload(&bucket, &path, &body).await?;
    Ok(ResponseJson(ApiResponse::success(UploadResponse { url })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/media/{bucket}/{*path}",
        put(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    calendar::CalendarError, catalog::CatalogError, chat_assistant::ChatError, feed::FeedError,
    invitation::InvitationError, membership::MembershipError, notification::NotificationError,
    recommendation::RecommendationError, storage::StorageError, toggle::ToggleError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Recommendation(#[from] RecommendationError),
    #[error(transparent)]
    Toggle(#[from] ToggleError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Invitation(#[from] InvitationError),
    #[error(transparent)]
    Membership(#[from] MembershipError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Missing or invalid x-user-id header")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Recommendation(err) => match err {
                RecommendationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                RecommendationError::UserNotFound
                | RecommendationError::FamilyNotFound
                | RecommendationError::SuggestionNotFound => StatusCode::NOT_FOUND,
            },
            ApiError::Toggle(ToggleError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Catalog(err) => match err {
                CatalogError::Database(_) | CatalogError::Toggle(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::ActivityNotFound => StatusCode::NOT_FOUND,
            },
            ApiError::Invitation(err) => match err {
                InvitationError::Database(_) | InvitationError::CodeSpaceExhausted => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                InvitationError::NotFound | InvitationError::UserNotFound => StatusCode::NOT_FOUND,
                InvitationError::Expired | InvitationError::Exhausted => StatusCode::GONE,
                InvitationError::Validation(_) => StatusCode::BAD_REQUEST,
                InvitationError::NotAMember => StatusCode::FORBIDDEN,
            },
            ApiError::Membership(err) => match err {
                MembershipError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                MembershipError::Validation(_) => StatusCode::BAD_REQUEST,
                MembershipError::UserNotFound
                | MembershipError::FamilyNotFound
                | MembershipError::CoNestNotFound => StatusCode::NOT_FOUND,
                MembershipError::AlreadyInFamily => StatusCode::CONFLICT,
                MembershipError::NotAMember => StatusCode::FORBIDDEN,
            },
            ApiError::Feed(err) => match err {
                FeedError::Database(_) | FeedError::Toggle(_) => StatusCode::INTERNAL_SERVER_ERROR,
                FeedError::Validation(_) => StatusCode::BAD_REQUEST,
                FeedError::UserNotFound | FeedError::PostNotFound | FeedError::CommentNotFound => {
                    StatusCode::NOT_FOUND
                }
                FeedError::NoFamily => StatusCode::CONFLICT,
                FeedError::Forbidden => StatusCode::FORBIDDEN,
            },
            ApiError::Notification(err) => match err {
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                NotificationError::NotFound => StatusCode::NOT_FOUND,
            },
            ApiError::Calendar(err) => match err {
                CalendarError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CalendarError::Validation(_) => StatusCode::BAD_REQUEST,
                CalendarError::EventNotFound => StatusCode::NOT_FOUND,
                CalendarError::NotAMember | CalendarError::Forbidden => StatusCode::FORBIDDEN,
            },
            ApiError::Chat(err) => match err {
                ChatError::Validation(_) => StatusCode::BAD_REQUEST,
                ChatError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ChatError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            },
            ApiError::Storage(err) => match err {
                StorageError::InvalidPath(_) | StorageError::Empty => StatusCode::BAD_REQUEST,
                StorageError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "An internal error occurred. Please try again.".to_string()
        } else {
            self.to_string()
        };
        let response = ApiResponse::<()>::error(&message);
        (status, Json(response)).into_response()
    }
}

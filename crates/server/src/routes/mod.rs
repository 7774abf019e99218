use std::path::Path;

use axum::Router;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::AppState;

pub mod activities;
pub mod chat;
pub mod events;
pub mod families;
pub mod feed;
pub mod health;
pub mod invitations;
pub mod media;
pub mod notifications;
pub mod realtime;
pub mod users;

/// The JSON API under `/api`, plus uploaded media served from `media_root` under `/media`.
pub fn router(state: AppState, media_root: &Path) -> Router {
    let api = Router::new()
        .merge(health::router(&state))
        .merge(users::router(&state))
        .merge(families::router(&state))
        .merge(activities::router(&state))
        .merge(feed::router(&state))
        .merge(events::router(&state))
        .merge(notifications::router(&state))
        .merge(invitations::router(&state))
        .merge(chat::router(&state))
        .merge(media::router(&state))
        .merge(realtime::router(&state));

    Router::new()
        .nest("/api", api)
        .nest_service("/media", ServeDir::new(media_root))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

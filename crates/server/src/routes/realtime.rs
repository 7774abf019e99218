//! Server-Sent Events stream of newly inserted rows.

use std::{convert::Infallible, str::FromStr};

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use db::entity::EntityKind;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use services::services::realtime::RealtimeFilter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{AppState, error::ApiError, extract::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub family_id: Option<Uuid>,
}

pub async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(table): Path<String>,
    Query(query): Query<SubscribeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let table = EntityKind::from_str(&table)
        .map_err(|_| ApiError::NotFound(format!("Unknown table: {table}")))?;

    // Notifications are private: a subscriber only ever sees their own.
    let filter = RealtimeFilter {
        family_id: query.family_id,
        user_id: (table == EntityKind::Notification).then_some(user_id),
    };
    debug!(user_id = %user_id, table = %table, "Realtime subscription opened");

    let stream = state
        .realtime
        .subscribe(table, filter)
        .filter_map(move |event| async move {
            match Event::default().event(table.to_string()).json_data(&event) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(e) => {
                    warn!(table = %table, error = %e, "Failed to encode realtime event");
                    None
                }
            }
        });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/realtime/{table}", get(subscribe))
}

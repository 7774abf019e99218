use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, ListQuery, SortOrder};

/// One logged exchange with the assistant.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_message: String,
    pub assistant_reply: String,
    pub fallback: bool, // Reply is the canned message, the completion API failed
    pub created_at: DateTime<Utc>,
}

impl Entity for ChatMessage {
    const KIND: EntityKind = EntityKind::ChatMessage;
    const COLUMNS: &'static str = "id, user_id, user_message, assistant_reply, fallback, created_at";
}

impl ChatMessage {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        user_message: &str,
        assistant_reply: &str,
        fallback: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "INSERT INTO chat_messages (id, user_id, user_message, assistant_reply, fallback)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(user_message)
        .bind(assistant_reply)
        .bind(fallback)
        .fetch_one(pool)
        .await
    }

    /// Most recent exchanges first.
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        entity::list(
            pool,
            &ListQuery::new()
                .filter("user_id", user_id)
                .order_by("created_at", SortOrder::Desc)
                .limit(limit),
        )
        .await
    }
}

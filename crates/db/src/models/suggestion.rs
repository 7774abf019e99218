use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, ListQuery, SortOrder};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "suggestion_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Completed,
    Declined,
}

/// An activity recommended to a specific user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Suggestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub status: SuggestionStatus,
    pub match_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Suggestion {
    const KIND: EntityKind = EntityKind::Suggestion;
    const COLUMNS: &'static str =
        "id, user_id, activity_id, status, match_score, created_at, updated_at";
}

impl Suggestion {
    /// Insert a pending suggestion unless the pair already has one, then return the stored row.
    pub async fn create_if_absent(
        pool: &SqlitePool,
        user_id: Uuid,
        activity_id: Uuid,
        match_score: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            "INSERT INTO suggestions (id, user_id, activity_id, status, match_score)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT(user_id, activity_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(activity_id)
        .bind(SuggestionStatus::Pending)
        .bind(match_score)
        .execute(pool)
        .await?;

        sqlx::query_as::<_, Suggestion>(&format!(
            "SELECT {} FROM suggestions WHERE user_id = $1 AND activity_id = $2",
            Self::COLUMNS
        ))
        .bind(user_id)
        .bind(activity_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = ListQuery::new().filter("user_id", user_id);
        if let Some(status) = status {
            query = query.filter("status", status.to_string());
        }
        entity::list(pool, &query.order_by("match_score", SortOrder::Desc)).await
    }

    /// Accept or decline a suggestion owned by `user_id`.
    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
        status: SuggestionStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Suggestion>(&format!(
            "UPDATE suggestions
             SET status = $3, updated_at = datetime('now', 'subsec')
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }
}

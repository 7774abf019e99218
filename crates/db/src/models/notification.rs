use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, FilterValue, ListQuery, SortOrder};

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Share,
    Invitation,
    Event,
    System,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid, // Recipient
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub reference_id: Option<Uuid>, // Post, event or family the notification points at
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    const KIND: EntityKind = EntityKind::Notification;
    const COLUMNS: &'static str =
        "id, user_id, kind, title, body, reference_id, read_at, created_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub reference_id: Option<Uuid>,
}

impl Notification {
    pub async fn create(pool: &SqlitePool, data: &CreateNotification) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, user_id, kind, title, body, reference_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.kind)
        .bind(&data.title)
        .bind(&data.body)
        .bind(data.reference_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = ListQuery::new().filter("user_id", user_id);
        if unread_only {
            query = query.filter("read_at", FilterValue::Null);
        }
        entity::list(
            pool,
            &query.order_by("created_at", SortOrder::Desc).limit(limit),
        )
        .await
    }

    pub async fn count_unread(pool: &SqlitePool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        entity::count(
            pool,
            EntityKind::Notification,
            &ListQuery::new()
                .filter("user_id", user_id)
                .filter("read_at", FilterValue::Null),
        )
        .await
    }

    pub async fn mark_read(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications
             SET read_at = COALESCE(read_at, $3)
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn mark_all_read(pool: &SqlitePool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error> {
        entity::delete_where(
            pool,
            EntityKind::Notification,
            &ListQuery::new().filter("id", id).filter("user_id", user_id),
        )
        .await
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, ListQuery};

/// Calendar entry shared with a family (and with its co-nested families).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct FamilyEvent {
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for FamilyEvent {
    const KIND: EntityKind = EntityKind::FamilyEvent;
    const COLUMNS: &'static str = "id, family_id, created_by, title, description, location, starts_at, ends_at, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFamilyEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateFamilyEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl FamilyEvent {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        family_id: Uuid,
        created_by: Uuid,
        data: &CreateFamilyEvent,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FamilyEvent>(&format!(
            "INSERT INTO family_events (id, family_id, created_by, title, description, location, starts_at, ends_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(family_id)
        .bind(created_by)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.starts_at)
        .bind(data.ends_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        entity::find_by_id(pool, id).await
    }

    /// Events of any of `family_ids` starting inside `[from, to]`, earliest first.
    pub async fn find_for_families(
        pool: &SqlitePool,
        family_ids: &[Uuid],
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        if family_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM family_events WHERE family_id IN (",
            Self::COLUMNS
        ));
        let mut ids = builder.separated(", ");
        for id in family_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
        if let Some(from) = from {
            builder.push(" AND starts_at >= ").push_bind(from);
        }
        if let Some(to) = to {
            builder.push(" AND starts_at <= ").push_bind(to);
        }
        builder.push(" ORDER BY starts_at ASC, rowid ASC");
        builder.build_query_as::<FamilyEvent>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateFamilyEvent,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FamilyEvent>(&format!(
            "UPDATE family_events
             SET title       = COALESCE($2, title),
                 description = COALESCE($3, description),
                 location    = COALESCE($4, location),
                 starts_at   = COALESCE($5, starts_at),
                 ends_at     = COALESCE($6, ends_at),
                 updated_at  = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.starts_at)
        .bind(data.ends_at)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        entity::delete_where(pool, EntityKind::FamilyEvent, &ListQuery::new().filter("id", id))
            .await
    }
}

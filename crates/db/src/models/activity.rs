use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, ListQuery, SortOrder};

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "activity_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Catalog entry that can be recommended to a user or a whole family.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>, // Free-text tag
    pub difficulty: Option<Difficulty>,
    pub age_min: Option<i32>, // Inclusive
    pub age_max: Option<i32>, // Inclusive
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Activity {
    const KIND: EntityKind = EntityKind::Activity;
    const COLUMNS: &'static str =
        "id, title, description, category, difficulty, age_min, age_max, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateActivity {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
}

impl Activity {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateActivity,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Activity>(&format!(
            "INSERT INTO activities (id, title, description, category, difficulty, age_min, age_max)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(data.difficulty)
        .bind(data.age_min)
        .bind(data.age_max)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        entity::find_by_id(pool, id).await
    }

    /// Full catalog in insertion order.
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        entity::list(
            pool,
            &ListQuery::new().order_by("created_at", SortOrder::Asc),
        )
        .await
    }

    pub async fn find_by_category(
        pool: &SqlitePool,
        category: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        entity::list(
            pool,
            &ListQuery::new()
                .filter("category", category)
                .order_by("created_at", SortOrder::Asc),
        )
        .await
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, ListQuery, SortOrder};

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Parent,
    Teen,
    Child,
    Grandparent,
    Admin,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub role: Option<UserRole>,
    pub family_id: Option<Uuid>, // Null until onboarding completes or after leaving
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
    const COLUMNS: &'static str =
        "id, display_name, email, age, role, family_id, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub display_name: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateUser {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub role: Option<UserRole>,
}

impl User {
    pub async fn create(pool: &SqlitePool, data: &CreateUser, id: Uuid) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, display_name, email, age, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(&data.display_name)
        .bind(&data.email)
        .bind(data.age)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        entity::find_by_id(pool, id).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET display_name = COALESCE($2, display_name),
                 email        = COALESCE($3, email),
                 age          = COALESCE($4, age),
                 role         = COALESCE($5, role),
                 updated_at   = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(&data.display_name)
        .bind(&data.email)
        .bind(data.age)
        .bind(data.role)
        .fetch_optional(pool)
        .await
    }

    /// Attach the user to a family, or detach with `None` (soft removal).
    pub async fn set_family<'e, E>(
        executor: E,
        user_id: Uuid,
        family_id: Option<Uuid>,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE users SET family_id = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(user_id)
        .bind(family_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_family_id(
        pool: &SqlitePool,
        family_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        entity::list(
            pool,
            &ListQuery::new()
                .filter("family_id", family_id)
                .order_by("created_at", SortOrder::Asc),
        )
        .await
    }

    pub async fn count_by_family_id(pool: &SqlitePool, family_id: Uuid) -> Result<i64, sqlx::Error> {
        entity::count(
            pool,
            EntityKind::User,
            &ListQuery::new().filter("family_id", family_id),
        )
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserPreference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tag: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for UserPreference {
    const KIND: EntityKind = EntityKind::UserPreference;
    const COLUMNS: &'static str = "id, user_id, tag, created_at";
}

impl UserPreference {
    pub async fn find_tags_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<UserPreference> = entity::list(
            pool,
            &ListQuery::new()
                .filter("user_id", user_id)
                .order_by("created_at", SortOrder::Asc),
        )
        .await?;
        Ok(rows.into_iter().map(|p| p.tag).collect())
    }

    /// Replace the user's tag set. Blank and repeated tags are dropped.
    pub async fn replace_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
        tags: &[String],
    ) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM user_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let mut kept: Vec<String> = Vec::new();
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if kept.iter().any(|k| k == tag) {
                continue;
            }
            sqlx::query("INSERT INTO user_preferences (id, user_id, tag) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
            kept.push(tag.to_string());
        }
        tx.commit().await?;
        Ok(kept)
    }
}

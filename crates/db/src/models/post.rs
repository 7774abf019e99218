use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind, ListQuery, SortOrder};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Post {
    pub id: Uuid,
    pub family_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media_url: Option<String>, // Public URL returned by object storage
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Post {
    const KIND: EntityKind = EntityKind::Post;
    const COLUMNS: &'static str =
        "id, family_id, author_id, content, media_url, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreatePost {
    pub content: String,
    pub media_url: Option<String>,
}

impl Post {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        family_id: Uuid,
        author_id: Uuid,
        data: &CreatePost,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (id, family_id, author_id, content, media_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(family_id)
        .bind(author_id)
        .bind(data.content.trim())
        .bind(&data.media_url)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        entity::find_by_id(pool, id).await
    }

    /// Newest first.
    pub async fn find_by_family_id(
        pool: &SqlitePool,
        family_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        entity::list(
            pool,
            &ListQuery::new()
                .filter("family_id", family_id)
                .order_by("created_at", SortOrder::Desc)
                .limit(limit),
        )
        .await
    }

    /// Delete a post only when `author_id` wrote it.
    pub async fn delete_by_author(
        pool: &SqlitePool,
        id: Uuid,
        author_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        entity::delete_where(
            pool,
            EntityKind::Post,
            &ListQuery::new().filter("id", id).filter("author_id", author_id),
        )
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Comment {
    const KIND: EntityKind = EntityKind::Comment;
    const COLUMNS: &'static str = "id, post_id, author_id, content, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateComment {
    pub content: String,
}

impl Comment {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        post_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (id, post_id, author_id, content)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        entity::find_by_id(pool, id).await
    }

    /// Oldest first, as a conversation reads.
    pub async fn find_by_post_id(
        pool: &SqlitePool,
        post_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        entity::list(
            pool,
            &ListQuery::new()
                .filter("post_id", post_id)
                .order_by("created_at", SortOrder::Asc),
        )
        .await
    }

    pub async fn delete_by_author(
        pool: &SqlitePool,
        id: Uuid,
        author_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        entity::delete_where(
            pool,
            EntityKind::Comment,
            &ListQuery::new().filter("id", id).filter("author_id", author_id),
        )
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Share {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub target_family_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Share {
    const KIND: EntityKind = EntityKind::Share;
    const COLUMNS: &'static str = "id, post_id, user_id, target_family_id, created_at";
}

impl Share {
    pub async fn create(
        pool: &SqlitePool,
        post_id: Uuid,
        user_id: Uuid,
        target_family_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Share>(&format!(
            "INSERT INTO shares (id, post_id, user_id, target_family_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(user_id)
        .bind(target_family_id)
        .fetch_one(pool)
        .await
    }

    pub async fn count_by_post_id(pool: &SqlitePool, post_id: Uuid) -> Result<i64, sqlx::Error> {
        entity::count(
            pool,
            EntityKind::Share,
            &ListQuery::new().filter("post_id", post_id),
        )
        .await
    }
}

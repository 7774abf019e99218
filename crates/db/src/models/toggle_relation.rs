//! At-most-one `(target, user)` relationships: post likes and activity favorites.
//!
//! Uniqueness is enforced by the table's unique constraint, not here.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, EntityKind, ListQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToggleRelation {
    PostLike,
    ActivityFavorite,
}

impl ToggleRelation {
    pub const fn entity(self) -> EntityKind {
        match self {
            ToggleRelation::PostLike => EntityKind::PostLike,
            ToggleRelation::ActivityFavorite => EntityKind::ActivityFavorite,
        }
    }

    pub const fn target_column(self) -> &'static str {
        match self {
            ToggleRelation::PostLike => "post_id",
            ToggleRelation::ActivityFavorite => "activity_id",
        }
    }

    fn pair(self, target_id: Uuid, user_id: Uuid) -> ListQuery {
        ListQuery::new()
            .filter(self.target_column(), target_id)
            .filter("user_id", user_id)
    }

    pub async fn exists(
        self,
        pool: &SqlitePool,
        target_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        entity::exists(pool, self.entity(), &self.pair(target_id, user_id)).await
    }

    /// Insert the pair. A concurrent insert of the same pair fails with a unique violation.
    pub async fn insert(
        self,
        pool: &SqlitePool,
        target_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        let sql = format!(
            "INSERT INTO {} (id, {}, user_id) VALUES ($1, $2, $3)",
            self.entity().table_name(),
            self.target_column()
        );
        sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(target_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(
        self,
        pool: &SqlitePool,
        target_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        entity::delete_where(pool, self.entity(), &self.pair(target_id, user_id)).await
    }

    pub async fn count(self, pool: &SqlitePool, target_id: Uuid) -> Result<i64, sqlx::Error> {
        entity::count(
            pool,
            self.entity(),
            &ListQuery::new().filter(self.target_column(), target_id),
        )
        .await
    }
}

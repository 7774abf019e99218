use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{self, Entity, EntityKind};

/// A Nest: a named household that users belong to through `users.family_id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub preferences: Option<String>, // Free text, comma separated when used as default tags
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Family {
    const KIND: EntityKind = EntityKind::Family;
    const COLUMNS: &'static str = "id, name, preferences, created_by, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFamily {
    pub name: String,
    pub preferences: Option<String>,
}

impl Family {
    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        data: &CreateFamily,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Family>(&format!(
            "INSERT INTO families (id, name, preferences, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.preferences)
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        entity::find_by_id(pool, id).await
    }

    pub async fn update_preferences(
        pool: &SqlitePool,
        id: Uuid,
        preferences: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Family>(&format!(
            "UPDATE families
             SET preferences = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(id)
        .bind(preferences)
        .fetch_optional(pool)
        .await
    }
}

/// Bidirectional link between two Nests, stored with `family_a < family_b`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CoNest {
    pub id: Uuid,
    pub family_a: Uuid,
    pub family_b: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Entity for CoNest {
    const KIND: EntityKind = EntityKind::CoNest;
    const COLUMNS: &'static str = "id, family_a, family_b, created_by, created_at";
}

fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

impl CoNest {
    /// The family on the other side of this link from `family_id`.
    pub fn other(&self, family_id: Uuid) -> Uuid {
        if self.family_a == family_id {
            self.family_b
        } else {
            self.family_a
        }
    }

    /// Link two families. Linking an already linked pair returns the existing link.
    pub async fn link(
        pool: &SqlitePool,
        family_id: Uuid,
        other_family_id: Uuid,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let (a, b) = ordered_pair(family_id, other_family_id);
        sqlx::query(
            "INSERT INTO co_nests (id, family_a, family_b, created_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT(family_a, family_b) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(a)
        .bind(b)
        .bind(created_by)
        .execute(pool)
        .await?;

        Self::find_pair(pool, a, b)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_pair(
        pool: &SqlitePool,
        family_id: Uuid,
        other_family_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (a, b) = ordered_pair(family_id, other_family_id);
        sqlx::query_as::<_, CoNest>(&format!(
            "SELECT {} FROM co_nests WHERE family_a = $1 AND family_b = $2",
            Self::COLUMNS
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(pool)
        .await
    }

    pub async fn unlink(
        pool: &SqlitePool,
        family_id: Uuid,
        other_family_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let (a, b) = ordered_pair(family_id, other_family_id);
        let result = sqlx::query("DELETE FROM co_nests WHERE family_a = $1 AND family_b = $2")
            .bind(a)
            .bind(b)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_family_id(
        pool: &SqlitePool,
        family_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CoNest>(&format!(
            "SELECT {} FROM co_nests
             WHERE family_a = $1 OR family_b = $1
             ORDER BY created_at ASC, rowid ASC",
            Self::COLUMNS
        ))
        .bind(family_id)
        .fetch_all(pool)
        .await
    }

    /// Ids of every family linked to `family_id`.
    pub async fn linked_family_ids(
        pool: &SqlitePool,
        family_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        Ok(Self::find_by_family_id(pool, family_id)
            .await?
            .iter()
            .map(|link| link.other(family_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::user::{CreateUser, User},
    };

    async fn seed_family(db: &DBService, name: &str) -> (Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                display_name: format!("{name} admin"),
                email: None,
                age: None,
                role: None,
            },
            user_id,
        )
        .await
        .unwrap();
        let family = Family::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFamily {
                name: name.to_string(),
                preferences: None,
            },
            user_id,
        )
        .await
        .unwrap();
        (family.id, user_id)
    }

    #[tokio::test]
    async fn co_nest_links_are_symmetric_and_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let (martin, user) = seed_family(&db, "Martin").await;
        let (durand, _) = seed_family(&db, "Durand").await;

        let first = CoNest::link(&db.pool, martin, durand, user).await.unwrap();
        let second = CoNest::link(&db.pool, durand, martin, user).await.unwrap();
        assert_eq!(first.id, second.id);

        assert_eq!(
            CoNest::linked_family_ids(&db.pool, martin).await.unwrap(),
            vec![durand]
        );
        assert_eq!(
            CoNest::linked_family_ids(&db.pool, durand).await.unwrap(),
            vec![martin]
        );

        assert_eq!(CoNest::unlink(&db.pool, durand, martin).await.unwrap(), 1);
        assert!(CoNest::linked_family_ids(&db.pool, martin).await.unwrap().is_empty());
    }
}

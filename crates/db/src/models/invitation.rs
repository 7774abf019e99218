use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use crate::entity::{Entity, EntityKind};

/// Why an invitation code can no longer be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationState {
    Usable,
    Expired,
    Exhausted,
}

/// A time-boxed, use-limited join code for a family.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Invitation {
    pub id: Uuid,
    pub code: String,
    pub family_id: Uuid,
    pub created_by: Uuid,
    pub max_uses: i32,
    pub uses_count: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Invitation {
    const KIND: EntityKind = EntityKind::Invitation;
    const COLUMNS: &'static str =
        "id, code, family_id, created_by, max_uses, uses_count, expires_at, created_at";
}

impl Invitation {
    /// Expiry wins over exhaustion when both apply.
    pub fn state_at(&self, now: DateTime<Utc>) -> InvitationState {
        if now > self.expires_at {
            InvitationState::Expired
        } else if self.uses_count >= self.max_uses {
            InvitationState::Exhausted
        } else {
            InvitationState::Usable
        }
    }

    pub async fn create(
        pool: &SqlitePool,
        code: &str,
        family_id: Uuid,
        created_by: Uuid,
        max_uses: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            "INSERT INTO invitations (id, code, family_id, created_by, max_uses, uses_count, expires_at)
             VALUES ($1, $2, $3, $4, $5, 0, $6)
             RETURNING {}",
            Self::COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(family_id)
        .bind(created_by)
        .bind(max_uses)
        .bind(expires_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {} FROM invitations WHERE code = $1",
            Self::COLUMNS
        ))
        .bind(code)
        .fetch_optional(pool)
        .await
    }

    /// Take one use of the code in a single conditional update.
    ///
    /// Returns `false` when the code is unknown, expired or already at `max_uses`.
    pub async fn consume<'e, E>(
        executor: E,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE invitations
             SET uses_count = uses_count + 1
             WHERE code = $1 AND uses_count < max_uses AND expires_at >= $2",
        )
        .bind(code)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

//! Toggle semantics for at-most-one relationships (likes, favorites).
//!
//! Concurrent toggles on the same pair are settled by the table's unique
//! constraint: an insert that loses the race reports the pair as active.

use db::{is_unique_violation, models::toggle_relation::ToggleRelation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ToggleResult {
    pub active: bool,
}

/// What a toggle did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Inserted,
    /// Another request inserted the pair between our check and our insert.
    AlreadyActive,
    Removed,
}

impl From<ToggleOutcome> for ToggleResult {
    fn from(outcome: ToggleOutcome) -> Self {
        ToggleResult {
            active: outcome != ToggleOutcome::Removed,
        }
    }
}

pub async fn toggle(
    pool: &SqlitePool,
    relation: ToggleRelation,
    target_id: Uuid,
    user_id: Uuid,
) -> Result<ToggleOutcome, ToggleError> {
    if relation.exists(pool, target_id, user_id).await? {
        relation.delete(pool, target_id, user_id).await?;
        return Ok(ToggleOutcome::Removed);
    }
    activate(pool, relation, target_id, user_id).await
}

/// Insert the pair, treating a duplicate-key rejection as already active.
pub async fn activate(
    pool: &SqlitePool,
    relation: ToggleRelation,
    target_id: Uuid,
    user_id: Uuid,
) -> Result<ToggleOutcome, ToggleError> {
    match relation.insert(pool, target_id, user_id).await {
        Ok(()) => Ok(ToggleOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => {
            debug!(
                relation = %relation,
                target_id = %target_id,
                user_id = %user_id,
                "Concurrent toggle already inserted the pair"
            );
            Ok(ToggleOutcome::AlreadyActive)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            activity::{Activity, CreateActivity},
            user::{CreateUser, User},
        },
    };

    use super::*;

    async fn seed(db: &DBService) -> (Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                display_name: "Sam".to_string(),
                email: None,
                age: None,
                role: None,
            },
            user_id,
        )
        .await
        .unwrap();
        let activity_id = Uuid::new_v4();
        Activity::create(
            &db.pool,
            &CreateActivity {
                title: "Pique-nique".to_string(),
                description: None,
                category: None,
                difficulty: None,
                age_min: None,
                age_max: None,
            },
            activity_id,
        )
        .await
        .unwrap();
        (activity_id, user_id)
    }

    #[tokio::test]
    async fn sequential_toggles_flip_the_pair() {
        let db = DBService::new_in_memory().await.unwrap();
        let (activity_id, user_id) = seed(&db).await;
        let relation = ToggleRelation::ActivityFavorite;

        let first = toggle(&db.pool, relation, activity_id, user_id).await.unwrap();
        assert_eq!(ToggleResult::from(first), ToggleResult { active: true });
        assert_eq!(relation.count(&db.pool, activity_id).await.unwrap(), 1);

        let second = toggle(&db.pool, relation, activity_id, user_id).await.unwrap();
        assert_eq!(ToggleResult::from(second), ToggleResult { active: false });
        assert_eq!(relation.count(&db.pool, activity_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn losing_insert_race_reports_active_without_duplicate() {
        let db = DBService::new_in_memory().await.unwrap();
        let (activity_id, user_id) = seed(&db).await;
        let relation = ToggleRelation::ActivityFavorite;

        // Both requests saw "absent" and went straight to insert.
        let a = activate(&db.pool, relation, activity_id, user_id).await.unwrap();
        let b = activate(&db.pool, relation, activity_id, user_id).await.unwrap();
        assert_eq!(a, ToggleOutcome::Inserted);
        assert_eq!(b, ToggleOutcome::AlreadyActive);
        assert!(ToggleResult::from(b).active);
        assert_eq!(relation.count(&db.pool, activity_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_toggles_on_fresh_pair_both_report_active() {
        let db = DBService::new_in_memory().await.unwrap();
        let (activity_id, user_id) = seed(&db).await;
        let relation = ToggleRelation::ActivityFavorite;

        // Both requests check before either inserts.
        let (seen_a, seen_b) = tokio::join!(
            relation.exists(&db.pool, activity_id, user_id),
            relation.exists(&db.pool, activity_id, user_id)
        );
        assert!(!seen_a.unwrap());
        assert!(!seen_b.unwrap());

        let (a, b) = tokio::join!(
            activate(&db.pool, relation, activity_id, user_id),
            activate(&db.pool, relation, activity_id, user_id)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(ToggleResult::from(a).active);
        assert!(ToggleResult::from(b).active);
        let mut outcomes = [a, b];
        outcomes.sort_by_key(|o| *o != ToggleOutcome::Inserted);
        assert_eq!(
            outcomes,
            [ToggleOutcome::Inserted, ToggleOutcome::AlreadyActive]
        );
        assert_eq!(relation.count(&db.pool, activity_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn joined_toggles_agree_with_stored_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        let (activity_id, user_id) = seed(&db).await;
        let relation = ToggleRelation::ActivityFavorite;

        let (a, b) = tokio::join!(
            toggle(&db.pool, relation, activity_id, user_id),
            toggle(&db.pool, relation, activity_id, user_id)
        );
        let (a, b) = (ToggleResult::from(a.unwrap()), ToggleResult::from(b.unwrap()));
        let count = relation.count(&db.pool, activity_id).await.unwrap();
        assert!(count <= 1);
        // Interleaved checks leave one row and two active results; serialized ones cancel out.
        if a.active && b.active {
            assert_eq!(count, 1);
        } else {
            assert_ne!(a.active, b.active);
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn other_store_errors_propagate() {
        let db = DBService::new_in_memory().await.unwrap();
        let (_, user_id) = seed(&db).await;
        // Unknown activity violates the foreign key, which is not a duplicate.
        let result = activate(
            &db.pool,
            ToggleRelation::ActivityFavorite,
            Uuid::new_v4(),
            user_id,
        )
        .await;
        assert!(matches!(result, Err(ToggleError::Database(_))));
    }
}

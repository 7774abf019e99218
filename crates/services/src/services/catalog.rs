//! Activity catalog and per-user favorites.

use db::models::{
    activity::{Activity, CreateActivity},
    toggle_relation::ToggleRelation,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::toggle::{self, ToggleError, ToggleResult};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Toggle(#[from] ToggleError),
    #[error("{0}")]
    Validation(String),
    #[error("Activity not found")]
    ActivityNotFound,
}

#[derive(Clone)]
pub struct CatalogService {
    pool: SqlitePool,
}

impl CatalogService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Activity>, CatalogError> {
        let activities = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => Activity::find_by_category(&self.pool, category).await?,
            None => Activity::find_all(&self.pool).await?,
        };
        Ok(activities)
    }

    pub async fn create(&self, data: &CreateActivity) -> Result<Activity, CatalogError> {
        if data.title.trim().is_empty() {
            return Err(CatalogError::Validation(
                "Activity title cannot be empty".to_string(),
            ));
        }
        match (data.age_min, data.age_max) {
            (Some(min), Some(max)) if min > max => {
                return Err(CatalogError::Validation(format!(
                    "age_min ({min}) is greater than age_max ({max})"
                )));
            }
            _ => {}
        }
        if data.age_min.is_some_and(|a| a < 0) || data.age_max.is_some_and(|a| a < 0) {
            return Err(CatalogError::Validation(
                "Age bounds cannot be negative".to_string(),
            ));
        }
        let activity = Activity::create(&self.pool, data, Uuid::new_v4()).await?;
        info!(activity_id = %activity.id, "Activity created");
        Ok(activity)
    }

    pub async fn toggle_favorite(
        &self,
        activity_id: Uuid,
        user_id: Uuid,
    ) -> Result<ToggleResult, CatalogError> {
        Activity::find_by_id(&self.pool, activity_id)
            .await?
            .ok_or(CatalogError::ActivityNotFound)?;
        let outcome = toggle::toggle(
            &self.pool,
            ToggleRelation::ActivityFavorite,
            activity_id,
            user_id,
        )
        .await?;
        Ok(outcome.into())
    }

    pub async fn favorite_count(&self, activity_id: Uuid) -> Result<i64, CatalogError> {
        Ok(ToggleRelation::ActivityFavorite
            .count(&self.pool, activity_id)
            .await?)
    }

    pub async fn is_favorite(&self, activity_id: Uuid, user_id: Uuid) -> Result<bool, CatalogError> {
        Ok(ToggleRelation::ActivityFavorite
            .exists(&self.pool, activity_id, user_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::user::{CreateUser, User},
    };

    use super::*;

    fn hike() -> CreateActivity {
        CreateActivity {
            title: "Randonnée".to_string(),
            description: None,
            category: Some("Nature".to_string()),
            difficulty: None,
            age_min: Some(8),
            age_max: Some(80),
        }
    }

    #[tokio::test]
    async fn create_validates_age_bounds() {
        let db = DBService::new_in_memory().await.unwrap();
        let catalog = CatalogService::new(db.pool);

        let inverted = CreateActivity {
            age_min: Some(12),
            age_max: Some(6),
            ..hike()
        };
        assert!(matches!(
            catalog.create(&inverted).await,
            Err(CatalogError::Validation(_))
        ));
        catalog.create(&hike()).await.unwrap();
        assert_eq!(catalog.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn favorite_toggles_and_counts() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                display_name: "Eva".to_string(),
                email: None,
                age: None,
                role: None,
            },
            user_id,
        )
        .await
        .unwrap();
        let catalog = CatalogService::new(db.pool);
        let activity = catalog.create(&hike()).await.unwrap();

        assert!(catalog.toggle_favorite(activity.id, user_id).await.unwrap().active);
        assert!(catalog.is_favorite(activity.id, user_id).await.unwrap());
        assert_eq!(catalog.favorite_count(activity.id).await.unwrap(), 1);
        assert!(!catalog.toggle_favorite(activity.id, user_id).await.unwrap().active);
        assert_eq!(catalog.favorite_count(activity.id).await.unwrap(), 0);

        assert!(matches!(
            catalog.toggle_favorite(Uuid::new_v4(), user_id).await,
            Err(CatalogError::ActivityNotFound)
        ));
    }
}

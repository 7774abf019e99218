//! Profiles, Nests (families) and the links between Nests.

use db::models::{
    family::{CoNest, CreateFamily, Family},
    user::{CreateUser, UpdateUser, User, UserPreference},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("User not found")]
    UserNotFound,
    #[error("Family not found")]
    FamilyNotFound,
    #[error("User already belongs to a family")]
    AlreadyInFamily,
    #[error("User is not a member of this family")]
    NotAMember,
    #[error("Families are not linked")]
    CoNestNotFound,
}

#[derive(Clone)]
pub struct MembershipService {
    pool: SqlitePool,
}

impl MembershipService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_profile(&self, data: &CreateUser) -> Result<User, MembershipError> {
        if data.display_name.trim().is_empty() {
            return Err(MembershipError::Validation(
                "display_name cannot be empty".to_string(),
            ));
        }
        validate_age(data.age)?;
        let user = User::create(&self.pool, data, Uuid::new_v4()).await?;
        info!(user_id = %user.id, "Profile created");
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, MembershipError> {
        User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(MembershipError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        data: &UpdateUser,
    ) -> Result<User, MembershipError> {
        if data
            .display_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(MembershipError::Validation(
                "display_name cannot be empty".to_string(),
            ));
        }
        validate_age(data.age)?;
        User::update(&self.pool, user_id, data)
            .await?
            .ok_or(MembershipError::UserNotFound)
    }

    pub async fn replace_preferences(
        &self,
        user_id: Uuid,
        tags: &[String],
    ) -> Result<Vec<String>, MembershipError> {
        self.profile(user_id).await?;
        Ok(UserPreference::replace_for_user(&self.pool, user_id, tags).await?)
    }

    /// Create a Nest and make `user_id` its first member in one transaction.
    pub async fn create_family(
        &self,
        user_id: Uuid,
        data: &CreateFamily,
    ) -> Result<Family, MembershipError> {
        if data.name.trim().is_empty() {
            return Err(MembershipError::Validation(
                "Family name cannot be empty".to_string(),
            ));
        }
        let user = self.profile(user_id).await?;
        if user.family_id.is_some() {
            return Err(MembershipError::AlreadyInFamily);
        }

        let mut tx = self.pool.begin().await?;
        let family = Family::create(&mut *tx, Uuid::new_v4(), data, user_id).await?;
        User::set_family(&mut *tx, user_id, Some(family.id)).await?;
        tx.commit().await?;

        info!(family_id = %family.id, user_id = %user_id, "Family created");
        Ok(family)
    }

    pub async fn family(&self, family_id: Uuid) -> Result<Family, MembershipError> {
        Family::find_by_id(&self.pool, family_id)
            .await?
            .ok_or(MembershipError::FamilyNotFound)
    }

    pub async fn members(&self, family_id: Uuid) -> Result<Vec<User>, MembershipError> {
        self.family(family_id).await?;
        Ok(User::find_by_family_id(&self.pool, family_id).await?)
    }

    /// Detach the user from their family. The family and its content stay.
    pub async fn leave_family(&self, user_id: Uuid) -> Result<(), MembershipError> {
        let user = self.profile(user_id).await?;
        let family_id = user.family_id.ok_or(MembershipError::NotAMember)?;
        User::set_family(&self.pool, user_id, None).await?;
        info!(family_id = %family_id, user_id = %user_id, "User left family");
        Ok(())
    }

    pub async fn update_preferences(
        &self,
        family_id: Uuid,
        user_id: Uuid,
        preferences: Option<&str>,
    ) -> Result<Family, MembershipError> {
        self.require_member(family_id, user_id).await?;
        let preferences = preferences.map(str::trim).filter(|p| !p.is_empty());
        Family::update_preferences(&self.pool, family_id, preferences)
            .await?
            .ok_or(MembershipError::FamilyNotFound)
    }

    pub async fn link(
        &self,
        family_id: Uuid,
        other_family_id: Uuid,
        user_id: Uuid,
    ) -> Result<CoNest, MembershipError> {
        if family_id == other_family_id {
            return Err(MembershipError::Validation(
                "A family cannot be linked to itself".to_string(),
            ));
        }
        self.require_member(family_id, user_id).await?;
        self.family(other_family_id).await?;
        let link = CoNest::link(&self.pool, family_id, other_family_id, user_id).await?;
        info!(family_id = %family_id, other_family_id = %other_family_id, "Co-nest linked");
        Ok(link)
    }

    pub async fn unlink(
        &self,
        family_id: Uuid,
        other_family_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), MembershipError> {
        self.require_member(family_id, user_id).await?;
        match CoNest::unlink(&self.pool, family_id, other_family_id).await? {
            0 => Err(MembershipError::CoNestNotFound),
            _ => Ok(()),
        }
    }

    /// Families linked to `family_id`, oldest link first.
    pub async fn linked_families(&self, family_id: Uuid) -> Result<Vec<Family>, MembershipError> {
        self.family(family_id).await?;
        let mut families = Vec::new();
        for id in CoNest::linked_family_ids(&self.pool, family_id).await? {
            if let Some(family) = Family::find_by_id(&self.pool, id).await? {
                families.push(family);
            }
        }
        Ok(families)
    }

    async fn require_member(&self, family_id: Uuid, user_id: Uuid) -> Result<User, MembershipError> {
        let user = self.profile(user_id).await?;
        if user.family_id != Some(family_id) {
            return Err(MembershipError::NotAMember);
        }
        Ok(user)
    }
}

fn validate_age(age: Option<i32>) -> Result<(), MembershipError> {
    match age {
        Some(age) if !(0..=130).contains(&age) => Err(MembershipError::Validation(format!(
            "age must be between 0 and 130, got {age}"
        ))),
        _ => Ok(()),
    }
}

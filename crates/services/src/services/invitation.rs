//! Family invitation codes: short, human-typable, time boxed and use limited.

use chrono::{Duration, Utc};
use db::{
    is_unique_violation,
    models::{
        family::Family,
        invitation::{Invitation, InvitationState},
        notification::NotificationKind,
        user::User,
    },
};
use rand::Rng;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use utils::text::normalize_code;
use uuid::Uuid;

use super::notification::NotificationService;

/// Uppercase letters and digits without the look-alikes `0 O 1 I`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 8;
const MAX_CODE_ATTEMPTS: usize = 5;
pub const MAX_EXPIRY_DAYS: i64 = 365;

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Invitation code not found")]
    NotFound,
    #[error("Invitation code has expired")]
    Expired,
    #[error("Invitation code has no uses left")]
    Exhausted,
    #[error("{0}")]
    Validation(String),
    #[error("Only members of the family can invite to it")]
    NotAMember,
    #[error("User not found")]
    UserNotFound,
    #[error("Could not generate a unique invitation code")]
    CodeSpaceExhausted,
}

pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct InvitationService {
    pool: SqlitePool,
    notifications: NotificationService,
}

impl InvitationService {
    pub fn new(pool: SqlitePool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    pub async fn create(
        &self,
        family_id: Uuid,
        creator_id: Uuid,
        max_uses: i32,
        expiry_days: i64,
    ) -> Result<Invitation, InvitationError> {
        if max_uses < 1 {
            return Err(InvitationError::Validation(
                "max_uses must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_EXPIRY_DAYS).contains(&expiry_days) {
            return Err(InvitationError::Validation(format!(
                "expiry_days must be between 1 and {}",
                MAX_EXPIRY_DAYS
            )));
        }
        let creator = User::find_by_id(&self.pool, creator_id)
            .await?
            .ok_or(InvitationError::UserNotFound)?;
        if creator.family_id != Some(family_id) {
            return Err(InvitationError::NotAMember);
        }

        let expires_at = Utc::now() + Duration::days(expiry_days);
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_code(&mut rand::thread_rng());
            match Invitation::create(&self.pool, &code, family_id, creator_id, max_uses, expires_at)
                .await
            {
                Ok(invitation) => {
                    info!(
                        family_id = %family_id,
                        invitation_id = %invitation.id,
                        max_uses,
                        "Invitation created"
                    );
                    return Ok(invitation);
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!(attempt, "Invitation code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(InvitationError::CodeSpaceExhausted)
    }

    /// Look a code up and check it can still be used. Expiry is reported before exhaustion.
    pub async fn validate(&self, code: &str) -> Result<Family, InvitationError> {
        let invitation = self.usable_invitation(code).await?;
        Family::find_by_id(&self.pool, invitation.family_id)
            .await?
            .ok_or(InvitationError::NotFound)
    }

    /// Take one use of the code.
    pub async fn consume(&self, code: &str) -> Result<(), InvitationError> {
        let code = normalize_code(code);
        if Invitation::consume(&self.pool, &code, Utc::now()).await? {
            Ok(())
        } else {
            Err(self.rejection(&code).await)
        }
    }

    /// Join the code's family: validate, consume one use, attach the user and tell the inviter.
    ///
    /// A user who already belongs to the family gets it back without spending a use.
    pub async fn redeem(&self, code: &str, user_id: Uuid) -> Result<Family, InvitationError> {
        let code = normalize_code(code);
        let invitation = self.usable_invitation(&code).await?;
        let user = User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(InvitationError::UserNotFound)?;
        let family = Family::find_by_id(&self.pool, invitation.family_id)
            .await?
            .ok_or(InvitationError::NotFound)?;
        if user.family_id == Some(family.id) {
            return Ok(family);
        }

        let mut tx = self.pool.begin().await?;
        if !Invitation::consume(&mut *tx, &code, Utc::now()).await? {
            tx.rollback().await?;
            return Err(self.rejection(&code).await);
        }
        User::set_family(&mut *tx, user_id, Some(family.id)).await?;
        tx.commit().await?;

        info!(user_id = %user_id, family_id = %family.id, "Invitation redeemed");
        self.notifications
            .notify_best_effort(
                invitation.created_by,
                NotificationKind::Invitation,
                format!("{} a rejoint {}", user.display_name, family.name),
                None,
                Some(family.id),
            )
            .await;
        Ok(family)
    }

    async fn usable_invitation(&self, code: &str) -> Result<Invitation, InvitationError> {
        let invitation = Invitation::find_by_code(&self.pool, &normalize_code(code))
            .await?
            .ok_or(InvitationError::NotFound)?;
        match invitation.state_at(Utc::now()) {
            InvitationState::Usable => Ok(invitation),
            InvitationState::Expired => Err(InvitationError::Expired),
            InvitationState::Exhausted => Err(InvitationError::Exhausted),
        }
    }

    /// Explain why a conditional consume matched no row.
    async fn rejection(&self, code: &str) -> InvitationError {
        match self.usable_invitation(code).await {
            Err(e) => e,
            // Usable again by the time we looked; the update still lost.
            Ok(_) => InvitationError::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{family::CreateFamily, notification::Notification, user::CreateUser},
    };
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::services::realtime::RealtimeHub;

    struct Fixture {
        pool: SqlitePool,
        service: InvitationService,
        family_id: Uuid,
        owner: Uuid,
    }

    async fn user(pool: &SqlitePool, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        User::create(
            pool,
            &CreateUser {
                display_name: name.to_string(),
                email: None,
                age: None,
                role: None,
            },
            id,
        )
        .await
        .unwrap();
        id
    }

    async fn setup() -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = user(&db.pool, "Camille").await;
        let family = Family::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFamily {
                name: "Les Dupont".to_string(),
                preferences: None,
            },
            owner,
        )
        .await
        .unwrap();
        User::set_family(&db.pool, owner, Some(family.id)).await.unwrap();
        let notifications = NotificationService::new(db.pool.clone(), RealtimeHub::new());
        Fixture {
            service: InvitationService::new(db.pool.clone(), notifications),
            pool: db.pool,
            family_id: family.id,
            owner,
        }
    }

    #[test]
    fn generated_codes_use_the_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }

    #[tokio::test]
    async fn create_rejects_invalid_limits() {
        let f = setup().await;
        assert!(matches!(
            f.service.create(f.family_id, f.owner, 0, 7).await,
            Err(InvitationError::Validation(_))
        ));
        assert!(matches!(
            f.service.create(f.family_id, f.owner, 1, 0).await,
            Err(InvitationError::Validation(_))
        ));
        assert!(matches!(
            f.service
                .create(f.family_id, f.owner, 1, MAX_EXPIRY_DAYS + 1)
                .await,
            Err(InvitationError::Validation(_))
        ));
        assert!(matches!(
            f.service.create(f.family_id, f.owner, 1, 1_000_000_000).await,
            Err(InvitationError::Validation(_))
        ));
        assert!(
            f.service
                .create(f.family_id, f.owner, 1, MAX_EXPIRY_DAYS)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn outsiders_cannot_create_codes() {
        let f = setup().await;
        let outsider = user(&f.pool, "Hugo").await;
        assert!(matches!(
            f.service.create(f.family_id, outsider, 3, 7).await,
            Err(InvitationError::NotAMember)
        ));
    }

    #[tokio::test]
    async fn single_use_code_is_exhausted_after_one_consume() {
        let f = setup().await;
        let invitation = f.service.create(f.family_id, f.owner, 1, 7).await.unwrap();
        assert_eq!(invitation.uses_count, 0);

        let family = f.service.validate(&invitation.code).await.unwrap();
        assert_eq!(family.id, f.family_id);

        f.service.consume(&invitation.code).await.unwrap();
        assert!(matches!(
            f.service.validate(&invitation.code).await,
            Err(InvitationError::Exhausted)
        ));
        assert!(matches!(
            f.service.consume(&invitation.code).await,
            Err(InvitationError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn expiry_is_reported_before_exhaustion() {
        let f = setup().await;
        let invitation = f.service.create(f.family_id, f.owner, 1, 1).await.unwrap();
        f.service.consume(&invitation.code).await.unwrap();
        sqlx::query("UPDATE invitations SET expires_at = $2 WHERE id = $1")
            .bind(invitation.id)
            .bind(Utc::now() - Duration::hours(1))
            .execute(&f.pool)
            .await
            .unwrap();

        assert!(matches!(
            f.service.validate(&invitation.code).await,
            Err(InvitationError::Expired)
        ));
        assert!(matches!(
            f.service.consume(&invitation.code).await,
            Err(InvitationError::Expired)
        ));
    }

    #[tokio::test]
    async fn consume_accepts_the_exact_expiry_instant() {
        let f = setup().await;
        let invitation = f.service.create(f.family_id, f.owner, 5, 1).await.unwrap();
        let stored = Invitation::find_by_code(&f.pool, &invitation.code)
            .await
            .unwrap()
            .unwrap();

        assert!(
            Invitation::consume(&f.pool, &stored.code, stored.expires_at)
                .await
                .unwrap()
        );
        assert!(
            !Invitation::consume(
                &f.pool,
                &stored.code,
                stored.expires_at + Duration::seconds(1)
            )
            .await
            .unwrap()
        );
        assert_eq!(stored.state_at(stored.expires_at), InvitationState::Usable);

        let after = Invitation::find_by_code(&f.pool, &invitation.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.uses_count, 1);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let f = setup().await;
        assert!(matches!(
            f.service.validate("ZZZZZZZZ").await,
            Err(InvitationError::NotFound)
        ));
    }

    #[tokio::test]
    async fn redeem_joins_family_and_notifies_inviter() {
        let f = setup().await;
        let invitation = f.service.create(f.family_id, f.owner, 2, 7).await.unwrap();
        let guest = user(&f.pool, "Mamie Jo").await;

        let typed = format!("  {} ", invitation.code.to_lowercase());
        let family = f.service.redeem(&typed, guest).await.unwrap();
        assert_eq!(family.id, f.family_id);
        assert_eq!(
            User::find_by_id(&f.pool, guest).await.unwrap().unwrap().family_id,
            Some(f.family_id)
        );

        // Redeeming again as a member costs nothing.
        f.service.redeem(&invitation.code, guest).await.unwrap();
        let stored = Invitation::find_by_code(&f.pool, &invitation.code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.uses_count, 1);

        let notes = Notification::find_by_user_id(&f.pool, f.owner, true, 10)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Invitation);
    }
}

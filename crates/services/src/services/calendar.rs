//! Shared family agenda.

use chrono::{DateTime, Utc};
use db::{
    entity::EntityKind,
    models::{
        family::CoNest,
        family_event::{CreateFamilyEvent, FamilyEvent, UpdateFamilyEvent},
        notification::NotificationKind,
        user::User,
    },
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{notification::NotificationService, realtime::RealtimeHub};

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Event not found")]
    EventNotFound,
    #[error("User is not a member of this family")]
    NotAMember,
    #[error("Only the creator can change this event")]
    Forbidden,
}

#[derive(Clone)]
pub struct CalendarService {
    pool: SqlitePool,
    notifications: NotificationService,
    realtime: RealtimeHub,
}

impl CalendarService {
    pub fn new(pool: SqlitePool, notifications: NotificationService, realtime: RealtimeHub) -> Self {
        Self {
            pool,
            notifications,
            realtime,
        }
    }

    pub async fn create(
        &self,
        family_id: Uuid,
        user_id: Uuid,
        data: &CreateFamilyEvent,
    ) -> Result<FamilyEvent, CalendarError> {
        validate_title(&data.title)?;
        validate_span(data.starts_at, data.ends_at)?;
        let creator = User::find_by_id(&self.pool, user_id).await?;
        let Some(creator) = creator.filter(|u| u.family_id == Some(family_id)) else {
            return Err(CalendarError::NotAMember);
        };

        let event = FamilyEvent::create(&self.pool, Uuid::new_v4(), family_id, user_id, data).await?;
        info!(event_id = %event.id, family_id = %family_id, "Family event created");
        self.realtime.publish(
            EntityKind::FamilyEvent,
            Some(family_id),
            Some(user_id),
            &event,
        );

        let title = format!("{} a ajouté « {} »", creator.display_name, event.title);
        for member in User::find_by_family_id(&self.pool, family_id).await? {
            if member.id == user_id {
                continue;
            }
            self.notifications
                .notify_best_effort(
                    member.id,
                    NotificationKind::Event,
                    title.clone(),
                    event.description.clone(),
                    Some(event.id),
                )
                .await;
        }
        Ok(event)
    }

    /// Events of the family and of every co-nested family, earliest first.
    pub async fn list_for_family(
        &self,
        family_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<FamilyEvent>, CalendarError> {
        if matches!((from, to), (Some(from), Some(to)) if to < from) {
            return Err(CalendarError::Validation(
                "`to` must not be before `from`".to_string(),
            ));
        }
        let mut family_ids = vec![family_id];
        family_ids.extend(CoNest::linked_family_ids(&self.pool, family_id).await?);
        Ok(FamilyEvent::find_for_families(&self.pool, &family_ids, from, to).await?)
    }

    pub async fn update(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        data: &UpdateFamilyEvent,
    ) -> Result<FamilyEvent, CalendarError> {
        let existing = self.owned_event(event_id, user_id).await?;
        if let Some(title) = &data.title {
            validate_title(title)?;
        }
        validate_span(
            data.starts_at.unwrap_or(existing.starts_at),
            data.ends_at.or(existing.ends_at),
        )?;
        FamilyEvent::update(&self.pool, event_id, data)
            .await?
            .ok_or(CalendarError::EventNotFound)
    }

    pub async fn delete(&self, event_id: Uuid, user_id: Uuid) -> Result<(), CalendarError> {
        self.owned_event(event_id, user_id).await?;
        FamilyEvent::delete(&self.pool, event_id).await?;
        Ok(())
    }

    async fn owned_event(&self, event_id: Uuid, user_id: Uuid) -> Result<FamilyEvent, CalendarError> {
        let event = FamilyEvent::find_by_id(&self.pool, event_id)
            .await?
            .ok_or(CalendarError::EventNotFound)?;
        if event.created_by != user_id {
            return Err(CalendarError::Forbidden);
        }
        Ok(event)
    }
}

fn validate_title(title: &str) -> Result<(), CalendarError> {
    if title.trim().is_empty() {
        return Err(CalendarError::Validation(
            "Event title cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_span(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> Result<(), CalendarError> {
    match ends_at {
        Some(ends_at) if ends_at < starts_at => Err(CalendarError::Validation(
            "Event cannot end before it starts".to_string(),
        )),
        _ => Ok(()),
    }
}

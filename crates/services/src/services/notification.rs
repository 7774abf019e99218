use db::{
    entity::EntityKind,
    models::notification::{CreateNotification, Notification, NotificationKind},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::realtime::RealtimeHub;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Notification not found")]
    NotFound,
}

/// Stores in-app notifications and pushes them to realtime subscribers.
#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    realtime: RealtimeHub,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, realtime: RealtimeHub) -> Self {
        Self { pool, realtime }
    }

    pub async fn notify(&self, data: CreateNotification) -> Result<Notification, NotificationError> {
        let notification = Notification::create(&self.pool, &data).await?;
        debug!(
            user_id = %notification.user_id,
            kind = %notification.kind,
            "Notification created"
        );
        self.realtime.publish(
            EntityKind::Notification,
            None,
            Some(notification.user_id),
            &notification,
        );
        Ok(notification)
    }

    /// Notify, logging instead of failing. Used for side effects of other writes.
    pub async fn notify_best_effort(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: Option<String>,
        reference_id: Option<Uuid>,
    ) {
        let data = CreateNotification {
            user_id,
            kind,
            title: title.into(),
            body,
            reference_id,
        };
        if let Err(e) = self.notify(data).await {
            warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to create notification");
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Notification>, NotificationError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        Ok(Notification::find_by_user_id(&self.pool, user_id, unread_only, limit).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, NotificationError> {
        Ok(Notification::count_unread(&self.pool, user_id).await?)
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, NotificationError> {
        Notification::mark_read(&self.pool, id, user_id)
            .await?
            .ok_or(NotificationError::NotFound)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        Ok(Notification::mark_all_read(&self.pool, user_id).await?)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), NotificationError> {
        match Notification::delete(&self.pool, id, user_id).await? {
            0 => Err(NotificationError::NotFound),
            _ => Ok(()),
        }
    }
}

//! In-process fan-out of inserted rows to live subscribers.
//!
//! Delivery is best effort: a subscriber that falls more than the channel
//! capacity behind skips the events it missed.

use db::entity::EntityKind;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{trace, warn};
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// A row that was just inserted into `table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub table: EntityKind,
    pub family_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub row: serde_json::Value,
}

/// Restricts a subscription to rows scoped to one family or one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RealtimeFilter {
    pub family_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl RealtimeFilter {
    pub fn matches(&self, event: &RealtimeEvent) -> bool {
        self.family_id.is_none_or(|id| event.family_id == Some(id))
            && self.user_id.is_none_or(|id| event.user_id == Some(id))
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an inserted row. Serialization failures are logged and dropped.
    pub fn publish<T: Serialize>(
        &self,
        table: EntityKind,
        family_id: Option<Uuid>,
        user_id: Option<Uuid>,
        row: &T,
    ) {
        let row = match serde_json::to_value(row) {
            Ok(row) => row,
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to serialize realtime row");
                return;
            }
        };
        trace!(table = %table, ?family_id, ?user_id, "Publishing realtime event");
        // No subscribers is not an error.
        let _ = self.sender.send(RealtimeEvent {
            table,
            family_id,
            user_id,
            row,
        });
    }

    /// Stream of rows inserted into `table` from now on that pass `filter`.
    pub fn subscribe(
        &self,
        table: EntityKind,
        filter: RealtimeFilter,
    ) -> impl Stream<Item = RealtimeEvent> + Send + use<> {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |received| async move {
            match received {
                Ok(event) if event.table == table && filter.matches(&event) => Some(event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(table = %table, skipped, "Realtime subscriber lagged");
                    None
                }
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscribers_only_see_their_table_and_scope() {
        let hub = RealtimeHub::new();
        let family = Uuid::new_v4();
        let mut stream = pin!(hub.subscribe(
            EntityKind::Post,
            RealtimeFilter {
                family_id: Some(family),
                user_id: None,
            },
        ));

        hub.publish(EntityKind::Comment, Some(family), None, &json!({"n": 1}));
        hub.publish(EntityKind::Post, Some(Uuid::new_v4()), None, &json!({"n": 2}));
        hub.publish(EntityKind::Post, Some(family), None, &json!({"n": 3}));

        let event = stream.next().await.unwrap();
        assert_eq!(event.table, EntityKind::Post);
        assert_eq!(event.row["n"], 3);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_missed_events() {
        let hub = RealtimeHub::with_capacity(2);
        let mut stream = pin!(hub.subscribe(EntityKind::Notification, RealtimeFilter::default()));

        for n in 0..5 {
            hub.publish(EntityKind::Notification, None, None, &json!({"n": n}));
        }

        let event = stream.next().await.unwrap();
        assert_eq!(event.row["n"], 3);
    }

    fn detached_subscription(hub: RealtimeHub) -> impl Stream<Item = RealtimeEvent> + Send + 'static {
        hub.subscribe(EntityKind::Post, RealtimeFilter::default())
    }

    #[tokio::test]
    async fn subscription_outlives_the_hub_handle() {
        let hub = RealtimeHub::new();
        let mut stream = pin!(detached_subscription(hub.clone()));

        hub.publish(EntityKind::Post, None, None, &json!({"n": 7}));

        let event = stream.next().await.unwrap();
        assert_eq!(event.row["n"], 7);
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let hub = RealtimeHub::default();
        hub.publish(EntityKind::Post, None, None, &json!({}));
        assert_eq!(hub.subscriber_count(), 0);
    }
}

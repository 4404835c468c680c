//! Notifications read model for the admin and vendor inboxes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Audience, NotificationEvent, NotificationKind};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

#[derive(Debug, Clone)]
pub struct NotificationSummary {
    pub notification_id: AggregateId,
    pub audience: Audience,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Read model of live notifications, partitioned by audience at query time.
#[derive(Clone, Default)]
pub struct NotificationsView {
    notifications: Arc<RwLock<HashMap<AggregateId, NotificationSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl NotificationsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, notification_id: AggregateId) -> Option<NotificationSummary> {
        self.notifications
            .read()
            .await
            .get(&notification_id)
            .cloned()
    }

    /// Notifications addressed to `audience`, newest first, at most `limit`.
    pub async fn list(&self, audience: Audience, limit: Option<usize>) -> Vec<NotificationSummary> {
        let mut items: Vec<_> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.audience == audience)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.notification_id.as_uuid().cmp(&b.notification_id.as_uuid()))
        });
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        items
    }

    pub async fn unread_count(&self, audience: Audience) -> usize {
        self.notifications
            .read()
            .await
            .values()
            .filter(|n| n.audience == audience && !n.is_read)
            .count()
    }

    async fn advance(&self) {
        let mut pos = self.position.write().await;
        *pos = pos.advance();
    }
}

#[async_trait]
impl Projection for NotificationsView {
    fn name(&self) -> &'static str {
        "NotificationsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != "Notification" {
            self.advance().await;
            return Ok(());
        }

        let notification_event: NotificationEvent =
            serde_json::from_value(event.payload.clone())?;
        let id = event.aggregate_id;

        {
            let mut notifications = self.notifications.write().await;
            match notification_event {
                NotificationEvent::NotificationCreated(data) => {
                    notifications.insert(
                        id,
                        NotificationSummary {
                            notification_id: id,
                            audience: data.audience,
                            kind: data.kind,
                            message: data.message,
                            is_read: false,
                            created_at: data.created_at,
                        },
                    );
                }
                NotificationEvent::NotificationRead { .. } => {
                    if let Some(n) = notifications.get_mut(&id) {
                        n.is_read = true;
                    }
                }
                NotificationEvent::NotificationDeleted { .. } => {
                    notifications.remove(&id);
                }
            }
        }

        self.advance().await;
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.notifications.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for NotificationsView {
    fn name(&self) -> &'static str {
        "NotificationsView"
    }

    fn count(&self) -> usize {
        self.notifications.try_read().map(|n| n.len()).unwrap_or(0)
    }
}

//! Notification service.

use async_trait::async_trait;
use common::AggregateId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{Audience, Notification, NotificationError, NotificationIntent, NotificationSink};

/// Persists notifications and applies read/delete commands within an audience.
pub struct NotificationService<S: EventStore> {
    handler: CommandHandler<S, Notification>,
}

impl<S: EventStore> NotificationService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    #[tracing::instrument(skip(self), fields(notification_id = %intent.notification_id))]
    pub async fn create(
        &self,
        intent: &NotificationIntent,
    ) -> Result<CommandResult<Notification>, DomainError> {
        self.handler
            .execute(intent.notification_id, |notification| {
                notification.create(intent)
            })
            .await
    }

    /// Marks a notification read. Already-read notifications are returned unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn mark_read(
        &self,
        notification_id: AggregateId,
        scope: Audience,
    ) -> Result<Notification, DomainError> {
        let result = self
            .handler
            .execute(notification_id, |notification| notification.mark_read(&scope))
            .await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        notification_id: AggregateId,
        scope: Audience,
    ) -> Result<(), DomainError> {
        self.handler
            .execute(notification_id, |notification| notification.delete(&scope))
            .await?;
        Ok(())
    }

    /// Loads a notification visible to `scope`.
    pub async fn get(
        &self,
        notification_id: AggregateId,
        scope: Audience,
    ) -> Result<Option<Notification>, DomainError> {
        let notification = self.handler.load_existing(notification_id).await?;
        Ok(notification.filter(|n| n.is_visible_to(&scope)))
    }
}

#[async_trait]
impl<S: EventStore> NotificationSink for NotificationService<S> {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DomainError> {
        match self.create(intent).await {
            Ok(_) | Err(DomainError::Notification(NotificationError::AlreadyCreated)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

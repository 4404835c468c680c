//! Notification aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    Audience, NotificationCreatedData, NotificationError, NotificationEvent, NotificationIntent,
    NotificationKind,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notification {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    audience: Option<Audience>,
    kind: Option<NotificationKind>,
    message: String,
    is_read: bool,
    created_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    deleted: bool,
}

impl Aggregate for Notification {
    type Event = NotificationEvent;
    type Error = NotificationError;

    fn aggregate_type() -> &'static str {
        "Notification"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            NotificationEvent::NotificationCreated(data) => {
                self.id = Some(data.notification_id);
                self.audience = Some(data.audience);
                self.kind = Some(data.kind);
                self.message = data.message;
                self.created_at = Some(data.created_at);
            }
            NotificationEvent::NotificationRead { at } => {
                self.is_read = true;
                self.read_at = Some(at);
            }
            NotificationEvent::NotificationDeleted { .. } => self.deleted = true,
        }
    }
}

impl Notification {
    pub fn audience(&self) -> Option<Audience> {
        self.audience
    }

    pub fn kind(&self) -> Option<NotificationKind> {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Live and addressed to `audience`.
    pub fn is_visible_to(&self, audience: &Audience) -> bool {
        self.id.is_some() && !self.deleted && self.audience.as_ref() == Some(audience)
    }
}

impl Notification {
    pub fn create(
        &self,
        intent: &NotificationIntent,
    ) -> Result<Vec<NotificationEvent>, NotificationError> {
        if self.id.is_some() {
            return Err(NotificationError::AlreadyCreated);
        }

        if !intent.kind.allowed_for(&intent.audience) {
            return Err(NotificationError::KindNotAllowed {
                kind: intent.kind,
                audience: intent.audience,
            });
        }

        if intent.message.trim().is_empty() {
            return Err(NotificationError::EmptyMessage);
        }

        Ok(vec![NotificationEvent::NotificationCreated(
            NotificationCreatedData {
                notification_id: intent.notification_id,
                audience: intent.audience,
                kind: intent.kind,
                message: intent.message.clone(),
                created_at: Utc::now(),
            },
        )])
    }

    /// Marks the notification read. Reading twice produces no new event.
    pub fn mark_read(
        &self,
        scope: &Audience,
    ) -> Result<Vec<NotificationEvent>, NotificationError> {
        if !self.is_visible_to(scope) {
            return Err(NotificationError::NotFound);
        }

        if self.is_read {
            return Ok(vec![]);
        }

        Ok(vec![NotificationEvent::NotificationRead { at: Utc::now() }])
    }

    pub fn delete(&self, scope: &Audience) -> Result<Vec<NotificationEvent>, NotificationError> {
        if !self.is_visible_to(scope) {
            return Err(NotificationError::NotFound);
        }

        Ok(vec![NotificationEvent::NotificationDeleted { at: Utc::now() }])
    }
}

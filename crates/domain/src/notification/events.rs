//! Notification domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Audience, NotificationKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    NotificationCreated(NotificationCreatedData),
    NotificationRead { at: DateTime<Utc> },
    NotificationDeleted { at: DateTime<Utc> },
}

impl DomainEvent for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::NotificationCreated(_) => "NotificationCreated",
            NotificationEvent::NotificationRead { .. } => "NotificationRead",
            NotificationEvent::NotificationDeleted { .. } => "NotificationDeleted",
        }
    }
}

/// Data for NotificationCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationCreatedData {
    pub notification_id: AggregateId,
    pub audience: Audience,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

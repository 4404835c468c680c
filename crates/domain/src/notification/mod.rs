//! Admin and vendor notifications.
//!
//! Both kinds share one aggregate; the [`Audience`] decides who may see a
//! notification and which [`NotificationKind`]s it may carry.

mod aggregate;
mod dispatcher;
mod events;
mod intent;
mod service;

pub use aggregate::Notification;
pub use dispatcher::{DispatchReport, NotificationDispatcher, NotificationSink};
pub use events::{NotificationCreatedData, NotificationEvent};
pub use intent::NotificationIntent;
pub use service::NotificationService;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::VendorId;

/// Errors that can occur during notification operations.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Unknown, deleted, or outside the caller's audience.
    #[error("Notification not found")]
    NotFound,

    #[error("Notification type {kind} is not allowed for {audience}")]
    KindNotAllowed {
        kind: NotificationKind,
        audience: Audience,
    },

    #[error("Notification message must not be empty")]
    EmptyMessage,

    #[error("Notification already created")]
    AlreadyCreated,
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "vendor_id", rename_all = "snake_case")]
pub enum Audience {
    Admin,
    Vendor(VendorId),
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::Admin => write!(f, "admin"),
            Audience::Vendor(id) => write!(f, "vendor {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewUser,
    NewVendor,
    NewOrder,
    RefundRequest,
    ProductReview,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewUser => "new_user",
            NotificationKind::NewVendor => "new_vendor",
            NotificationKind::NewOrder => "new_order",
            NotificationKind::RefundRequest => "refund_request",
            NotificationKind::ProductReview => "product_review",
        }
    }

    /// Admins hear about sign-ups, orders and refunds; vendors about their
    /// orders, refunds and reviews.
    pub fn allowed_for(&self, audience: &Audience) -> bool {
        match audience {
            Audience::Admin => !matches!(self, NotificationKind::ProductReview),
            Audience::Vendor(_) => matches!(
                self,
                NotificationKind::NewOrder
                    | NotificationKind::RefundRequest
                    | NotificationKind::ProductReview
            ),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

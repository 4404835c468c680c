use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::order::VendorId;

use super::{Audience, NotificationKind};

/// A notification that a write path decided to send, not yet persisted.
///
/// The id is assigned up front so delivering the same intent twice creates
/// the notification only once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub notification_id: AggregateId,
    pub audience: Audience,
    pub kind: NotificationKind,
    pub message: String,
}

impl NotificationIntent {
    pub fn new(audience: Audience, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            notification_id: AggregateId::new(),
            audience,
            kind,
            message: message.into(),
        }
    }

    /// Tells a vendor about the order placed with them.
    pub fn vendor_new_order(vendor_id: VendorId, item_count: usize) -> Self {
        Self::new(
            Audience::Vendor(vendor_id),
            NotificationKind::NewOrder,
            format!("📦 You received a new order with {item_count} item(s)!"),
        )
    }

    /// Tells administrators about a checkout, counting every cart line.
    pub fn admin_new_order(item_count: usize) -> Self {
        Self::new(
            Audience::Admin,
            NotificationKind::NewOrder,
            format!("📦 New order placed with {item_count} item(s)!"),
        )
    }

    pub fn admin_refund_request(order_id: AggregateId) -> Self {
        Self::new(
            Audience::Admin,
            NotificationKind::RefundRequest,
            format!("💸 Refund requested for Order #{order_id}"),
        )
    }

    pub fn vendor_refund_request(vendor_id: VendorId, order_id: AggregateId) -> Self {
        Self::new(
            Audience::Vendor(vendor_id),
            NotificationKind::RefundRequest,
            format!("💸 Refund requested for Order #{order_id}"),
        )
    }
}

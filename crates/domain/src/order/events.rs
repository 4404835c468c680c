//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::aggregate::DomainEvent;

use super::{LineItem, Money, OrderStatus, PaymentInfo, ShippingAddress, UserId, VendorId};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// A vendor order was created as part of a checkout.
    OrderPlaced(OrderPlacedData),

    /// The vendor handed the order to a carrier.
    OrderShipped(StatusChangeData),

    /// The order reached the buyer.
    OrderDelivered(StatusChangeData),

    /// The order was cancelled before shipping.
    OrderCancelled(OrderCancelledData),

    /// The buyer asked for a refund.
    RefundRequested(RefundRequestedData),

    /// An administrator approved or rejected a pending refund.
    RefundResolved(RefundResolvedData),

    /// An approved refund was paid out.
    RefundSettled(StatusChangeData),

    /// The order was removed by its vendor or an administrator.
    OrderDeleted(StatusChangeData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderShipped(_) => "OrderShipped",
            OrderEvent::OrderDelivered(_) => "OrderDelivered",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::RefundRequested(_) => "RefundRequested",
            OrderEvent::RefundResolved(_) => "RefundResolved",
            OrderEvent::RefundSettled(_) => "RefundSettled",
            OrderEvent::OrderDeleted(_) => "OrderDeleted",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub user_id: UserId,
    pub vendor_id: VendorId,

    /// The checkout this order was fanned out from.
    pub checkout_id: Option<AggregateId>,

    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,

    /// Sum of the vendor's line totals, fixed at placement.
    pub total_price: Money,

    pub payment: PaymentInfo,
    pub placed_at: DateTime<Utc>,
}

/// Shared payload for transitions that only record who and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeData {
    pub at: DateTime<Utc>,
    pub by: Actor,
}

/// Data for OrderCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub at: DateTime<Utc>,
    pub by: Actor,
    pub reason: Option<String>,
}

/// Data for RefundRequested event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequestedData {
    pub at: DateTime<Utc>,
    pub by: Actor,

    /// Status the order was in when the refund was requested.
    pub previous_status: OrderStatus,
}

/// Data for RefundResolved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResolvedData {
    pub at: DateTime<Utc>,
    pub by: Actor,
    pub approved: bool,
}

impl OrderEvent {
    pub fn status_change(by: Actor) -> StatusChangeData {
        StatusChangeData {
            at: Utc::now(),
            by,
        }
    }

    pub fn order_shipped(by: Actor) -> Self {
        OrderEvent::OrderShipped(Self::status_change(by))
    }

    pub fn order_delivered(by: Actor) -> Self {
        OrderEvent::OrderDelivered(Self::status_change(by))
    }

    pub fn order_cancelled(by: Actor, reason: Option<String>) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            at: Utc::now(),
            by,
            reason,
        })
    }

    pub fn refund_requested(by: Actor, previous_status: OrderStatus) -> Self {
        OrderEvent::RefundRequested(RefundRequestedData {
            at: Utc::now(),
            by,
            previous_status,
        })
    }

    pub fn refund_resolved(by: Actor, approved: bool) -> Self {
        OrderEvent::RefundResolved(RefundResolvedData {
            at: Utc::now(),
            by,
            approved,
        })
    }

    pub fn refund_settled(by: Actor) -> Self {
        OrderEvent::RefundSettled(Self::status_change(by))
    }

    pub fn order_deleted(by: Actor) -> Self {
        OrderEvent::OrderDeleted(Self::status_change(by))
    }

    /// The status an order holds right after this event, if the event sets one.
    pub fn resulting_status(&self) -> Option<OrderStatus> {
        match self {
            OrderEvent::OrderPlaced(_) => Some(OrderStatus::Processing),
            OrderEvent::OrderShipped(_) => Some(OrderStatus::Shipped),
            OrderEvent::OrderDelivered(_) => Some(OrderStatus::Delivered),
            OrderEvent::OrderCancelled(_) => Some(OrderStatus::Cancelled),
            OrderEvent::RefundRequested(_) => Some(OrderStatus::ProcessingRefund),
            OrderEvent::RefundResolved(data) if data.approved => Some(OrderStatus::RefundApproved),
            OrderEvent::RefundResolved(_) => Some(OrderStatus::RefundRejected),
            OrderEvent::RefundSettled(_) => Some(OrderStatus::Refunded),
            OrderEvent::OrderDeleted(_) => None,
        }
    }
}

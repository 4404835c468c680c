//! Order commands.

use common::AggregateId;

use crate::actor::Actor;
use crate::command::Command;

use super::{LineItem, Order, PaymentInfo, ShippingAddress, UserId, VendorId};

/// Command to place one vendor's share of a checkout.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub user_id: UserId,
    pub vendor_id: VendorId,

    /// Correlates the order with the checkout that created it.
    pub checkout_id: Option<AggregateId>,

    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentInfo,
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to move an order along its fulfilment path.
#[derive(Debug, Clone)]
pub struct UpdateOrderStatus {
    pub order_id: AggregateId,
    pub actor: Actor,

    /// Requested status as received, e.g. `"shipped"`.
    pub status: String,
}

impl UpdateOrderStatus {
    pub fn new(order_id: AggregateId, actor: Actor, status: impl Into<String>) -> Self {
        Self {
            order_id,
            actor,
            status: status.into(),
        }
    }
}

impl Command for UpdateOrderStatus {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub order_id: AggregateId,
    pub actor: Actor,
    pub reason: Option<String>,
}

impl CancelOrder {
    pub fn new(order_id: AggregateId, actor: Actor) -> Self {
        Self {
            order_id,
            actor,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Command for CancelOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command for the buyer to request a refund.
#[derive(Debug, Clone)]
pub struct RequestRefund {
    pub order_id: AggregateId,
    pub user_id: UserId,
}

impl RequestRefund {
    pub fn new(order_id: AggregateId, user_id: UserId) -> Self {
        Self { order_id, user_id }
    }
}

impl Command for RequestRefund {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command for an administrator to approve or reject a refund.
#[derive(Debug, Clone)]
pub struct ResolveRefund {
    pub order_id: AggregateId,
    pub actor: Actor,

    /// `refund_approved` or `refund_rejected`.
    pub status: String,
}

impl ResolveRefund {
    pub fn new(order_id: AggregateId, actor: Actor, status: impl Into<String>) -> Self {
        Self {
            order_id,
            actor,
            status: status.into(),
        }
    }
}

impl Command for ResolveRefund {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to mark an approved refund as paid.
#[derive(Debug, Clone)]
pub struct SettleRefund {
    pub order_id: AggregateId,
    pub actor: Actor,
}

impl SettleRefund {
    pub fn new(order_id: AggregateId, actor: Actor) -> Self {
        Self { order_id, actor }
    }
}

impl Command for SettleRefund {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to delete an order.
#[derive(Debug, Clone)]
pub struct DeleteOrder {
    pub order_id: AggregateId,
    pub actor: Actor,
}

impl DeleteOrder {
    pub fn new(order_id: AggregateId, actor: Actor) -> Self {
        Self { order_id, actor }
    }
}

impl Command for DeleteOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

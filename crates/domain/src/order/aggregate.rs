//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::aggregate::Aggregate;

use super::{
    LineItem, Money, OrderError, OrderEvent, OrderStatus, PaymentInfo, PaymentStatus, PlaceOrder,
    ShippingAddress, UserId, VendorId, events::OrderPlacedData,
};

/// Order aggregate root.
///
/// One order exists per vendor per checkout. Its items and total are fixed at
/// placement; afterwards only the status moves, through fulfilment by the
/// vendor and the refund sub-flow driven by the buyer and administrators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    user_id: Option<UserId>,
    vendor_id: Option<VendorId>,
    checkout_id: Option<AggregateId>,
    items: Vec<LineItem>,
    shipping_address: ShippingAddress,
    total_price: Money,
    status: OrderStatus,
    payment: PaymentInfo,
    created_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    deleted: bool,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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
        if let Some(status) = event.resulting_status() {
            self.status = status;
        }

        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderShipped(data) | OrderEvent::RefundSettled(data) => {
                self.updated_at = Some(data.at);
            }
            OrderEvent::OrderDelivered(data) => {
                self.delivered_at = Some(data.at);
                self.updated_at = Some(data.at);
            }
            OrderEvent::OrderCancelled(data) => {
                self.cancellation_reason = data.reason;
                self.updated_at = Some(data.at);
            }
            OrderEvent::RefundRequested(data) => self.updated_at = Some(data.at),
            OrderEvent::RefundResolved(data) => self.updated_at = Some(data.at),
            OrderEvent::OrderDeleted(data) => {
                self.deleted = true;
                self.updated_at = Some(data.at);
            }
        }
    }
}

// Query methods
impl Order {
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn checkout_id(&self) -> Option<AggregateId> {
        self.checkout_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment(&self) -> &PaymentInfo {
        &self.payment
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// True when the order was placed and has not been deleted.
    pub fn is_live(&self) -> bool {
        self.id.is_some() && !self.deleted
    }

    /// Returns true if `user` is the buyer who placed this order.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }

    pub fn is_sold_by(&self, vendor: VendorId) -> bool {
        self.vendor_id == Some(vendor)
    }
}

// Command methods (return events)
impl Order {
    /// Places a new vendor order.
    ///
    /// The total is computed from the items; any client-side total is ignored.
    pub fn place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        if cmd.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    product_id: item.product_id.clone(),
                });
            }
        }

        cmd.shipping_address.validate()?;

        let total_price = cmd.items.iter().map(LineItem::total_price).sum();

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: cmd.order_id,
            user_id: cmd.user_id,
            vendor_id: cmd.vendor_id,
            checkout_id: cmd.checkout_id,
            items: cmd.items.clone(),
            shipping_address: cmd.shipping_address.clone(),
            total_price,
            payment: cmd.payment.clone(),
            placed_at: Utc::now(),
        })])
    }

    /// Moves the order along its fulfilment path: shipped, delivered or cancelled.
    ///
    /// The owning vendor and administrators may do this; ownership is checked
    /// before the transition so a foreign vendor learns nothing about state.
    pub fn update_fulfilment(
        &self,
        actor: &Actor,
        target: OrderStatus,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        self.ensure_fulfiller(actor, "update order status")?;

        if !self.status.can_fulfil_to(target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        let by = actor.clone();
        Ok(vec![match target {
            OrderStatus::Shipped => OrderEvent::order_shipped(by),
            OrderStatus::Delivered => OrderEvent::order_delivered(by),
            _ => OrderEvent::order_cancelled(by, None),
        }])
    }

    /// Cancels an order that has not shipped yet.
    ///
    /// Besides the vendor and administrators, the system may cancel while
    /// compensating a failed checkout.
    pub fn cancel(
        &self,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if *actor != Actor::System {
            self.ensure_fulfiller(actor, "cancel orders")?;
        }

        if !self.status.can_fulfil_to(OrderStatus::Cancelled) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        Ok(vec![OrderEvent::order_cancelled(actor.clone(), reason)])
    }

    /// Buyer asks for a refund. Allowed once per order.
    pub fn request_refund(&self, user: UserId) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;

        if !self.is_owned_by(user) {
            return Err(OrderError::NotOrderOwner);
        }

        if self.status.is_refund_state() {
            return Err(OrderError::RefundAlreadyRequested);
        }

        if !self.status.can_request_refund() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::ProcessingRefund,
            });
        }

        Ok(vec![OrderEvent::refund_requested(
            Actor::User(user),
            self.status,
        )])
    }

    /// Administrator approves or rejects a pending refund.
    ///
    /// `requested` must name `refund_approved` or `refund_rejected`.
    pub fn resolve_refund(
        &self,
        actor: &Actor,
        requested: &str,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        Self::ensure_admin(actor, "resolve refunds")?;

        let target = requested
            .parse::<OrderStatus>()
            .ok()
            .filter(OrderStatus::is_resolution)
            .ok_or(OrderError::InvalidRefundStatus)?;

        if self.status != OrderStatus::ProcessingRefund {
            return Err(OrderError::RefundResolution {
                from: self.status,
                to: target,
            });
        }

        Ok(vec![OrderEvent::refund_resolved(
            actor.clone(),
            target == OrderStatus::RefundApproved,
        )])
    }

    /// Administrator records that an approved refund was paid out.
    pub fn settle_refund(&self, actor: &Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        Self::ensure_admin(actor, "settle refunds")?;

        if self.status != OrderStatus::RefundApproved {
            return Err(OrderError::RefundResolution {
                from: self.status,
                to: OrderStatus::Refunded,
            });
        }

        Ok(vec![OrderEvent::refund_settled(actor.clone())])
    }

    /// Removes the order from every read path.
    pub fn delete(&self, actor: &Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        self.ensure_fulfiller(actor, "delete orders")?;

        Ok(vec![OrderEvent::order_deleted(actor.clone())])
    }

    fn ensure_live(&self) -> Result<(), OrderError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(OrderError::NotFound)
        }
    }

    /// The owning vendor or an administrator.
    fn ensure_fulfiller(&self, actor: &Actor, action: &'static str) -> Result<(), OrderError> {
        match actor {
            Actor::Admin(_) => Ok(()),
            Actor::Vendor(vendor) if self.is_sold_by(*vendor) => Ok(()),
            Actor::Vendor(_) => Err(OrderError::NotOrderVendor),
            other => Err(OrderError::NotPermitted {
                role: other.role(),
                action,
            }),
        }
    }

    fn ensure_admin(actor: &Actor, action: &'static str) -> Result<(), OrderError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(OrderError::NotPermitted {
                role: actor.role(),
                action,
            })
        }
    }

    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.user_id = Some(data.user_id);
        self.vendor_id = Some(data.vendor_id);
        self.checkout_id = data.checkout_id;
        self.items = data.items;
        self.shipping_address = data.shipping_address;
        self.total_price = data.total_price;
        if data.payment.status == PaymentStatus::Completed {
            self.paid_at = Some(data.placed_at);
        }
        self.payment = data.payment;
        self.created_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }
}

//! Orders read model, queried by vendors, buyers and administrators.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    LineItem, Money, OrderEvent, OrderStatus, PaymentInfo, ShippingAddress, UserId, VendorId,
};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// Denormalised view of one live order.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub user_id: UserId,
    pub vendor_id: VendorId,
    pub checkout_id: Option<AggregateId>,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub total_price: Money,
    pub status: OrderStatus,
    pub payment: PaymentInfo,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Read model of every order that has not been deleted.
#[derive(Clone, Default)]
pub struct OrdersView {
    orders: Arc<RwLock<HashMap<AggregateId, OrderSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl OrdersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: AggregateId) -> Option<OrderSummary> {
        self.orders.read().await.get(&order_id).cloned()
    }

    /// All orders, newest first.
    pub async fn all(&self) -> Vec<OrderSummary> {
        self.select(|_| true).await
    }

    /// Orders sold by `vendor_id`, newest first.
    pub async fn for_vendor(&self, vendor_id: VendorId) -> Vec<OrderSummary> {
        self.select(|o| o.vendor_id == vendor_id).await
    }

    /// Orders bought by `user_id`, newest first.
    pub async fn for_user(&self, user_id: UserId) -> Vec<OrderSummary> {
        self.select(|o| o.user_id == user_id).await
    }

    /// A vendor's orders whose refund has been approved or rejected.
    pub async fn resolved_refunds_for_vendor(&self, vendor_id: VendorId) -> Vec<OrderSummary> {
        self.select(|o| o.vendor_id == vendor_id && o.status.is_resolution())
            .await
    }

    async fn select(&self, filter: impl Fn(&OrderSummary) -> bool) -> Vec<OrderSummary> {
        let mut orders: Vec<_> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| filter(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.order_id.as_uuid().cmp(&b.order_id.as_uuid()))
        });
        orders
    }

    async fn advance(&self) {
        let mut pos = self.position.write().await;
        *pos = pos.advance();
    }
}

#[async_trait]
impl Projection for OrdersView {
    fn name(&self) -> &'static str {
        "OrdersView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != "Order" {
            self.advance().await;
            return Ok(());
        }

        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
        let order_id = event.aggregate_id;
        let status = order_event.resulting_status();

        {
            let mut orders = self.orders.write().await;

            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    let paid_at = (data.payment.status == domain::PaymentStatus::Completed)
                        .then_some(data.placed_at);
                    orders.insert(
                        order_id,
                        OrderSummary {
                            order_id,
                            user_id: data.user_id,
                            vendor_id: data.vendor_id,
                            checkout_id: data.checkout_id,
                            items: data.items,
                            shipping_address: data.shipping_address,
                            total_price: data.total_price,
                            status: OrderStatus::Processing,
                            payment: data.payment,
                            created_at: data.placed_at,
                            paid_at,
                            delivered_at: None,
                            updated_at: data.placed_at,
                        },
                    );
                }
                OrderEvent::OrderDeleted(_) => {
                    orders.remove(&order_id);
                }
                other => {
                    if let Some(order) = orders.get_mut(&order_id) {
                        if let Some(status) = status {
                            order.status = status;
                        }
                        if let OrderEvent::OrderDelivered(data) = &other {
                            order.delivered_at = Some(data.at);
                        }
                        order.updated_at = event.timestamp;
                    }
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
        self.orders.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for OrdersView {
    fn name(&self) -> &'static str {
        "OrdersView"
    }

    fn count(&self) -> usize {
        self.orders.try_read().map(|o| o.len()).unwrap_or(0)
    }
}

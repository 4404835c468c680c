//! Order service providing a simplified API for order operations.

use common::AggregateId;
use event_store::EventStore;

use crate::actor::Actor;
use crate::command::{CommandHandler, CommandResult, EventMetadata};
use crate::error::DomainError;

use super::{
    CancelOrder, DeleteOrder, Order, OrderStatus, PlaceOrder, RequestRefund, ResolveRefund,
    SettleRefund, UpdateOrderStatus,
};

/// Service for managing orders.
///
/// Wraps the command handler, records the acting principal in the metadata of
/// every event it writes and hides deleted orders from reads.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Places one vendor order.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, vendor_id = %cmd.vendor_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>, DomainError> {
        let mut metadata = actor_metadata(&Actor::User(cmd.user_id))?;
        if let Some(checkout_id) = cmd.checkout_id {
            metadata.insert(
                "checkout_id".to_string(),
                serde_json::Value::String(checkout_id.to_string()),
            );
        }

        let result = self
            .handler
            .execute_with_metadata(cmd.order_id, metadata, |order| order.place(&cmd))
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        Ok(result)
    }

    /// Moves an order to `shipped`, `delivered` or `cancelled`.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        cmd: UpdateOrderStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        let target: OrderStatus = cmd.status.parse()?;
        let metadata = actor_metadata(&cmd.actor)?;

        self.handler
            .execute_with_metadata(cmd.order_id, metadata, |order| {
                order.update_fulfilment(&cmd.actor, target)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<CommandResult<Order>, DomainError> {
        let metadata = actor_metadata(&cmd.actor)?;

        self.handler
            .execute_with_metadata(cmd.order_id, metadata, |order| {
                order.cancel(&cmd.actor, cmd.reason.clone())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_refund(
        &self,
        cmd: RequestRefund,
    ) -> Result<CommandResult<Order>, DomainError> {
        let metadata = actor_metadata(&Actor::User(cmd.user_id))?;

        self.handler
            .execute_with_metadata(cmd.order_id, metadata, |order| {
                order.request_refund(cmd.user_id)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve_refund(
        &self,
        cmd: ResolveRefund,
    ) -> Result<CommandResult<Order>, DomainError> {
        let metadata = actor_metadata(&cmd.actor)?;

        self.handler
            .execute_with_metadata(cmd.order_id, metadata, |order| {
                order.resolve_refund(&cmd.actor, &cmd.status)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn settle_refund(
        &self,
        cmd: SettleRefund,
    ) -> Result<CommandResult<Order>, DomainError> {
        let metadata = actor_metadata(&cmd.actor)?;

        self.handler
            .execute_with_metadata(cmd.order_id, metadata, |order| {
                order.settle_refund(&cmd.actor)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, cmd: DeleteOrder) -> Result<CommandResult<Order>, DomainError> {
        let metadata = actor_metadata(&cmd.actor)?;

        self.handler
            .execute_with_metadata(cmd.order_id, metadata, |order| order.delete(&cmd.actor))
            .await
    }

    /// Loads an order. Deleted orders are reported as absent.
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        let order = self.handler.load_existing(order_id).await?;
        Ok(order.filter(Order::is_live))
    }
}

fn actor_metadata(actor: &Actor) -> Result<EventMetadata, DomainError> {
    let mut metadata = EventMetadata::new();
    metadata.insert("actor".to_string(), serde_json::to_value(actor)?);
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{LineItem, Money, OrderError, PaymentInfo, ShippingAddress, UserId, VendorId};
    use event_store::InMemoryEventStore;

    fn place_cmd(user: UserId, vendor: VendorId) -> PlaceOrder {
        PlaceOrder {
            order_id: AggregateId::new(),
            user_id: user,
            vendor_id: vendor,
            checkout_id: Some(AggregateId::new()),
            items: vec![LineItem::new("SKU-1", "Widget", 2, Money::from_cents(1000))],
            shipping_address: ShippingAddress {
                full_name: "Ada Lovelace".into(),
                address: "12 Analytical St".into(),
                city: "London".into(),
                postal_code: "N1".into(),
                country: "UK".into(),
            },
            payment: PaymentInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_place_and_get_order() {
        let store = InMemoryEventStore::new();
        let service = OrderService::new(store.clone());
        let cmd = place_cmd(UserId::new(), VendorId::new());
        let order_id = cmd.order_id;
        let checkout_id = cmd.checkout_id.unwrap();

        let result = service.place_order(cmd).await.unwrap();
        assert_eq!(result.aggregate.total_price().cents(), 2000);

        let order = service.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.checkout_id(), Some(checkout_id));

        let events = store.get_events_for_aggregate(order_id).await.unwrap();
        assert_eq!(
            events[0].metadata_str("checkout_id"),
            Some(checkout_id.to_string().as_str())
        );
        assert_eq!(events[0].metadata["actor"]["kind"], "user");
    }

    #[tokio::test]
    async fn test_update_status_parses_target() {
        let service = OrderService::new(InMemoryEventStore::new());
        let vendor = VendorId::new();
        let cmd = place_cmd(UserId::new(), vendor);
        let order_id = cmd.order_id;
        service.place_order(cmd).await.unwrap();

        let result = service
            .update_status(UpdateOrderStatus::new(
                order_id,
                Actor::Vendor(vendor),
                "shipped",
            ))
            .await
            .unwrap();
        assert_eq!(result.aggregate.status(), OrderStatus::Shipped);

        let err = service
            .update_status(UpdateOrderStatus::new(
                order_id,
                Actor::Vendor(vendor),
                "teleported",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::InvalidStatus(_))));
    }

    #[tokio::test]
    async fn test_deleted_order_is_hidden() {
        let service = OrderService::new(InMemoryEventStore::new());
        let vendor = VendorId::new();
        let cmd = place_cmd(UserId::new(), vendor);
        let order_id = cmd.order_id;
        service.place_order(cmd).await.unwrap();

        service
            .delete_order(DeleteOrder::new(order_id, Actor::Vendor(vendor)))
            .await
            .unwrap();

        assert!(service.get_order(order_id).await.unwrap().is_none());

        let err = service
            .cancel_order(CancelOrder::new(order_id, Actor::System))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::NotFound)));
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let service = OrderService::new(InMemoryEventStore::new());

        assert!(service.get_order(AggregateId::new()).await.unwrap().is_none());
        let err = service
            .request_refund(RequestRefund::new(AggregateId::new(), UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::NotFound)));
    }
}

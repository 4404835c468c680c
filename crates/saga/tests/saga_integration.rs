//! Integration tests for the checkout saga.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::AggregateId;
use domain::{
    Aggregate, Audience, CartLine, Money, NotificationKind, OrderService, OrderStatus, PaymentInfo,
    ShippingAddress, UserId, VendorId,
};
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, EventStream, InMemoryEventStore,
    Version,
};
use saga::{CheckoutCoordinator, CheckoutRequest, CheckoutState, InMemoryVendorDirectory, SagaError};

/// Event store that fails chosen order writes.
#[derive(Clone, Default)]
struct FaultyStore {
    inner: InMemoryEventStore,
    placed_seen: Arc<AtomicUsize>,
    /// 1-based index of the `OrderPlaced` append to reject; 0 never rejects.
    fail_placement: usize,
    fail_cancellations: bool,
    /// Checkout log event type whose appends are rejected.
    fail_log_event: Option<&'static str>,
}

impl FaultyStore {
    fn failing_placement(n: usize) -> Self {
        Self {
            fail_placement: n,
            ..Self::default()
        }
    }

    fn failing_log_event(event_type: &'static str) -> Self {
        Self {
            fail_log_event: Some(event_type),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventStore for FaultyStore {
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> event_store::Result<Version> {
        match events.first().map(|e| e.event_type.as_str()) {
            Some("OrderPlaced") => {
                let n = self.placed_seen.fetch_add(1, Ordering::SeqCst) + 1;
                if n == self.fail_placement {
                    return Err(EventStoreError::InvalidAppend("injected failure".into()));
                }
            }
            Some("OrderCancelled") if self.fail_cancellations => {
                return Err(EventStoreError::InvalidAppend("injected failure".into()));
            }
            Some(event_type) if self.fail_log_event == Some(event_type) => {
                return Err(EventStoreError::InvalidAppend("injected failure".into()));
            }
            _ => {}
        }
        self.inner.append(events, options).await
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> event_store::Result<Vec<EventEnvelope>> {
        self.inner.get_events_for_aggregate(aggregate_id).await
    }

    async fn get_events_by_type(&self, event_type: &str) -> event_store::Result<Vec<EventEnvelope>> {
        self.inner.get_events_by_type(event_type).await
    }

    async fn stream_events_from(&self, offset: u64) -> event_store::Result<EventStream> {
        self.inner.stream_events_from(offset).await
    }

    async fn get_aggregate_version(
        &self,
        aggregate_id: AggregateId,
    ) -> event_store::Result<Option<Version>> {
        self.inner.get_aggregate_version(aggregate_id).await
    }
}

struct TestHarness {
    coordinator: CheckoutCoordinator<FaultyStore, InMemoryVendorDirectory>,
    order_service: OrderService<FaultyStore>,
    store: FaultyStore,
}

impl TestHarness {
    fn new(store: FaultyStore) -> Self {
        Self {
            coordinator: CheckoutCoordinator::new(
                store.clone(),
                InMemoryVendorDirectory::permissive(),
            ),
            order_service: OrderService::new(store.clone()),
            store,
        }
    }

    async fn status_of(&self, order_id: AggregateId) -> OrderStatus {
        self.order_service
            .get_order(order_id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }
}

fn request(lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        user_id: UserId::new(),
        lines,
        shipping_address: ShippingAddress {
            full_name: "Grace Hopper".into(),
            address: "1 Harbor Way".into(),
            city: "Arlington".into(),
            postal_code: "22201".into(),
            country: "US".into(),
        },
        declared_total: Some(Money::from_cents(7000)),
        declared_status: Some("processing".into()),
        payment: PaymentInfo::default(),
    }
}

fn three_vendor_cart() -> (Vec<VendorId>, Vec<CartLine>) {
    let vendors = vec![VendorId::new(), VendorId::new(), VendorId::new()];
    let lines = vec![
        CartLine::new(vendors[0].to_string(), "p1", "Mug", 2, Money::from_cents(1000)),
        CartLine::new(vendors[1].to_string(), "p2", "Lamp", 1, Money::from_cents(5000)),
        CartLine::new(vendors[0].to_string(), "p3", "Spoon", 3, Money::from_cents(150)),
        CartLine::new(vendors[2].to_string(), "p4", "Rug", 1, Money::from_cents(9900)),
    ];
    (vendors, lines)
}

#[tokio::test]
async fn test_fan_out_places_one_order_per_vendor() {
    let h = TestHarness::new(FaultyStore::default());
    let (vendors, lines) = three_vendor_cart();
    let cart_total: Money = lines.iter().map(CartLine::line_total).sum();

    let outcome = h.coordinator.checkout(request(lines)).await.unwrap();

    assert_eq!(outcome.orders.len(), 3);
    for (order, vendor) in outcome.orders.iter().zip(&vendors) {
        assert_eq!(order.vendor_id(), Some(*vendor));
        assert_eq!(order.checkout_id(), Some(outcome.checkout_id));
        assert_eq!(order.status(), OrderStatus::Processing);
    }
    assert_eq!(outcome.orders[0].items().len(), 2);
    assert_eq!(outcome.orders[0].total_price(), Money::from_cents(2450));

    let placed_total: Money = outcome.orders.iter().map(|o| o.total_price()).sum();
    assert_eq!(placed_total, cart_total);
}

#[tokio::test]
async fn test_one_vendor_notification_per_group_and_one_admin() {
    let h = TestHarness::new(FaultyStore::default());
    let (vendors, lines) = three_vendor_cart();

    let outcome = h.coordinator.checkout(request(lines)).await.unwrap();

    let vendor_intents: Vec<_> = outcome
        .notifications
        .iter()
        .filter(|n| matches!(n.audience, Audience::Vendor(_)))
        .collect();
    assert_eq!(vendor_intents.len(), 3);
    assert_eq!(vendor_intents[0].audience, Audience::Vendor(vendors[0]));
    assert_eq!(
        vendor_intents[0].message,
        "📦 You received a new order with 2 item(s)!"
    );

    let admin: Vec<_> = outcome
        .notifications
        .iter()
        .filter(|n| n.audience == Audience::Admin)
        .collect();
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].kind, NotificationKind::NewOrder);
    assert_eq!(admin[0].message, "📦 New order placed with 4 item(s)!");
}

#[tokio::test]
async fn test_failure_on_third_group_cancels_first_two() {
    let h = TestHarness::new(FaultyStore::failing_placement(3));
    let (vendors, lines) = three_vendor_cart();

    let err = h.coordinator.checkout(request(lines)).await.unwrap_err();

    let SagaError::CheckoutAborted {
        checkout_id,
        vendor_id,
        ..
    } = err
    else {
        panic!("expected CheckoutAborted, got {err:?}");
    };
    assert_eq!(vendor_id, vendors[2]);

    let checkout = h.coordinator.get_checkout(checkout_id).await.unwrap().unwrap();
    assert_eq!(checkout.state(), CheckoutState::Failed);
    assert_eq!(checkout.failed_vendor_id(), Some(vendors[2]));
    assert_eq!(checkout.orders().len(), 2);
    assert_eq!(checkout.live_orders().count(), 0);

    for placed in checkout.orders() {
        assert_eq!(h.status_of(placed.order_id).await, OrderStatus::Cancelled);
    }
}

#[tokio::test]
async fn test_failure_on_first_group_writes_no_orders() {
    let h = TestHarness::new(FaultyStore::failing_placement(1));
    let (_, lines) = three_vendor_cart();

    let err = h.coordinator.checkout(request(lines)).await.unwrap_err();
    assert!(matches!(err, SagaError::CheckoutAborted { .. }));

    assert!(h.store.inner.get_events_by_type("OrderPlaced").await.unwrap().is_empty());
    assert!(h.store.inner.get_events_by_type("OrderCancelled").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_sibling_cancel_is_recorded_and_compensation_continues() {
    let store = FaultyStore {
        fail_placement: 3,
        fail_cancellations: true,
        ..FaultyStore::default()
    };
    let h = TestHarness::new(store);
    let (_, lines) = three_vendor_cart();

    let SagaError::CheckoutAborted { checkout_id, .. } =
        h.coordinator.checkout(request(lines)).await.unwrap_err()
    else {
        panic!("expected CheckoutAborted");
    };

    let checkout = h.coordinator.get_checkout(checkout_id).await.unwrap().unwrap();
    assert_eq!(checkout.state(), CheckoutState::Failed);
    assert_eq!(checkout.live_orders().count(), 2);

    let failures = h
        .store
        .inner
        .get_events_by_type("SiblingCancelFailed")
        .await
        .unwrap();
    assert_eq!(failures.len(), 2);
}

#[tokio::test]
async fn test_missing_vendor_rejects_cart_before_any_write() {
    let h = TestHarness::new(FaultyStore::default());
    let mut line = CartLine::new("ignored", "p1", "Mug", 1, Money::from_cents(100));
    line.vendor_id = None;

    let err = h
        .coordinator
        .checkout(request(vec![
            CartLine::new(VendorId::new().to_string(), "p0", "Pen", 1, Money::from_cents(100)),
            line,
        ]))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(h.store.inner.event_count().await, 0);
}

#[tokio::test]
async fn test_checkout_record_can_be_reloaded() {
    let h = TestHarness::new(FaultyStore::default());
    let (_, lines) = three_vendor_cart();

    let outcome = h.coordinator.checkout(request(lines)).await.unwrap();
    let checkout = h
        .coordinator
        .get_checkout(outcome.checkout_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(checkout.state(), CheckoutState::Completed);
    assert_eq!(checkout.line_count(), 4);
    assert_eq!(checkout.vendor_ids().len(), 3);
    // CheckoutStarted + 3 × VendorOrderPlaced + CheckoutCompleted
    assert_eq!(checkout.version(), Version::new(5));
}

#[tokio::test]
async fn test_unknown_checkout_and_order_ids_are_not_checkouts() {
    let h = TestHarness::new(FaultyStore::default());
    let (_, lines) = three_vendor_cart();
    let outcome = h.coordinator.checkout(request(lines)).await.unwrap();

    assert!(h.coordinator.get_checkout(AggregateId::new()).await.unwrap().is_none());

    let order_id = outcome.orders[0].id().unwrap();
    assert!(h.coordinator.get_checkout(order_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unlogged_placement_is_still_compensated() {
    let h = TestHarness::new(FaultyStore::failing_log_event("VendorOrderPlaced"));
    let (_, lines) = three_vendor_cart();

    let err = h.coordinator.checkout(request(lines)).await.unwrap_err();
    let SagaError::CheckoutLogFailed { checkout_id, .. } = err else {
        panic!("expected CheckoutLogFailed, got {err:?}");
    };

    let placed = h.store.inner.get_events_by_type("OrderPlaced").await.unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(
        h.status_of(placed[0].aggregate_id).await,
        OrderStatus::Cancelled
    );

    let cancelled = h
        .store
        .inner
        .get_events_by_type("SiblingOrderCancelled")
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);

    let checkout = h.coordinator.get_checkout(checkout_id).await.unwrap().unwrap();
    assert_eq!(checkout.state(), CheckoutState::Failed);
}

#[tokio::test]
async fn test_unlogged_completion_cancels_every_order() {
    let h = TestHarness::new(FaultyStore::failing_log_event("CheckoutCompleted"));
    let (_, lines) = three_vendor_cart();

    let err = h.coordinator.checkout(request(lines)).await.unwrap_err();
    let SagaError::CheckoutLogFailed { checkout_id, .. } = err else {
        panic!("expected CheckoutLogFailed, got {err:?}");
    };

    let checkout = h.coordinator.get_checkout(checkout_id).await.unwrap().unwrap();
    assert_eq!(checkout.state(), CheckoutState::Failed);
    assert_eq!(checkout.orders().len(), 3);
    assert_eq!(checkout.live_orders().count(), 0);
    for placed in checkout.orders() {
        assert_eq!(h.status_of(placed.order_id).await, OrderStatus::Cancelled);
    }
}

#[tokio::test]
async fn test_compensation_survives_log_failures() {
    let h = TestHarness::new(FaultyStore {
        fail_placement: 3,
        fail_log_event: Some("SiblingOrderCancelled"),
        ..FaultyStore::default()
    });
    let (_, lines) = three_vendor_cart();

    let err = h.coordinator.checkout(request(lines)).await.unwrap_err();
    let SagaError::CheckoutAborted { checkout_id, .. } = err else {
        panic!("expected CheckoutAborted, got {err:?}");
    };

    // Both siblings are cancelled even though neither cancellation was logged
    let cancelled = h.store.inner.get_events_by_type("OrderCancelled").await.unwrap();
    assert_eq!(cancelled.len(), 2);

    let checkout = h.coordinator.get_checkout(checkout_id).await.unwrap().unwrap();
    assert_eq!(checkout.state(), CheckoutState::Failed);
}

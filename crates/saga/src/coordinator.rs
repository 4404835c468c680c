//! Checkout coordinator fanning one cart out into vendor orders.

use common::AggregateId;
use domain::{
    Actor, Aggregate, CancelOrder, CartError, CartLine, DomainEvent, Money, NotificationIntent, Order,
    OrderError, OrderService, OrderStatus, PaymentInfo, PlaceOrder, ShippingAddress, UserId,
    VendorGroup, VendorId, partition_by_vendor,
};
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::Checkout;
use crate::directory::VendorDirectory;
use crate::error::SagaError;
use crate::events::CheckoutEvent;

/// A cart submitted for checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub shipping_address: ShippingAddress,

    /// Grand total claimed by the client. Never trusted; only compared.
    pub declared_total: Option<Money>,

    /// Initial status claimed by the client. Only `processing` is accepted.
    pub declared_status: Option<String>,
    pub payment: PaymentInfo,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub checkout_id: AggregateId,

    /// One order per vendor, in the order vendors first appear in the cart.
    pub orders: Vec<Order>,

    /// Notifications to deliver now that every order is committed.
    pub notifications: Vec<NotificationIntent>,
}

/// Orchestrates the checkout saga.
///
/// Vendor orders are placed one after another. When one fails, the orders
/// already placed are cancelled in reverse order and the checkout ends
/// `failed`. The checkout itself is event-sourced.
pub struct CheckoutCoordinator<S, D>
where
    S: EventStore,
    D: VendorDirectory,
{
    store: S,
    order_service: OrderService<S>,
    directory: D,
}

impl<S, D> CheckoutCoordinator<S, D>
where
    S: EventStore + Clone,
    D: VendorDirectory,
{
    pub fn new(store: S, directory: D) -> Self {
        let order_service = OrderService::new(store.clone());
        Self {
            store,
            order_service,
            directory,
        }
    }

    /// Validates the cart and places one order per vendor.
    ///
    /// Nothing is written unless the whole cart is valid.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, lines = request.lines.len()))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, SagaError> {
        let groups = self.validate(&request).await?;
        let Some(last_vendor_id) = groups.last().map(|g| g.vendor_id) else {
            return Err(CartError::Empty.into());
        };

        metrics::counter!("checkouts_total").increment(1);
        let started = std::time::Instant::now();

        let cart_total: Money = groups.iter().map(|g| g.subtotal).sum();
        if let Some(declared) = request.declared_total
            && declared != cart_total
        {
            tracing::warn!(%declared, computed = %cart_total, "declared total does not match cart");
        }

        let checkout_id = AggregateId::new();
        let mut log = CheckoutLog::new(checkout_id);

        let started_event = CheckoutEvent::checkout_started(
            checkout_id,
            request.user_id,
            groups.iter().map(|g| g.vendor_id).collect(),
            request.lines.len(),
            cart_total,
        );
        self.record(&mut log, started_event).await?;

        // Tracked outside the checkout record so compensation still reaches
        // orders whose placement could not be logged.
        let mut placed: Vec<AggregateId> = Vec::with_capacity(groups.len());
        let mut orders = Vec::with_capacity(groups.len());

        for group in &groups {
            let order_id = AggregateId::new();
            let cmd = PlaceOrder {
                order_id,
                user_id: request.user_id,
                vendor_id: group.vendor_id,
                checkout_id: Some(checkout_id),
                items: group.items.clone(),
                shipping_address: request.shipping_address.clone(),
                payment: request.payment.clone(),
            };

            let failure = match self.order_service.place_order(cmd).await {
                Ok(result) => {
                    placed.push(order_id);
                    orders.push(result.aggregate);
                    let event =
                        CheckoutEvent::vendor_order_placed(group.vendor_id, order_id, group.subtotal);
                    match self.record(&mut log, event).await {
                        Ok(()) => continue,
                        Err(e) => {
                            tracing::error!(%checkout_id, %order_id, error = %e, "failed to log placed order");
                            SagaError::CheckoutLogFailed {
                                checkout_id,
                                source: Box::new(e),
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(%checkout_id, vendor_id = %group.vendor_id, error = %e, "vendor order failed");
                    let event =
                        CheckoutEvent::vendor_order_failed(group.vendor_id, order_id, e.to_string());
                    self.record_best_effort(&mut log, event).await;
                    SagaError::CheckoutAborted {
                        checkout_id,
                        vendor_id: group.vendor_id,
                        source: e,
                    }
                }
            };

            let reason = format!("Order for vendor {} could not be placed", group.vendor_id);
            self.compensate(&mut log, &placed, group.vendor_id, reason)
                .await;
            metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
            return Err(failure);
        }

        if let Err(e) = self.record(&mut log, CheckoutEvent::checkout_completed()).await {
            tracing::error!(%checkout_id, error = %e, "failed to log checkout completion");
            let reason = "Checkout could not be completed".to_string();
            self.compensate(&mut log, &placed, last_vendor_id, reason)
                .await;
            metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
            return Err(SagaError::CheckoutLogFailed {
                checkout_id,
                source: Box::new(e),
            });
        }

        let mut notifications: Vec<NotificationIntent> = groups
            .iter()
            .map(|g| NotificationIntent::vendor_new_order(g.vendor_id, g.items.len()))
            .collect();
        notifications.push(NotificationIntent::admin_new_order(request.lines.len()));

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        tracing::info!(%checkout_id, orders = orders.len(), duration, "checkout completed");

        Ok(CheckoutOutcome {
            checkout_id,
            orders,
            notifications,
        })
    }

    /// Checks the request and partitions the cart. Performs no writes.
    async fn validate(&self, request: &CheckoutRequest) -> Result<Vec<VendorGroup>, SagaError> {
        if let Some(status) = request.declared_status.as_deref() {
            let accepted = status
                .parse::<OrderStatus>()
                .is_ok_and(|s| s == OrderStatus::Processing);
            if !accepted {
                return Err(OrderError::InvalidInitialStatus(status.to_string()).into());
            }
        }

        let groups = partition_by_vendor(&request.lines)?;
        request.shipping_address.validate()?;

        for group in &groups {
            if !self.directory.vendor_exists(group.vendor_id).await {
                return Err(CartError::UnknownVendor {
                    index: first_line_of(&request.lines, group.vendor_id),
                    vendor_id: group.vendor_id,
                }
                .into());
            }
        }

        Ok(groups)
    }

    /// Cancels the orders placed so far, newest first.
    ///
    /// Never stops early: a sibling that cannot be cancelled, or a log entry
    /// that cannot be written, is reported and the remaining siblings are
    /// still cancelled.
    #[tracing::instrument(skip(self, log, placed), fields(checkout_id = %log.checkout_id))]
    async fn compensate(
        &self,
        log: &mut CheckoutLog,
        placed: &[AggregateId],
        failed_vendor_id: VendorId,
        reason: String,
    ) {
        let checkout_id = log.checkout_id;
        self.record_best_effort(log, CheckoutEvent::compensation_started(failed_vendor_id))
            .await;

        for &order_id in placed.iter().rev() {
            let cmd = CancelOrder::new(order_id, Actor::System)
                .with_reason(format!("Checkout {checkout_id} failed"));

            let event = match self.order_service.cancel_order(cmd).await {
                Ok(_) => CheckoutEvent::sibling_order_cancelled(order_id),
                Err(e) => {
                    tracing::warn!(%checkout_id, %order_id, error = %e, "failed to cancel sibling order");
                    CheckoutEvent::sibling_cancel_failed(order_id, e.to_string())
                }
            };
            self.record_best_effort(log, event).await;
        }

        self.record_best_effort(log, CheckoutEvent::checkout_failed(reason))
            .await;

        metrics::counter!("checkout_failed_total").increment(1);
        tracing::warn!(%checkout_id, %failed_vendor_id, "checkout failed");
    }

    /// Loads a checkout record by ID from the event store.
    pub async fn get_checkout(
        &self,
        checkout_id: AggregateId,
    ) -> Result<Option<Checkout>, SagaError> {
        let events = self.store.get_events_for_aggregate(checkout_id).await?;

        let Some(last) = events.last() else {
            return Ok(None);
        };
        if last.aggregate_type != Checkout::aggregate_type() {
            return Ok(None);
        }
        let version = last.version;

        let mut checkout = Checkout::default();
        for envelope in events {
            let event: CheckoutEvent = serde_json::from_value(envelope.payload)?;
            checkout.apply(event);
        }
        checkout.set_version(version);
        Ok(Some(checkout))
    }

    /// Appends `event` to the checkout stream and applies it to the record.
    async fn record(&self, log: &mut CheckoutLog, event: CheckoutEvent) -> Result<(), SagaError> {
        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(log.checkout_id)
            .aggregate_type(Checkout::aggregate_type())
            .version(log.version.next())
            .payload(&event)?
            .build()?;

        log.version = self
            .store
            .append(vec![envelope], AppendOptions::expect_version(log.version))
            .await?;
        log.record.apply(event);
        Ok(())
    }

    async fn record_best_effort(&self, log: &mut CheckoutLog, event: CheckoutEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.record(log, event).await {
            tracing::error!(checkout_id = %log.checkout_id, event_type, error = %e, "failed to log checkout event");
        }
    }
}

/// The checkout stream being written by one `checkout` call.
struct CheckoutLog {
    checkout_id: AggregateId,
    version: Version,
    record: Checkout,
}

impl CheckoutLog {
    fn new(checkout_id: AggregateId) -> Self {
        Self {
            checkout_id,
            version: Version::initial(),
            record: Checkout::default(),
        }
    }
}

/// Index of the first cart line naming `vendor_id`.
fn first_line_of(lines: &[CartLine], vendor_id: VendorId) -> usize {
    lines
        .iter()
        .position(|line| {
            line.vendor_id
                .as_deref()
                .and_then(|v| v.trim().parse::<VendorId>().ok())
                == Some(vendor_id)
        })
        .unwrap_or_default()
}

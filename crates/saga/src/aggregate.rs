//! Checkout aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Aggregate, Money, UserId, VendorId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::events::CheckoutEvent;
use crate::state::CheckoutState;

/// A vendor order created by a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub vendor_id: VendorId,
    pub order_id: AggregateId,
    pub subtotal: Money,
    /// Set once compensation has cancelled the order.
    pub cancelled: bool,
}

/// An event-sourced checkout record.
///
/// Tracks which vendor orders a single cart submission produced, and how the
/// submission ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    id: Option<AggregateId>,
    #[serde(skip)]
    version: Version,
    user_id: Option<UserId>,
    state: CheckoutState,
    vendor_ids: Vec<VendorId>,
    line_count: usize,
    cart_total: Money,
    orders: Vec<PlacedOrder>,
    failed_vendor_id: Option<VendorId>,
    failure_reason: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Aggregate for Checkout {
    type Event = CheckoutEvent;
    type Error = SagaError;

    fn aggregate_type() -> &'static str {
        "Checkout"
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
        match event {
            CheckoutEvent::CheckoutStarted(data) => {
                self.id = Some(data.checkout_id);
                self.user_id = Some(data.user_id);
                self.vendor_ids = data.vendor_ids;
                self.line_count = data.line_count;
                self.cart_total = data.cart_total;
                self.started_at = Some(data.started_at);
                self.state = CheckoutState::Placing;
            }
            CheckoutEvent::VendorOrderPlaced(data) => {
                self.orders.push(PlacedOrder {
                    vendor_id: data.vendor_id,
                    order_id: data.order_id,
                    subtotal: data.subtotal,
                    cancelled: false,
                });
            }
            CheckoutEvent::VendorOrderFailed(data) => {
                self.failed_vendor_id = Some(data.vendor_id);
                self.failure_reason = Some(data.error);
            }
            CheckoutEvent::CompensationStarted(_) => {
                self.state = CheckoutState::Compensating;
            }
            CheckoutEvent::SiblingOrderCancelled(data) => {
                if let Some(order) = self.orders.iter_mut().find(|o| o.order_id == data.order_id) {
                    order.cancelled = true;
                }
            }
            CheckoutEvent::SiblingCancelFailed(_) => {
                // The order stays live; the failure is kept in the event log.
            }
            CheckoutEvent::CheckoutCompleted(data) => {
                self.state = CheckoutState::Completed;
                self.finished_at = Some(data.completed_at);
            }
            CheckoutEvent::CheckoutFailed(data) => {
                self.state = CheckoutState::Failed;
                self.failure_reason = Some(data.reason);
                self.finished_at = Some(data.failed_at);
            }
        }
    }
}

// Query methods
impl Checkout {
    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Vendors in placement order.
    pub fn vendor_ids(&self) -> &[VendorId] {
        &self.vendor_ids
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn cart_total(&self) -> Money {
        self.cart_total
    }

    /// Orders placed so far, in placement order.
    pub fn orders(&self) -> &[PlacedOrder] {
        &self.orders
    }

    /// Placed orders that compensation has not cancelled yet.
    pub fn live_orders(&self) -> impl Iterator<Item = &PlacedOrder> {
        self.orders.iter().filter(|o| !o.cancelled)
    }

    pub fn failed_vendor_id(&self) -> Option<VendorId> {
        self.failed_vendor_id
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

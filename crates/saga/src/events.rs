//! Checkout domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{DomainEvent, Money, UserId, VendorId};
use serde::{Deserialize, Serialize};

/// Events recorded while a checkout fans out into vendor orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutEvent {
    /// The cart passed validation and order placement began.
    CheckoutStarted(CheckoutStartedData),

    /// One vendor order was placed.
    VendorOrderPlaced(VendorOrderPlacedData),

    /// Placing one vendor order failed.
    VendorOrderFailed(VendorOrderFailedData),

    /// Sibling orders are about to be cancelled.
    CompensationStarted(CompensationData),

    /// A previously placed sibling order was cancelled.
    SiblingOrderCancelled(SiblingOrderData),

    /// Cancelling a sibling order failed (logged, compensation continues).
    SiblingCancelFailed(SiblingCancelFailedData),

    /// Every vendor order was placed.
    CheckoutCompleted(CheckoutCompletedData),

    /// The checkout failed after compensation.
    CheckoutFailed(CheckoutFailedData),
}

impl DomainEvent for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::CheckoutStarted(_) => "CheckoutStarted",
            CheckoutEvent::VendorOrderPlaced(_) => "VendorOrderPlaced",
            CheckoutEvent::VendorOrderFailed(_) => "VendorOrderFailed",
            CheckoutEvent::CompensationStarted(_) => "CompensationStarted",
            CheckoutEvent::SiblingOrderCancelled(_) => "SiblingOrderCancelled",
            CheckoutEvent::SiblingCancelFailed(_) => "SiblingCancelFailed",
            CheckoutEvent::CheckoutCompleted(_) => "CheckoutCompleted",
            CheckoutEvent::CheckoutFailed(_) => "CheckoutFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStartedData {
    pub checkout_id: AggregateId,
    pub user_id: UserId,

    /// Vendors in the order their groups will be placed.
    pub vendor_ids: Vec<VendorId>,

    /// Number of line items in the cart.
    pub line_count: usize,

    /// Σ(unit_price × quantity) over the whole cart.
    pub cart_total: Money,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOrderPlacedData {
    pub vendor_id: VendorId,
    pub order_id: AggregateId,
    pub subtotal: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOrderFailedData {
    pub vendor_id: VendorId,
    pub order_id: AggregateId,
    /// Error message describing the failure.
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationData {
    /// The vendor whose order could not be placed.
    pub failed_vendor_id: VendorId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingOrderData {
    pub order_id: AggregateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingCancelFailedData {
    pub order_id: AggregateId,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCompletedData {
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutFailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl CheckoutEvent {
    pub fn checkout_started(
        checkout_id: AggregateId,
        user_id: UserId,
        vendor_ids: Vec<VendorId>,
        line_count: usize,
        cart_total: Money,
    ) -> Self {
        CheckoutEvent::CheckoutStarted(CheckoutStartedData {
            checkout_id,
            user_id,
            vendor_ids,
            line_count,
            cart_total,
            started_at: Utc::now(),
        })
    }

    pub fn vendor_order_placed(vendor_id: VendorId, order_id: AggregateId, subtotal: Money) -> Self {
        CheckoutEvent::VendorOrderPlaced(VendorOrderPlacedData {
            vendor_id,
            order_id,
            subtotal,
        })
    }

    pub fn vendor_order_failed(
        vendor_id: VendorId,
        order_id: AggregateId,
        error: impl Into<String>,
    ) -> Self {
        CheckoutEvent::VendorOrderFailed(VendorOrderFailedData {
            vendor_id,
            order_id,
            error: error.into(),
        })
    }

    pub fn compensation_started(failed_vendor_id: VendorId) -> Self {
        CheckoutEvent::CompensationStarted(CompensationData { failed_vendor_id })
    }

    pub fn sibling_order_cancelled(order_id: AggregateId) -> Self {
        CheckoutEvent::SiblingOrderCancelled(SiblingOrderData { order_id })
    }

    pub fn sibling_cancel_failed(order_id: AggregateId, error: impl Into<String>) -> Self {
        CheckoutEvent::SiblingCancelFailed(SiblingCancelFailedData {
            order_id,
            error: error.into(),
        })
    }

    pub fn checkout_completed() -> Self {
        CheckoutEvent::CheckoutCompleted(CheckoutCompletedData {
            completed_at: Utc::now(),
        })
    }

    pub fn checkout_failed(reason: impl Into<String>) -> Self {
        CheckoutEvent::CheckoutFailed(CheckoutFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}

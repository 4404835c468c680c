//! Order status and its transition table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Lifecycle status of a vendor order.
///
/// ```text
/// processing ──► shipped ──► delivered
///     │             │            │
///     ▼             └────┬───────┘
/// cancelled              ▼
///            processing_refund ──► refund_approved ──► refunded
///                       └────────► refund_rejected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    ProcessingRefund,
    RefundApproved,
    RefundRejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::ProcessingRefund,
        OrderStatus::RefundApproved,
        OrderStatus::RefundRejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::ProcessingRefund => "processing_refund",
            OrderStatus::RefundApproved => "refund_approved",
            OrderStatus::RefundRejected => "refund_rejected",
        }
    }

    /// Human readable form, e.g. `Processing Refund`.
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Statuses belonging to the refund sub-flow, including the settled one.
    pub fn is_refund_state(&self) -> bool {
        matches!(
            self,
            OrderStatus::ProcessingRefund
                | OrderStatus::RefundApproved
                | OrderStatus::RefundRejected
                | OrderStatus::Refunded
        )
    }

    /// A buyer may ask for a refund once the order is live or fulfilled.
    pub fn can_request_refund(&self) -> bool {
        matches!(
            self,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }

    /// Returns true if `target` is a legal fulfilment move from this status.
    pub fn can_fulfil_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
        )
    }

    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            OrderStatus::RefundApproved | OrderStatus::RefundRejected
        )
    }

    /// Statuses counted as open work on the dashboard.
    pub fn is_pending(&self) -> bool {
        *self == OrderStatus::Processing
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

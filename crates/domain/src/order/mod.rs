//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use commands::*;
pub use events::{
    OrderCancelledData, OrderEvent, OrderPlacedData, RefundRequestedData, RefundResolvedData,
    StatusChangeData,
};
pub use service::OrderService;
pub use status::OrderStatus;
pub use value_objects::{
    LineItem, Money, PaymentInfo, PaymentStatus, ProductId, ShippingAddress, UserId, VendorId,
};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order does not exist or was deleted.
    #[error("Order not found")]
    NotFound,

    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid quantity for product {product_id}: must be at least 1")]
    InvalidQuantity { product_id: ProductId },

    #[error("Invalid price for product {product_id}: must not be negative")]
    InvalidPrice { product_id: ProductId },

    #[error("Shipping address is incomplete: {field} is required")]
    IncompleteShippingAddress { field: &'static str },

    /// A status string that names no known status.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// A new order may only start out as `processing`.
    #[error("New orders must start in processing, not {0}")]
    InvalidInitialStatus(String),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A vendor acted on an order that belongs to another vendor.
    #[error("You are not authorized to update this order")]
    NotOrderVendor,

    /// A user acted on an order that belongs to another user.
    #[error("You are not authorized to access this order")]
    NotOrderOwner,

    /// The actor's role may not perform this command at all.
    #[error("{role} is not permitted to {action}")]
    NotPermitted {
        role: &'static str,
        action: &'static str,
    },

    #[error("Order has already been refunded")]
    RefundAlreadyRequested,

    #[error("Invalid refund status")]
    InvalidRefundStatus,

    #[error("Cannot change refund status from {from} to {to}.")]
    RefundResolution { from: OrderStatus, to: OrderStatus },
}

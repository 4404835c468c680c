//! Domain layer of the marketplace order service.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - Command trait and CommandHandler with optimistic concurrency
//! - The vendor Order aggregate with its status machine and refund sub-flow
//! - Vendor partitioning of multi-vendor carts
//! - Admin and vendor notifications with a retrying dispatcher

pub mod actor;
pub mod aggregate;
pub mod cart;
pub mod command;
pub mod error;
pub mod notification;
pub mod order;

pub use actor::Actor;
pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{CartError, CartLine, VendorGroup, partition_by_vendor};
pub use command::{Command, CommandHandler, CommandResult, EventMetadata};
pub use error::DomainError;
pub use notification::{
    Audience, DispatchReport, Notification, NotificationDispatcher, NotificationError,
    NotificationEvent, NotificationIntent, NotificationKind, NotificationService,
    NotificationSink,
};
pub use order::{
    CancelOrder, DeleteOrder, LineItem, Money, Order, OrderError, OrderEvent, OrderService,
    OrderStatus, PaymentInfo, PaymentStatus, PlaceOrder, ProductId, RequestRefund, ResolveRefund,
    SettleRefund, ShippingAddress, UpdateOrderStatus, UserId, VendorId,
};

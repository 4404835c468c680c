//! Read model views for the query side.

pub mod notifications;
pub mod orders;

pub use notifications::{NotificationSummary, NotificationsView};
pub use orders::{OrderSummary, OrdersView};

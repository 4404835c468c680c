//! Read models and projections for the query side.
//!
//! - [`Projection`] trait for processing events into read models
//! - [`ReadModel`] trait for sizing views
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - [`OrdersView`] and [`NotificationsView`], plus the admin dashboard
//!   aggregations in [`dashboard`]

pub mod dashboard;
pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use dashboard::{DailyTrend, DashboardStats, dashboard_stats, weekly_trends};
pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{NotificationSummary, NotificationsView, OrderSummary, OrdersView};

//! HTTP surface of the marketplace order service.
//!
//! Buyers check out multi-vendor carts, vendors fulfil their own orders,
//! admins resolve refunds and read the dashboard. Structured logging comes
//! from `tracing`, metrics are exported in Prometheus format.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::get;
use domain::{NotificationDispatcher, NotificationService, OrderService};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{NotificationsView, OrdersView, ProjectionProcessor};
use saga::{CheckoutCoordinator, InMemoryVendorDirectory};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::JwtKeys;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub orders: OrderService<S>,
    pub checkout: CheckoutCoordinator<S, InMemoryVendorDirectory>,
    pub dispatcher: NotificationDispatcher<NotificationService<S>>,
    pub orders_view: OrdersView,
    pub notifications_view: NotificationsView,
    pub processor: ProjectionProcessor<S>,
    pub event_store: S,
    pub jwt: JwtKeys,
    pub config: Config,
}

impl<S: EventStore> FromRef<Arc<AppState<S>>> for JwtKeys {
    fn from_ref(state: &Arc<AppState<S>>) -> Self {
        state.jwt.clone()
    }
}

/// Wires services, read models and the projection processor over `event_store`.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: Config,
) -> Arc<AppState<S>> {
    let directory = if config.known_vendor_ids.is_empty() {
        InMemoryVendorDirectory::permissive()
    } else {
        InMemoryVendorDirectory::with_vendors(config.known_vendor_ids.iter().copied())
    };

    let dispatcher = NotificationDispatcher::new(NotificationService::new(event_store.clone()))
        .with_max_attempts(config.notify_max_attempts)
        .with_backoff(Duration::from_millis(config.notify_retry_backoff_ms));

    let orders_view = OrdersView::new();
    let notifications_view = NotificationsView::new();

    let mut processor = ProjectionProcessor::new(event_store.clone());
    processor.register(Box::new(orders_view.clone()));
    processor.register(Box::new(notifications_view.clone()));

    Arc::new(AppState {
        orders: OrderService::new(event_store.clone()),
        checkout: CheckoutCoordinator::new(event_store.clone(), directory),
        dispatcher,
        orders_view,
        notifications_view,
        processor,
        jwt: JwtKeys::new(config.jwt_secret.as_bytes()),
        event_store,
        config,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .merge(routes::orders::router::<S>())
        .merge(routes::admin::router::<S>())
        .merge(routes::notifications::router::<S>())
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

//! Admin endpoints under `/api/admin`: orders, refunds, checkouts and dashboard.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use common::AggregateId;
use domain::{Actor, DeleteOrder, ResolveRefund, SettleRefund, UpdateOrderStatus, UserId};
use event_store::{EventEnvelope, EventStore};
use projections::{DailyTrend, DashboardStats, dashboard_stats, weekly_trends};
use saga::Checkout;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::orders::{OrderResponse, order_list};
use super::{parse_id, refresh};
use crate::AppState;
use crate::auth::AuthAdmin;
use crate::error::ApiError;
use crate::extract::ApiJson;

pub fn router<S: EventStore + Clone + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/admin/orders", get(list_orders::<S>))
        .route("/api/admin/orders/user/{user_id}", get(user_orders::<S>))
        .route(
            "/api/admin/orders/{id}",
            get(get_order::<S>).delete(delete_order::<S>),
        )
        .route("/api/admin/orders/{id}/status", put(update_status::<S>))
        .route(
            "/api/admin/orders/{id}/refund",
            put(resolve_refund::<S>).patch(settle_refund::<S>),
        )
        .route("/api/admin/orders/{id}/events", get(order_events::<S>))
        .route("/api/admin/checkouts/{id}", get(get_checkout::<S>))
        .route("/api/admin/dashboard/stats", get(stats::<S>))
        .route("/api/admin/dashboard/weekly-trends", get(trends::<S>))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsResponse {
    pub orders_today: usize,
    pub delivered_orders: usize,
    pub pending_orders: usize,
    pub canceled_orders: usize,
    pub today_sales: f64,
    pub yesterday_sales: f64,
    pub this_month_sales: f64,
    pub all_time_sales: f64,
    pub avg_order_value: f64,
    pub best_selling_product: String,
}

impl From<DashboardStats> for DashboardStatsResponse {
    fn from(stats: DashboardStats) -> Self {
        Self {
            orders_today: stats.orders_today,
            delivered_orders: stats.delivered_orders,
            pending_orders: stats.pending_orders,
            canceled_orders: stats.cancelled_orders,
            today_sales: stats.today_sales.as_major(),
            yesterday_sales: stats.yesterday_sales.as_major(),
            this_month_sales: stats.this_month_sales.as_major(),
            all_time_sales: stats.all_time_sales.as_major(),
            avg_order_value: stats.avg_order_value.as_major(),
            best_selling_product: stats.best_selling_product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub date: String,
    pub orders: usize,
    pub sales: f64,
}

impl From<DailyTrend> for TrendResponse {
    fn from(trend: DailyTrend) -> Self {
        Self {
            date: trend.date.format("%Y-%m-%d").to_string(),
            orders: trend.orders,
            sales: trend.sales.as_major(),
        }
    }
}

/// Response type for event envelope data.
#[derive(Debug, Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: Value,
    pub metadata: Value,
}

impl From<EventEnvelope> for EventEnvelopeResponse {
    fn from(e: EventEnvelope) -> Self {
        Self {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            aggregate_id: e.aggregate_id.to_string(),
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
            metadata: Value::Object(e.metadata.into_iter().collect()),
        }
    }
}

fn admin(AuthAdmin(sub): AuthAdmin) -> Actor {
    Actor::Admin(sub)
}

/// GET /api/admin/orders - every live order, newest first.
#[tracing::instrument(skip_all)]
pub async fn list_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
) -> Result<Json<Value>, ApiError> {
    refresh(&state).await?;
    Ok(order_list(state.orders_view.all().await))
}

/// GET /api/admin/orders/user/{user_id}
#[tracing::instrument(skip(state, _admin))]
pub async fn user_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user")?;
    refresh(&state).await?;
    Ok(order_list(state.orders_view.for_user(user_id).await))
}

/// GET /api/admin/orders/{id}
#[tracing::instrument(skip(state, _admin))]
pub async fn get_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = state
        .orders
        .get_order(parse_id(&id, "order")?)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(Json(
        json!({ "success": true, "order": OrderResponse::from(&order) }),
    ))
}

/// PUT /api/admin/orders/{id}/status
#[tracing::instrument(skip(state, caller, req))]
pub async fn update_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&id, "order")?;
    let order = state
        .orders
        .update_status(UpdateOrderStatus::new(order_id, admin(caller), req.status))
        .await?
        .aggregate;

    Ok(Json(json!({
        "message": format!("Order status updated to \"{}\"", order.status().display_name()),
        "order": OrderResponse::from(&order),
    })))
}

/// PUT /api/admin/orders/{id}/refund - approve or reject a pending refund.
#[tracing::instrument(skip(state, caller, req))]
pub async fn resolve_refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&id, "order")?;
    let order = state
        .orders
        .resolve_refund(ResolveRefund::new(order_id, admin(caller), req.status))
        .await?
        .aggregate;

    Ok(Json(json!({
        "message": format!("Order {} successfully", order.status().as_str().replace('_', " ")),
        "order": OrderResponse::from(&order),
    })))
}

/// PATCH /api/admin/orders/{id}/refund - settle an approved refund.
#[tracing::instrument(skip(state, caller))]
pub async fn settle_refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&id, "order")?;
    let order = state
        .orders
        .settle_refund(SettleRefund::new(order_id, admin(caller)))
        .await?
        .aggregate;

    Ok(Json(json!({
        "success": true,
        "message": "Order refunded successfully",
        "order": OrderResponse::from(&order),
    })))
}

/// DELETE /api/admin/orders/{id}
#[tracing::instrument(skip(state, caller))]
pub async fn delete_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&id, "order")?;
    state
        .orders
        .delete_order(DeleteOrder::new(order_id, admin(caller)))
        .await?;
    Ok(Json(
        json!({ "success": true, "message": "Order deleted successfully" }),
    ))
}

/// GET /api/admin/orders/{id}/events - the order's full audit trail.
#[tracing::instrument(skip(state, _admin))]
pub async fn order_events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let aggregate_id: AggregateId = parse_id(&id, "order")?;
    let envelopes = state.event_store.get_events_for_aggregate(aggregate_id).await?;
    if envelopes.is_empty() {
        return Err(ApiError::not_found("Order not found"));
    }
    Ok(Json(
        envelopes.into_iter().map(EventEnvelopeResponse::from).collect(),
    ))
}

/// GET /api/admin/checkouts/{id}
#[tracing::instrument(skip(state, _admin))]
pub async fn get_checkout<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Checkout>, ApiError> {
    state
        .checkout
        .get_checkout(parse_id(&id, "checkout")?)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Checkout not found"))
}

/// GET /api/admin/dashboard/stats
#[tracing::instrument(skip_all)]
pub async fn stats<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
) -> Result<Json<DashboardStatsResponse>, ApiError> {
    refresh(&state).await?;
    let orders = state.orders_view.all().await;
    Ok(Json(dashboard_stats(&orders, Utc::now()).into()))
}

/// GET /api/admin/dashboard/weekly-trends - the last seven UTC days, oldest first.
#[tracing::instrument(skip_all)]
pub async fn trends<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
) -> Result<Json<Value>, ApiError> {
    refresh(&state).await?;
    let orders = state.orders_view.all().await;
    let trends: Vec<TrendResponse> = weekly_trends(&orders, Utc::now())
        .into_iter()
        .map(TrendResponse::from)
        .collect();
    Ok(Json(json!({ "trends": trends })))
}

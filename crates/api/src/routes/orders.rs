//! Buyer and vendor order endpoints under `/api/orders`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    Actor, Aggregate, CartLine, DeleteOrder, DomainError, Money, NotificationIntent, Order,
    OrderError, OrderStatus, PaymentInfo, RequestRefund, ShippingAddress, UpdateOrderStatus,
    UserId, VendorId,
};
use event_store::EventStore;
use projections::OrderSummary;
use saga::CheckoutRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{parse_id, refresh};
use crate::AppState;
use crate::auth::{AuthUser, AuthVendor};
use crate::error::ApiError;
use crate::extract::ApiJson;

pub fn router<S: EventStore + Clone + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/orders", post(create::<S>))
        .route(
            "/api/orders/vendor-orders/{vendor_id}",
            get(vendor_orders::<S>),
        )
        .route(
            "/api/orders/vendor-refunds/{vendor_id}",
            get(vendor_refunds::<S>),
        )
        .route("/api/orders/user-orders/{user_id}", get(user_orders::<S>))
        .route("/api/orders/my/{order_id}", get(my_order::<S>))
        .route(
            "/api/orders/update-status/{order_id}",
            put(update_status::<S>),
        )
        .route("/api/orders/refund/{order_id}", put(request_refund::<S>))
        .route(
            "/api/orders/{order_id}",
            get(vendor_order::<S>).delete(delete::<S>),
        )
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
    pub user: Option<String>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    pub total_price: Option<f64>,
    pub status: Option<String>,
    #[serde(default)]
    pub payment_info: PaymentInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    #[serde(alias = "vendor")]
    pub vendor_id: Option<String>,
    #[serde(alias = "product")]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    pub vendor_id: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub user: Option<String>,
    pub vendor_id: Option<String>,
    pub checkout_id: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddress,
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_info: PaymentInfo,
    pub created_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn item_responses(items: &[domain::LineItem]) -> Vec<OrderItemResponse> {
    items
        .iter()
        .map(|item| OrderItemResponse {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.unit_price.as_major(),
        })
        .collect()
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            user: order.user_id().map(|u| u.to_string()),
            vendor_id: order.vendor_id().map(|v| v.to_string()),
            checkout_id: order.checkout_id().map(|c| c.to_string()),
            items: item_responses(order.items()),
            shipping_address: order.shipping_address().clone(),
            total_price: order.total_price().as_major(),
            status: order.status(),
            payment_info: order.payment().clone(),
            created_at: order.created_at(),
            paid_at: order.paid_at(),
            delivered_at: order.delivered_at(),
            updated_at: order.updated_at(),
        }
    }
}

impl From<OrderSummary> for OrderResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            id: summary.order_id.to_string(),
            user: Some(summary.user_id.to_string()),
            vendor_id: Some(summary.vendor_id.to_string()),
            checkout_id: summary.checkout_id.map(|c| c.to_string()),
            items: item_responses(&summary.items),
            shipping_address: summary.shipping_address,
            total_price: summary.total_price.as_major(),
            status: summary.status,
            payment_info: summary.payment,
            created_at: Some(summary.created_at),
            paid_at: summary.paid_at,
            delivered_at: summary.delivered_at,
            updated_at: Some(summary.updated_at),
        }
    }
}

pub(crate) fn order_list(orders: Vec<OrderSummary>) -> Json<Value> {
    let orders: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Json(json!({ "success": true, "orders": orders }))
}

/// Delivers notifications after the orders they describe are committed.
///
/// Failures are never surfaced to the caller. The dispatcher logs each
/// abandoned intent with its full payload so it can be replayed.
pub(crate) async fn notify<S: EventStore>(state: &AppState<S>, intents: &[NotificationIntent]) {
    let report = state.dispatcher.dispatch(intents).await;
    if report.is_complete() {
        tracing::debug!(delivered = report.delivered, "notifications dispatched");
    } else {
        let failed: Vec<String> = report
            .failed
            .iter()
            .map(|intent| intent.notification_id.to_string())
            .collect();
        tracing::warn!(
            delivered = report.delivered,
            failed = ?failed,
            "notifications left undelivered"
        );
    }
}

fn cart_lines(items: Vec<CartItemRequest>) -> Result<Vec<CartLine>, ApiError> {
    items
        .into_iter()
        .map(|item| {
            let unit_price = Money::from_major(item.price).ok_or_else(|| {
                ApiError::bad_request(format!("Invalid price for product {}", item.product_id))
            })?;
            Ok(CartLine {
                vendor_id: item.vendor_id,
                product_id: item.product_id.into(),
                name: item.name,
                quantity: item.quantity,
                unit_price,
            })
        })
        .collect()
}

// -- Handlers --

/// POST /api/orders - check out a cart, one order per vendor.
#[tracing::instrument(skip(state, req), fields(user_id = %user))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(claimed) = req.user.as_deref() {
        let claimed: UserId = parse_id(claimed, "user")?;
        if claimed != user {
            return Err(ApiError::forbidden("You can only place orders for yourself"));
        }
    }

    let declared_total = match req.total_price {
        Some(total) => Some(
            Money::from_major(total)
                .ok_or_else(|| ApiError::bad_request("Invalid total price"))?,
        ),
        None => None,
    };

    let outcome = state
        .checkout
        .checkout(CheckoutRequest {
            user_id: user,
            lines: cart_lines(req.items)?,
            shipping_address: req.shipping_address,
            declared_total,
            declared_status: req.status,
            payment: req.payment_info,
        })
        .await?;

    notify(&state, &outcome.notifications).await;

    let orders: Vec<OrderResponse> = outcome.orders.iter().map(OrderResponse::from).collect();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "orders": orders,
            "message": "Orders created successfully",
        })),
    ))
}

fn ensure_same_vendor(caller: VendorId, raw: &str) -> Result<(), ApiError> {
    let requested: VendorId = parse_id(raw, "vendor")?;
    if requested != caller {
        return Err(ApiError::forbidden(
            "You are not authorized to view these orders",
        ));
    }
    Ok(())
}

/// GET /api/orders/vendor-orders/{vendor_id} - the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn vendor_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(vendor_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ensure_same_vendor(vendor, &vendor_id)?;
    refresh(&state).await?;
    Ok(order_list(state.orders_view.for_vendor(vendor).await))
}

/// GET /api/orders/vendor-refunds/{vendor_id} - approved or rejected refunds.
#[tracing::instrument(skip(state))]
pub async fn vendor_refunds<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(vendor_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ensure_same_vendor(vendor, &vendor_id)?;
    refresh(&state).await?;
    Ok(order_list(
        state.orders_view.resolved_refunds_for_vendor(vendor).await,
    ))
}

/// GET /api/orders/user-orders/{user_id}
#[tracing::instrument(skip(state))]
pub async fn user_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let requested: UserId = parse_id(&user_id, "user")?;
    if requested != user {
        return Err(ApiError::forbidden("You can only view your own orders"));
    }

    refresh(&state).await?;
    let orders = state.orders_view.for_user(user).await;
    if orders.is_empty() {
        return Err(ApiError::not_found("No orders found for this user."));
    }
    Ok(order_list(orders))
}

async fn load_order<S: EventStore>(
    state: &AppState<S>,
    order_id: AggregateId,
) -> Result<Order, ApiError> {
    state
        .orders
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))
}

/// GET /api/orders/my/{order_id} - one of the caller's own orders.
#[tracing::instrument(skip(state))]
pub async fn my_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = load_order(&state, parse_id(&order_id, "order")?).await?;
    if !order.is_owned_by(user) {
        return Err(ApiError::not_found("Order not found"));
    }
    Ok(Json(
        json!({ "success": true, "order": OrderResponse::from(&order) }),
    ))
}

/// GET /api/orders/{order_id} - one of the calling vendor's orders.
#[tracing::instrument(skip(state))]
pub async fn vendor_order<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = load_order(&state, parse_id(&order_id, "order")?).await?;
    if !order.is_sold_by(vendor) {
        return Err(ApiError::forbidden(
            "You are not authorized to access this order",
        ));
    }
    Ok(Json(
        json!({ "success": true, "order": OrderResponse::from(&order) }),
    ))
}

/// PUT /api/orders/update-status/{order_id}
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(order_id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&order_id, "order")?;
    if let Some(claimed) = req.vendor_id.as_deref() {
        let claimed: VendorId = parse_id(claimed, "vendor")?;
        if claimed != vendor {
            return Err(DomainError::from(OrderError::NotOrderVendor).into());
        }
    }

    let result = state
        .orders
        .update_status(UpdateOrderStatus::new(
            order_id,
            Actor::Vendor(vendor),
            req.status,
        ))
        .await?;

    let order = result.aggregate;
    Ok(Json(json!({
        "message": format!("Order status updated to \"{}\"", order.status().display_name()),
        "order": OrderResponse::from(&order),
    })))
}

/// PUT /api/orders/refund/{order_id} - the buyer asks for a refund.
#[tracing::instrument(skip(state))]
pub async fn request_refund<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&order_id, "order")?;
    let result = state
        .orders
        .request_refund(RequestRefund::new(order_id, user))
        .await?;
    let order = result.aggregate;

    let mut intents = vec![NotificationIntent::admin_refund_request(order_id)];
    if let Some(vendor) = order.vendor_id() {
        intents.push(NotificationIntent::vendor_refund_request(vendor, order_id));
    }
    notify(&state, &intents).await;

    Ok(Json(json!({
        "success": true,
        "message": "Order refund requested successfully",
        "order": OrderResponse::from(&order),
    })))
}

/// DELETE /api/orders/{order_id} - a vendor removes one of its orders.
#[tracing::instrument(skip(state))]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order_id: AggregateId = parse_id(&order_id, "order")?;
    match state
        .orders
        .delete_order(DeleteOrder::new(order_id, Actor::Vendor(vendor)))
        .await
    {
        Ok(_) => Ok(Json(json!({ "message": "Order deleted successfully." }))),
        Err(DomainError::Order(OrderError::NotFound | OrderError::NotOrderVendor)) => {
            Err(ApiError::not_found("Order not found."))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_wire_names() {
        let body = json!({
            "items": [
                { "vendor": "v-1", "product": "p-1", "name": "Mug", "quantity": 2, "price": 9.99 }
            ],
            "shippingAddress": {
                "fullName": "Ada", "address": "1 St", "city": "X", "postalCode": "1", "country": "UK"
            },
            "totalPrice": 19.98,
            "status": "processing",
            "paymentInfo": { "transactionId": "tx-1", "status": "completed" }
        });

        let req: CreateOrderRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.items[0].vendor_id.as_deref(), Some("v-1"));
        assert_eq!(req.shipping_address.postal_code, "1");
        assert_eq!(req.payment_info.transaction_id.as_deref(), Some("tx-1"));

        let lines = cart_lines(req.items).unwrap();
        assert_eq!(lines[0].unit_price, Money::from_cents(999));
    }

    #[test]
    fn test_non_finite_price_is_rejected() {
        let items = vec![CartItemRequest {
            vendor_id: None,
            product_id: "p".into(),
            name: "n".into(),
            quantity: 1,
            price: f64::NAN,
        }];
        assert!(matches!(cart_lines(items), Err(ApiError::BadRequest(_))));
    }
}

//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::auth::{JwtKeys, Role};
use api::config::Config;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use domain::{UserId, VendorId};
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: Router,
    state: Arc<AppState<InMemoryEventStore>>,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            notify_retry_backoff_ms: 1,
            ..Config::default()
        };
        let state = api::create_state(InMemoryEventStore::new(), config);
        let router = api::create_app(state.clone(), get_metrics_handle());
        Self { router, state }
    }

    fn keys(&self) -> &JwtKeys {
        &self.state.jwt
    }

    fn user_cookie(&self, user: UserId) -> String {
        let token = self.keys().issue(user.to_string(), Role::User, Duration::hours(1));
        format!("user_token={}", token.unwrap())
    }

    fn vendor_cookie(&self, vendor: VendorId) -> String {
        let token = self
            .keys()
            .issue(vendor.to_string(), Role::Vendor, Duration::hours(1));
        format!("vendor_token={}", token.unwrap())
    }

    fn admin_cookie(&self) -> String {
        let token = self.keys().issue("admin-1", Role::Admin, Duration::hours(1));
        format!("admin_token={}", token.unwrap())
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

fn address() -> Value {
    json!({
        "fullName": "Ada Lovelace",
        "address": "12 Analytical St",
        "city": "London",
        "postalCode": "N1 9GU",
        "country": "UK"
    })
}

/// Two vendors: A sells a mug and spoons, B sells a lamp.
fn two_vendor_cart(user: UserId, a: VendorId, b: VendorId) -> Value {
    json!({
        "items": [
            { "vendorId": a.to_string(), "productId": "mug", "name": "Mug", "quantity": 2, "price": 10.0 },
            { "vendorId": b.to_string(), "productId": "lamp", "name": "Lamp", "quantity": 1, "price": 50.0 },
            { "vendorId": a.to_string(), "productId": "spoon", "name": "Spoon", "quantity": 3, "price": 1.5 }
        ],
        "user": user.to_string(),
        "shippingAddress": address(),
        "totalPrice": 74.5,
        "status": "processing",
        "paymentInfo": { "transactionId": "tx-42", "status": "completed", "method": "card" }
    })
}

struct Placed {
    user: UserId,
    vendor_a: VendorId,
    vendor_b: VendorId,
    order_a: String,
    order_b: String,
}

async fn place_two_vendor_order(app: &TestApp) -> Placed {
    let user = UserId::new();
    let (vendor_a, vendor_b) = (VendorId::new(), VendorId::new());

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&app.user_cookie(user)),
            Some(two_vendor_cart(user, vendor_a, vendor_b)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    Placed {
        user,
        vendor_a,
        vendor_b,
        order_a: body["orders"][0]["id"].as_str().unwrap().to_string(),
        order_b: body["orders"][1]["id"].as_str().unwrap().to_string(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["readModels"]["OrdersView"], 0);
}

#[tokio::test]
async fn test_checkout_fans_out_per_vendor() {
    let app = TestApp::new();
    let user = UserId::new();
    let (a, b) = (VendorId::new(), VendorId::new());

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            Some(&app.user_cookie(user)),
            Some(two_vendor_cart(user, a, b)),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Orders created successfully");

    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["vendorId"], a.to_string());
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 2);
    assert_eq!(orders[0]["totalPrice"], 24.5);
    assert_eq!(orders[1]["vendorId"], b.to_string());
    assert_eq!(orders[1]["totalPrice"], 50.0);
    assert_eq!(orders[0]["checkoutId"], orders[1]["checkoutId"]);
    for order in orders {
        assert_eq!(order["status"], "processing");
        assert_eq!(order["user"], user.to_string());
        assert_eq!(order["paymentInfo"]["transactionId"], "tx-42");
    }
}

#[tokio::test]
async fn test_checkout_notifies_each_vendor_and_admin_once() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let admin = app.admin_cookie();

    let (_, body) = app
        .send("GET", "/api/admin/notifications/count", Some(&admin), None)
        .await;
    assert_eq!(body["count"], 1);

    let (_, body) = app
        .send("GET", "/api/admin/notifications", Some(&admin), None)
        .await;
    assert_eq!(
        body["notifications"][0]["message"],
        "📦 New order placed with 3 item(s)!"
    );
    assert_eq!(body["notifications"][0]["type"], "new_order");

    let vendor_a = app.vendor_cookie(placed.vendor_a);
    let (_, body) = app
        .send("GET", "/api/vendors/notifications", Some(&vendor_a), None)
        .await;
    let inbox = body["notifications"].as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(
        inbox[0]["message"],
        "📦 You received a new order with 2 item(s)!"
    );

    let vendor_b = app.vendor_cookie(placed.vendor_b);
    let (_, body) = app
        .send("GET", "/api/vendors/notifications/count", Some(&vendor_b), None)
        .await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_checkout_requires_user_token() {
    let app = TestApp::new();
    let user = UserId::new();

    let (status, body) = app
        .send(
            "POST",
            "/api/orders",
            None,
            Some(two_vendor_cart(user, VendorId::new(), VendorId::new())),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_REQUIRED");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_checkout_rejects_invalid_carts() {
    let app = TestApp::new();
    let user = UserId::new();
    let cookie = app.user_cookie(user);

    let mut missing_vendor = two_vendor_cart(user, VendorId::new(), VendorId::new());
    missing_vendor["items"][1]["vendorId"] = Value::Null;
    let (status, _) = app
        .send("POST", "/api/orders", Some(&cookie), Some(missing_vendor))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut shipped = two_vendor_cart(user, VendorId::new(), VendorId::new());
    shipped["status"] = json!("shipped");
    let (status, _) = app
        .send("POST", "/api/orders", Some(&cookie), Some(shipped))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/orders",
            Some(&cookie),
            Some(two_vendor_cart(UserId::new(), VendorId::new(), VendorId::new())),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nothing was written by any rejected cart
    assert_eq!(app.state.event_store.event_count().await, 0);
}

#[tokio::test]
async fn test_vendor_sees_only_own_orders() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let vendor_a = app.vendor_cookie(placed.vendor_a);

    let uri = format!("/api/orders/vendor-orders/{}", placed.vendor_a);
    let (status, body) = app.send("GET", &uri, Some(&vendor_a), None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], placed.order_a.as_str());

    let uri = format!("/api/orders/vendor-orders/{}", placed.vendor_b);
    let (status, _) = app.send("GET", &uri, Some(&vendor_a), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/orders/{}", placed.order_b);
    let (status, _) = app.send("GET", &uri, Some(&vendor_a), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_vendor_status_updates() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let uri = format!("/api/orders/update-status/{}", placed.order_a);

    let foreign = app.vendor_cookie(placed.vendor_b);
    let (status, _) = app
        .send("PUT", &uri, Some(&foreign), Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = app.vendor_cookie(placed.vendor_a);
    let (status, body) = app
        .send("PUT", &uri, Some(&owner), Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order status updated to \"Shipped\"");
    assert_eq!(body["order"]["status"], "shipped");

    // shipped orders can no longer be cancelled
    let (status, _) = app
        .send("PUT", &uri, Some(&owner), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("PUT", &uri, Some(&owner), Some(json!({ "status": "delivered" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["order"]["deliveredAt"].is_string());
}

#[tokio::test]
async fn test_refund_flow() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let user = app.user_cookie(placed.user);
    let admin = app.admin_cookie();

    let refund_uri = format!("/api/orders/refund/{}", placed.order_a);
    let (status, body) = app.send("PUT", &refund_uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order refund requested successfully");
    assert_eq!(body["order"]["status"], "processing_refund");

    let (status, body) = app.send("PUT", &refund_uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order has already been refunded");

    // The refund request reached the admin and the vendor
    let (_, body) = app
        .send("GET", "/api/admin/notifications/count", Some(&admin), None)
        .await;
    assert_eq!(body["count"], 2);
    let vendor_a = app.vendor_cookie(placed.vendor_a);
    let (_, body) = app
        .send("GET", "/api/vendors/notifications/count", Some(&vendor_a), None)
        .await;
    assert_eq!(body["count"], 2);

    let resolve_uri = format!("/api/admin/orders/{}/refund", placed.order_a);
    let (status, body) = app
        .send(
            "PUT",
            &resolve_uri,
            Some(&admin),
            Some(json!({ "status": "refund_approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order refund approved successfully");

    let refunds_uri = format!("/api/orders/vendor-refunds/{}", placed.vendor_a);
    let (_, body) = app.send("GET", &refunds_uri, Some(&vendor_a), None).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            "PUT",
            &resolve_uri,
            Some(&admin),
            Some(json!({ "status": "refund_rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot change refund status from refund_approved to refund_rejected."
    );

    let (status, body) = app.send("PATCH", &resolve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "refunded");

    // Settled refunds leave the pending-resolution list
    let (_, body) = app.send("GET", &refunds_uri, Some(&vendor_a), None).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_refund_requires_order_owner() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let stranger = app.user_cookie(UserId::new());

    let uri = format!("/api/orders/refund/{}", placed.order_a);
    let (status, _) = app.send("PUT", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_notification_mark_read_and_delete() {
    let app = TestApp::new();
    place_two_vendor_order(&app).await;
    let admin = app.admin_cookie();

    let (_, body) = app
        .send("GET", "/api/admin/notifications", Some(&admin), None)
        .await;
    let id = body["notifications"][0]["id"].as_str().unwrap().to_string();
    let read_uri = format!("/api/admin/notifications/{id}/read");

    for _ in 0..2 {
        let (status, body) = app.send("PUT", &read_uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Marked as read");
    }

    let (_, body) = app
        .send("GET", "/api/admin/notifications/count", Some(&admin), None)
        .await;
    assert_eq!(body["count"], 0);

    let delete_uri = format!("/api/admin/notifications/{id}");
    let (status, _) = app.send("DELETE", &delete_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send("DELETE", &delete_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Notification not found");
}

#[tokio::test]
async fn test_vendor_cannot_touch_admin_notifications() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let admin = app.admin_cookie();

    let (_, body) = app
        .send("GET", "/api/admin/notifications", Some(&admin), None)
        .await;
    let id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    let vendor = app.vendor_cookie(placed.vendor_a);
    let uri = format!("/api/vendors/notifications/{id}/read");
    let (status, _) = app.send("PUT", &uri, Some(&vendor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // a vendor token is the wrong role for admin routes
    let (status, _) = app
        .send("GET", "/api/admin/notifications", Some(&vendor), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_order_queries() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let user = app.user_cookie(placed.user);

    let uri = format!("/api/orders/user-orders/{}", placed.user);
    let (status, body) = app.send("GET", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);

    let other = UserId::new();
    let uri = format!("/api/orders/user-orders/{other}");
    let (status, _) = app.send("GET", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("GET", &uri, Some(&app.user_cookie(other)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No orders found for this user.");

    let uri = format!("/api/orders/my/{}", placed.order_b);
    let (status, body) = app.send("GET", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["totalPrice"], 50.0);
}

#[tokio::test]
async fn test_vendor_delete_hides_order() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let uri = format!("/api/orders/{}", placed.order_a);

    let foreign = app.vendor_cookie(placed.vendor_b);
    let (status, body) = app.send("DELETE", &uri, Some(&foreign), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Order not found.");

    let owner = app.vendor_cookie(placed.vendor_a);
    let (status, body) = app.send("DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order deleted successfully.");

    let (status, _) = app.send("GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let admin = app.admin_cookie();
    let (_, body) = app.send("GET", "/api/admin/orders", Some(&admin), None).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_dashboard() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let admin = app.admin_cookie();

    let uri = format!("/api/admin/orders/{}/status", placed.order_b);
    let (status, _) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send("GET", "/api/admin/dashboard/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ordersToday"], 2);
    assert_eq!(body["pendingOrders"], 1);
    assert_eq!(body["canceledOrders"], 1);
    assert_eq!(body["allTimeSales"], 74.5);
    assert_eq!(body["bestSellingProduct"], "Spoon");

    let (status, body) = app
        .send("GET", "/api/admin/dashboard/weekly-trends", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let trends = body["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 7);
    assert_eq!(trends[6]["orders"], 2);
}

#[tokio::test]
async fn test_admin_audit_trail_and_checkout_record() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let admin = app.admin_cookie();

    let uri = format!("/api/admin/orders/{}/events", placed.order_a);
    let (status, body) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["event_type"], "OrderPlaced");

    let uri = format!("/api/admin/orders/{}", placed.order_a);
    let (_, body) = app.send("GET", &uri, Some(&admin), None).await;
    let checkout_id = body["order"]["checkoutId"].as_str().unwrap().to_string();

    let uri = format!("/api/admin/checkouts/{checkout_id}");
    let (status, body) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "completed");
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);

    let uri = format!("/api/admin/checkouts/{}", placed.order_a);
    let (status, _) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    place_two_vendor_order(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_ids_of_another_kind_are_not_found() {
    let app = TestApp::new();
    let placed = place_two_vendor_order(&app).await;
    let admin = app.admin_cookie();

    let (_, body) = app
        .send("GET", "/api/admin/notifications", Some(&admin), None)
        .await;
    let notification_id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    let vendor_a = app.vendor_cookie(placed.vendor_a);
    let uri = format!("/api/orders/update-status/{notification_id}");
    let (status, body) = app
        .send("PUT", &uri, Some(&vendor_a), Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let user = app.user_cookie(placed.user);
    let uri = format!("/api/orders/my/{notification_id}");
    let (status, _) = app.send("GET", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/orders/refund/{notification_id}");
    let (status, _) = app.send("PUT", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/admin/orders/{notification_id}");
    let (status, _) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/admin/notifications/{}/read", placed.order_a);
    let (status, _) = app.send("PUT", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/vendors/notifications/{}", placed.order_a);
    let (status, _) = app.send("DELETE", &uri, Some(&vendor_a), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The real records are untouched
    let uri = format!("/api/orders/my/{}", placed.order_a);
    let (status, body) = app.send("GET", &uri, Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "processing");
}

//! Admin and vendor notification inboxes.
//!
//! Both inboxes share the same handlers; the caller's role picks the
//! audience, so a vendor can never see or touch another party's entries.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Audience, NotificationKind};
use event_store::EventStore;
use projections::NotificationSummary;
use serde::Serialize;
use serde_json::{Value, json};

use super::{parse_id, refresh};
use crate::AppState;
use crate::auth::{AuthAdmin, AuthVendor};
use crate::error::ApiError;

pub fn router<S: EventStore + Clone + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/admin/notifications", get(admin_list::<S>))
        .route("/api/admin/notifications/count", get(admin_count::<S>))
        .route(
            "/api/admin/notifications/{id}/read",
            put(admin_mark_read::<S>),
        )
        .route("/api/admin/notifications/{id}", delete(admin_delete::<S>))
        .route("/api/vendors/notifications", get(vendor_list::<S>))
        .route("/api/vendors/notifications/count", get(vendor_count::<S>))
        .route(
            "/api/vendors/notifications/{id}/read",
            put(vendor_mark_read::<S>),
        )
        .route("/api/vendors/notifications/{id}", delete(vendor_delete::<S>))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationSummary> for NotificationResponse {
    fn from(n: NotificationSummary) -> Self {
        let vendor_id = match n.audience {
            Audience::Vendor(vendor) => Some(vendor.to_string()),
            Audience::Admin => None,
        };
        Self {
            id: n.notification_id.to_string(),
            kind: n.kind,
            message: n.message,
            is_read: n.is_read,
            vendor_id,
            created_at: n.created_at,
        }
    }
}

async fn list<S: EventStore>(
    state: &AppState<S>,
    audience: Audience,
    limit: Option<usize>,
) -> Result<Json<Value>, ApiError> {
    refresh(state).await?;
    let notifications: Vec<NotificationResponse> = state
        .notifications_view
        .list(audience, limit)
        .await
        .into_iter()
        .map(NotificationResponse::from)
        .collect();
    Ok(Json(
        json!({ "success": true, "notifications": notifications }),
    ))
}

async fn count<S: EventStore>(
    state: &AppState<S>,
    audience: Audience,
) -> Result<Json<Value>, ApiError> {
    refresh(state).await?;
    let count = state.notifications_view.unread_count(audience).await;
    Ok(Json(json!({ "count": count })))
}

async fn mark_read<S: EventStore>(
    state: &AppState<S>,
    audience: Audience,
    raw_id: &str,
) -> Result<Json<Value>, ApiError> {
    let id: AggregateId = parse_id(raw_id, "notification")?;
    state.dispatcher.sink().mark_read(id, audience).await?;
    Ok(Json(json!({ "success": true, "message": "Marked as read" })))
}

async fn remove<S: EventStore>(
    state: &AppState<S>,
    audience: Audience,
    raw_id: &str,
) -> Result<Json<Value>, ApiError> {
    let id: AggregateId = parse_id(raw_id, "notification")?;
    state.dispatcher.sink().delete(id, audience).await?;
    Ok(Json(
        json!({ "success": true, "message": "Notification deleted successfully" }),
    ))
}

/// GET /api/admin/notifications - newest first, capped by configuration.
#[tracing::instrument(skip_all)]
pub async fn admin_list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
) -> Result<Json<Value>, ApiError> {
    let limit = state.config.admin_notification_limit;
    list(&state, Audience::Admin, Some(limit)).await
}

/// GET /api/admin/notifications/count - unread entries.
#[tracing::instrument(skip_all)]
pub async fn admin_count<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
) -> Result<Json<Value>, ApiError> {
    count(&state, Audience::Admin).await
}

#[tracing::instrument(skip(state, _admin))]
pub async fn admin_mark_read<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    mark_read(&state, Audience::Admin, &id).await
}

#[tracing::instrument(skip(state, _admin))]
pub async fn admin_delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    remove(&state, Audience::Admin, &id).await
}

/// GET /api/vendors/notifications - the calling vendor's inbox, newest first.
#[tracing::instrument(skip(state))]
pub async fn vendor_list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
) -> Result<Json<Value>, ApiError> {
    list(&state, Audience::Vendor(vendor), None).await
}

#[tracing::instrument(skip(state))]
pub async fn vendor_count<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
) -> Result<Json<Value>, ApiError> {
    count(&state, Audience::Vendor(vendor)).await
}

#[tracing::instrument(skip(state))]
pub async fn vendor_mark_read<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    mark_read(&state, Audience::Vendor(vendor), &id).await
}

#[tracing::instrument(skip(state))]
pub async fn vendor_delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    remove(&state, Audience::Vendor(vendor), &id).await
}

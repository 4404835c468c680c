//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CartError, DomainError, NotificationError, OrderError};
use event_store::EventStoreError;
use projections::ProjectionError;
use saga::SagaError;

use crate::auth::AuthError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
///
/// Every variant renders as `{"success": false, "message": ...}`, plus a
/// machine-readable `code` where one applies.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing, invalid or expired credentials.
    Unauthorized {
        message: String,
        code: Option<&'static str>,
    },
    /// Valid credentials that may not perform the request.
    Forbidden(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout saga error.
    Saga(SagaError),
    /// Internal server error. The detail is logged, never returned.
    Internal(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut code = None;
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized { message, code: c } => {
                code = c;
                (StatusCode::UNAUTHORIZED, message)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Internal(msg) => internal(msg),
        };

        metrics::counter!("http_errors_total", "status" => status.as_u16().to_string())
            .increment(1);

        let mut body = serde_json::json!({ "success": false, "message": message });
        if let Some(code) = code {
            body["code"] = serde_json::Value::from(code);
        }
        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!(error = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE.to_string(),
    )
}

fn order_error_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::NotOrderVendor | OrderError::NotOrderOwner | OrderError::NotPermitted { .. } => {
            StatusCode::FORBIDDEN
        }
        OrderError::AlreadyPlaced
        | OrderError::EmptyOrder
        | OrderError::InvalidQuantity { .. }
        | OrderError::InvalidPrice { .. }
        | OrderError::IncompleteShippingAddress { .. }
        | OrderError::InvalidStatus(_)
        | OrderError::InvalidInitialStatus(_)
        | OrderError::InvalidTransition { .. }
        | OrderError::RefundAlreadyRequested
        | OrderError::InvalidRefundStatus
        | OrderError::RefundResolution { .. } => StatusCode::BAD_REQUEST,
    }
}

fn notification_error_status(err: &NotificationError) -> StatusCode {
    match err {
        NotificationError::NotFound => StatusCode::NOT_FOUND,
        NotificationError::KindNotAllowed { .. }
        | NotificationError::EmptyMessage
        | NotificationError::AlreadyCreated => StatusCode::BAD_REQUEST,
    }
}

fn cart_error_response(err: &CartError) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Order(order_err) => (order_error_status(order_err), order_err.to_string()),
        DomainError::Notification(n) => (notification_error_status(n), n.to_string()),
        DomainError::Cart(cart_err) => cart_error_response(cart_err),
        DomainError::AggregateNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => (
            StatusCode::CONFLICT,
            "The resource was modified concurrently, please retry".to_string(),
        ),
        _ => internal(&err),
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match err {
        SagaError::Cart(cart_err) => cart_error_response(&cart_err),
        SagaError::Order(order_err) => (order_error_status(&order_err), order_err.to_string()),
        SagaError::CheckoutAborted { ref source, .. } if source.is_conflict() => (
            StatusCode::CONFLICT,
            "The checkout conflicted with a concurrent write, please retry".to_string(),
        ),
        SagaError::Domain(domain_err) => domain_error_to_response(domain_err),
        other => internal(other),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<EventStoreError> for ApiError {
    fn from(err: EventStoreError) -> Self {
        ApiError::Domain(DomainError::EventStore(err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::WrongRole { .. } => ApiError::Forbidden(err.to_string()),
            AuthError::MissingToken { code } | AuthError::InvalidToken { code, .. } => {
                ApiError::Unauthorized {
                    message: err.to_string(),
                    code: *code,
                }
            }
        }
    }
}

//! Checkout error types.

use common::AggregateId;
use domain::{CartError, DomainError, OrderError, VendorId};
use event_store::EventStoreError;
use thiserror::Error;

/// Errors that can occur while checking out a cart.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The cart failed validation; nothing was written.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The order details failed validation; nothing was written.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A vendor order could not be placed. Orders placed before it were
    /// cancelled.
    #[error("Checkout {checkout_id} aborted while placing the order for vendor {vendor_id}: {source}")]
    CheckoutAborted {
        checkout_id: AggregateId,
        vendor_id: VendorId,
        source: DomainError,
    },

    /// The checkout log could not be written once orders existed. Every
    /// order placed by the checkout was cancelled.
    #[error("Checkout {checkout_id} aborted: {source}")]
    CheckoutLogFailed {
        checkout_id: AggregateId,
        source: Box<SagaError>,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true when the caller submitted an invalid cart.
    pub fn is_validation(&self) -> bool {
        matches!(self, SagaError::Cart(_) | SagaError::Order(_))
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

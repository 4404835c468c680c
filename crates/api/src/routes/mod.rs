//! Route handlers grouped by audience.

pub mod admin;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;

use std::str::FromStr;

use event_store::EventStore;

use crate::AppState;
use crate::error::ApiError;

/// Parses a path segment into an id, rejecting malformed input with 400.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {what} id: {raw}")))
}

/// Brings every read model up to the latest committed event.
pub(crate) async fn refresh<S: EventStore>(state: &AppState<S>) -> Result<(), ApiError> {
    state.processor.run_catch_up().await?;
    Ok(())
}

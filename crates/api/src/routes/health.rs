//! Health check endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use event_store::EventStore;
use projections::ReadModel;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub read_models: BTreeMap<&'static str, usize>,
}

/// GET /health - liveness plus the size of each read model.
pub async fn check<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let models: [&dyn ReadModel; 2] = [&state.orders_view, &state.notifications_view];
    Json(HealthResponse {
        status: "ok",
        read_models: models.iter().map(|m| (m.name(), m.count())).collect(),
    })
}

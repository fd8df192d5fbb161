use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::store::with_timeout;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match with_timeout(state.store_timeout, state.store.ping()).await {
        Ok(()) => {
            debug!("health check passed");
            (
                StatusCode::OK,
                Json(HealthResponse {
                    status: "OK".to_string(),
                    store: "healthy".to_string(),
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "DEGRADED".to_string(),
                    store: "unreachable".to_string(),
                }),
            )
        }
    }
}

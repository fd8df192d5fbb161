use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    app_state::AppState,
    chat::{self, ChatMessage, ChatRequest, ChatResponse, ErrorResponse, Role},
    health::{self, HealthResponse},
    middleware::rate_limit::rate_limit_middleware,
};

#[derive(OpenApi)]
#[openapi(
    paths(chat::handlers::chat, health::health_check),
    components(schemas(ChatRequest, ChatResponse, ChatMessage, Role, ErrorResponse, HealthResponse)),
    tags(
        (name = "chat", description = "Chat over the content of a linked page"),
        (name = "health", description = "Liveness and store connectivity")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Every route except `/healthz` passes the rate limiter first.
pub fn build_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/api/chat", post(chat::handlers::chat))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/healthz", get(health::health_check))
        .merge(gated)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

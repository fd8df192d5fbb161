use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    chat::{
        dtos::{ChatRequest, ChatResponse, ErrorResponse},
        prompt::{build_messages, build_user_prompt, split_message},
    },
};

/// Content block used when the message carries no URL.
const NO_CONTENT: &str = " ";

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Completion generated", body = ChatResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Completion failed", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected chat request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Invalid request body".to_string(),
                }),
            )
                .into_response();
        }
    };
    let split = split_message(&payload.message);

    let content = match split.url.as_deref() {
        Some(url) => {
            let page = state.scraper.scrape(url).await;
            if !page.succeeded() {
                // answer without page context rather than failing the turn
                warn!(%url, error = ?page.error, "scrape returned no content");
            }
            page.content
        }
        None => NO_CONTENT.to_string(),
    };

    let prompt = build_user_prompt(&split.text, &content);
    let messages = build_messages(&payload.messages, prompt);

    match state.completion.complete(&messages).await {
        Ok(message) => {
            info!(turns = messages.len(), "chat completion generated");
            Json(ChatResponse { message }).into_response()
        }
        Err(e) => {
            error!(error = %e, "chat completion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to generate response".to_string(),
                }),
            )
                .into_response()
        }
    }
}
